use crate::rpn::{
    convert, evaluate, tokenize, FunctionRegistry, MaxParams, RegistryError, RpnError, RpnFailure,
    RpnProgram, Scalar, VariableResolver,
};
use log::debug;

/// Successful outcome: the program that ran and the value it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub program: RpnProgram,
    pub result: Scalar,
}

impl Evaluation {
    /// The executed program as space separated postfix text.
    pub fn rpn(&self) -> String {
        self.program.to_string()
    }
}

/// Long-lived evaluation session.
///
/// Owns the function registry and the optional variable resolver; both persist
/// across calls and change only through the registration methods. Every call to
/// [`Engine::evaluate`] works on freshly allocated conversion and evaluation
/// state.
pub struct Engine {
    registry: FunctionRegistry,
    resolver: Option<Box<dyn VariableResolver>>,
}

impl Engine {
    /// Creates an engine with the built-in function library and no resolver.
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::new())
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self {
            registry,
            resolver: None,
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// See [`FunctionRegistry::register`].
    pub fn register<F>(
        &mut self,
        name: &str,
        callback: F,
        min: usize,
        max: Option<MaxParams>,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&[Scalar]) -> Result<Scalar, RpnError> + Send + Sync + 'static,
    {
        self.registry.register(name, callback, min, max)
    }

    /// See [`FunctionRegistry::register_alias`].
    pub fn register_alias(
        &mut self,
        name: &str,
        target: &str,
        min: usize,
        max: Option<MaxParams>,
    ) -> Result<(), RegistryError> {
        self.registry.register_alias(name, target, min, max)
    }

    /// Installs the hook for `$name` operands, replacing any previous one.
    pub fn set_variable_resolver<R>(&mut self, resolver: R)
    where
        R: VariableResolver + 'static,
    {
        debug!("Installing variable resolver");
        self.resolver = Some(Box::new(resolver));
    }

    pub fn clear_variable_resolver(&mut self) {
        self.resolver = None;
    }

    pub fn convert(&self, expression: &str) -> Result<RpnProgram, RpnFailure> {
        convert(&tokenize(expression), &self.registry)
    }

    /// Converts and evaluates `expression`.
    ///
    /// A failure during evaluation reports the complete program as its partial
    /// RPN, since conversion had already succeeded.
    pub fn evaluate(&self, expression: &str) -> Result<Evaluation, RpnFailure> {
        let program = self.convert(expression)?;
        match evaluate(&program, &self.registry, self.resolver.as_deref()) {
            Ok(result) => {
                debug!("Evaluated '{}' to {}", expression, result);
                Ok(Evaluation { program, result })
            }
            Err(error) => {
                debug!("Evaluation of '{}' failed: {}", expression, error);
                Err(RpnFailure::new(error, program))
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpn::{Arity, ErrorKind, RpnItem};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_evaluates(engine: &Engine, expression: &str, rpn: &str, result: Scalar) {
        let evaluation = engine
            .evaluate(expression)
            .unwrap_or_else(|e| panic!("{expression:?} failed: {e}"));
        assert_eq!(evaluation.rpn(), rpn);
        assert_eq!(evaluation.result, result);
    }

    #[test]
    fn test_reference_cases() {
        let engine = Engine::new();
        assert_evaluates(&engine, "2+3*4", "2 3 4 * +", Scalar::Number(14.0));
        assert_evaluates(&engine, "(2+3)*4", "2 3 + 4 *", Scalar::Number(20.0));
        assert_evaluates(&engine, "upper('abc')", "'abc' upper", Scalar::from("ABC"));
        assert_evaluates(&engine, "'a'+'b'", "'a' 'b' +", Scalar::from("ab"));

        let evaluation = engine.evaluate("max(3,7,2)").unwrap();
        assert_eq!(evaluation.result.to_string(), "7");
        assert_eq!(
            evaluation.program.items().last(),
            Some(&RpnItem::Function {
                name: "max".to_string(),
                arity: 3
            })
        );
    }

    #[test]
    fn test_division_by_zero_keeps_program() {
        let failure = Engine::new().evaluate("10/0").unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::DivisionByZero);
        assert_eq!(failure.partial_rpn(), "10 0 /");
    }

    #[test]
    fn test_conversion_failure_keeps_partial() {
        let failure = Engine::new().evaluate("1 + 2 * @").unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::OperandExpected);
        assert_eq!(failure.partial_rpn(), "1 2");
    }

    #[test]
    fn test_variable_resolver() {
        let mut engine = Engine::new();
        engine.set_variable_resolver(|name: &str| {
            if name == "x" {
                Scalar::Number(5.0)
            } else {
                Scalar::default()
            }
        });
        assert_evaluates(&engine, "$x+1", "$x 1 +", Scalar::Number(6.0));

        engine.clear_variable_resolver();
        assert_eq!(engine.evaluate("$x").unwrap().result, Scalar::from("$x"));
    }

    #[test]
    fn test_resolver_called_once_per_operand() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut engine = Engine::new();
        engine.set_variable_resolver(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Scalar::Number(1.0)
        });

        // conversion alone never touches the resolver
        engine.convert("$a + $b").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        engine.evaluate("$a + $a + $b").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_user_functions() {
        let mut engine = Engine::new();
        engine
            .register(
                "sum",
                |args: &[Scalar]| {
                    args.iter()
                        .map(|arg| {
                            arg.as_number().ok_or_else(|| RpnError::NumericRequired {
                                context: "sum".to_string(),
                                operand: arg.to_string(),
                            })
                        })
                        .sum::<Result<f64, RpnError>>()
                        .map(Scalar::Number)
                },
                1,
                Some(MaxParams::Unlimited),
            )
            .unwrap();
        assert_evaluates(&engine, "sum(1, 2, 3) * 2", "1 2 3 sum 2 *", Scalar::Number(12.0));

        engine.register_alias("total", "sum", 2, None).unwrap();
        assert_eq!(engine.evaluate("total(4, 5)").unwrap().result, Scalar::Number(9.0));
        assert_eq!(
            engine.evaluate("total(4)").unwrap_err().kind(),
            ErrorKind::WrongArity
        );
    }

    #[test]
    fn test_failed_registration_leaves_registry_alone() {
        let mut engine = Engine::new();
        let before = engine.registry().len();

        let inverted = engine.register(
            "broken",
            |_: &[Scalar]| Ok(Scalar::default()),
            3,
            Some(MaxParams::Limited(1)),
        );
        assert_eq!(inverted, Err(RegistryError::InvalidArity { min: 3, max: 1 }));

        let missing = engine.register_alias("broken", "no_such_function", 1, None);
        assert!(matches!(missing, Err(RegistryError::UnknownTarget { .. })));

        assert_eq!(engine.registry().len(), before);
        assert_eq!(engine.evaluate("broken(1)").unwrap_err().kind(), ErrorKind::OperandExpected);
    }

    #[test]
    fn test_calls_do_not_share_state() {
        let engine = Engine::new();
        assert!(engine.evaluate("(1 + ").is_err());
        assert_evaluates(&engine, "1 + 1", "1 1 +", Scalar::Number(2.0));
        assert!(engine.evaluate("max(1").is_err());
        assert_eq!(
            engine.registry().lookup("max").map(|spec| spec.arity),
            Some(Arity::at_least(2))
        );
        assert_evaluates(&engine, "max(1, 2)", "1 2 max", Scalar::from("2"));
    }

    #[test]
    fn test_determinism() {
        let engine = Engine::new();
        for expression in ["1 + * 2", "upper('a', 'b')", "(1", "2 / 0", "'a' ^ 2"] {
            let first = engine.evaluate(expression).unwrap_err();
            for _ in 0..5 {
                assert_eq!(engine.evaluate(expression).unwrap_err(), first);
            }
        }
    }

    fn random_operand(rng: &mut StdRng) -> String {
        let value = if rng.random_bool(0.3) {
            format!("{}.{}", rng.random_range(0..50), rng.random_range(1..10))
        } else {
            rng.random_range(1..50).to_string()
        };
        if rng.random_bool(0.2) {
            format!("(-{})", value)
        } else {
            value
        }
    }

    fn random_expression(rng: &mut StdRng, depth: usize) -> String {
        if depth == 0 || rng.random_bool(0.3) {
            return random_operand(rng);
        }
        if rng.random_bool(0.15) {
            // both sides grouped, so associativity of `^` never comes into play
            let base = random_expression(rng, depth - 1);
            let exponent: i32 = rng.random_range(-2..=3);
            return format!("({}) ^ ({})", base, exponent);
        }
        let op = ["+", "-", "*", "/"][rng.random_range(0..4)];
        let left = random_expression(rng, depth - 1);
        let right = random_expression(rng, depth - 1);
        if rng.random_bool(0.4) {
            format!("({} {} {})", left, op, right)
        } else {
            format!("{} {} {}", left, op, right)
        }
    }

    #[test]
    fn test_matches_reference_evaluator() {
        let engine = Engine::new();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut checked = 0;

        for _ in 0..500 {
            let expression = random_expression(&mut rng, 4);
            let expected = meval::eval_str(&expression).unwrap();
            let actual = match engine.evaluate(&expression) {
                Ok(evaluation) => evaluation.result.as_number().unwrap(),
                Err(failure) if failure.kind() == ErrorKind::DivisionByZero => continue,
                Err(failure) => panic!("{expression:?} failed: {failure}"),
            };
            if !expected.is_finite() {
                continue;
            }

            let tolerance = 1e-9 * expected.abs().max(1.0);
            assert!(
                (actual - expected).abs() <= tolerance,
                "{expression}: got {actual}, expected {expected}"
            );
            checked += 1;
        }
        assert!(checked > 400);
    }

    #[test]
    fn test_power_matches_reference_evaluator() {
        let engine = Engine::new();
        for expression in ["(2) ^ (3) * 2", "1 + (1.5) ^ (2)", "((2) ^ (3)) ^ (2)", "(4) ^ (-1) - 1"] {
            let expected = meval::eval_str(expression).unwrap();
            let actual = engine.evaluate(expression).unwrap().result.as_number().unwrap();
            assert!((actual - expected).abs() < 1e-12, "{expression}: {actual} vs {expected}");
        }
    }
}
