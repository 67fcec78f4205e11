use crate::rpn::converter::is_quoted;
use crate::rpn::{
    is_numeric_str, FunctionRegistry, RpnError, RpnItem, RpnProgram, Scalar, VariableResolver,
    VARIABLE_MARKER,
};
use log::trace;

struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    resolver: Option<&'a dyn VariableResolver>,
    stack: Vec<Scalar>,
}

/// Runs an RPN program on a fresh value stack.
///
/// The program must leave exactly one value behind; running out of operands
/// or finishing with extra values is reported as
/// [`RpnError::OperandExpected`].
pub fn evaluate(
    program: &RpnProgram,
    registry: &FunctionRegistry,
    resolver: Option<&dyn VariableResolver>,
) -> Result<Scalar, RpnError> {
    let mut evaluator = Evaluator {
        registry,
        resolver,
        stack: Vec::with_capacity(program.len()),
    };

    for item in program.items() {
        evaluator.step(item)?;
    }
    evaluator.finish()
}

impl<'a> Evaluator<'a> {
    fn step(&mut self, item: &RpnItem) -> Result<(), RpnError> {
        trace!("eval {} with stack {:?}", item, self.stack);
        let value = match item {
            RpnItem::Operand(text) => self.operand(text)?,
            RpnItem::Operator(op) => {
                let op2 = self.pop_value(op.symbol())?;
                let op1 = self.pop_value(op.symbol())?;
                op.apply(&op1, &op2)?
            }
            RpnItem::Function { name, arity } => {
                if self.stack.len() < *arity {
                    return Err(RpnError::operand_expected(name.as_str()));
                }
                let args = self.stack.split_off(self.stack.len() - arity);
                let spec = self
                    .registry
                    .lookup(name)
                    .ok_or_else(|| RpnError::operand_expected(name.as_str()))?;
                spec.call(&args)?
            }
        };
        self.stack.push(value);
        Ok(())
    }

    fn pop_value(&mut self, context: &str) -> Result<Scalar, RpnError> {
        self.stack
            .pop()
            .ok_or_else(|| RpnError::operand_expected(context))
    }

    /// Turns raw operand text into a value: variables go through the resolver,
    /// quotes are stripped and a folded `-` sign negates non-literal numbers.
    fn operand(&self, text: &str) -> Result<Scalar, RpnError> {
        let (negated, body) = match text.strip_prefix('-') {
            Some(rest) if !is_numeric_str(text) => (true, rest),
            _ => (false, text),
        };

        let value = if body.starts_with(VARIABLE_MARKER) {
            match self.resolver {
                Some(resolver) => resolver.resolve(&body[VARIABLE_MARKER.len_utf8()..]),
                None => return Ok(Scalar::from(text)),
            }
        } else if is_quoted(body) {
            Scalar::Text(unquote(body))
        } else {
            return Ok(Scalar::from(text));
        };

        if !negated {
            return Ok(value);
        }
        value
            .as_number()
            .map(|n| Scalar::Number(-n))
            .ok_or_else(|| RpnError::NumericRequired {
                context: "-".to_string(),
                operand: value.to_string(),
            })
    }

    fn finish(mut self) -> Result<Scalar, RpnError> {
        match self.stack.len() {
            1 => Ok(self.stack.pop().unwrap_or_default()),
            0 => Err(RpnError::operand_expected("")),
            _ => {
                let extra = self.stack.pop().unwrap_or_default();
                Err(RpnError::operand_expected(extra.to_string()))
            }
        }
    }
}

/// Strips the surrounding quotes and resolves `\'`, `\"` and `\\`.
fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped @ ('\'' | '"' | '\\')) => unquoted.push(escaped),
                Some(other) => {
                    unquoted.push('\\');
                    unquoted.push(other);
                }
                None => unquoted.push('\\'),
            }
        } else {
            unquoted.push(c);
        }
    }
    unquoted
}
