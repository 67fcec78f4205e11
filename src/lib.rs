pub mod functions;
pub mod rpn;

pub use rpn::{
    Engine, ErrorKind, Evaluation, FunctionRegistry, MaxParams, RpnError, RpnFailure, Scalar,
    VariableResolver,
};

/// Converts and evaluates `expression` with the built-in functions and no
/// variable resolver.
pub fn evaluate_expression(expression: &str) -> Result<Evaluation, RpnFailure> {
    Engine::new().evaluate(expression)
}
