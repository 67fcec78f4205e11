pub mod datetime;
pub mod hash;
pub mod math;
pub mod string;

use crate::rpn::FunctionRegistry;

/// Installs the built-in function library.
pub fn register_functions(registry: &mut FunctionRegistry) {
    string::register(registry);
    datetime::register(registry);
    math::register(registry);
    hash::register(registry);
}
