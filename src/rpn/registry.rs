use crate::functions::register_functions;
use crate::rpn::{RegistryError, RpnError, Scalar};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type Callback = Arc<dyn Fn(&[Scalar]) -> Result<Scalar, RpnError> + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MaxParams {
    Limited(usize),
    Unlimited,
}

/// Accepted argument count range of a function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Arity {
    pub min: usize,
    pub max: MaxParams,
}

impl Arity {
    pub fn exact(count: usize) -> Self {
        Self::range(count, count)
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: MaxParams::Limited(max),
        }
    }

    pub fn at_least(min: usize) -> Self {
        Self {
            min,
            max: MaxParams::Unlimited,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min
            && match self.max {
                MaxParams::Limited(max) => count <= max,
                MaxParams::Unlimited => true,
            }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            MaxParams::Limited(max) if max == self.min => write!(f, "{}", max),
            MaxParams::Limited(max) => write!(f, "{}..{}", self.min, max),
            MaxParams::Unlimited => write!(f, "{}..unlimited", self.min),
        }
    }
}

#[derive(Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub arity: Arity,
    pub callback: Callback,
}

impl FunctionSpec {
    pub fn call(&self, args: &[Scalar]) -> Result<Scalar, RpnError> {
        (self.callback)(args)
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Name to callback table consulted by both the converter and the evaluator.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    /// Creates a registry with the built-in function library.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        register_functions(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers `callback` under `name`, replacing any previous entry.
    ///
    /// `max` of `None` means exactly `min` parameters.
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
        let arity = Self::checked_arity(min, max)?;
        self.define(name, arity, callback);
        Ok(())
    }

    /// Registers `name` as a new entry point for the callback already
    /// registered as `target`, with its own arity.
    pub fn register_alias(
        &mut self,
        name: &str,
        target: &str,
        min: usize,
        max: Option<MaxParams>,
    ) -> Result<(), RegistryError> {
        let arity = Self::checked_arity(min, max)?;
        let callback = self
            .functions
            .get(target)
            .map(|spec| spec.callback.clone())
            .ok_or_else(|| RegistryError::UnknownTarget {
                target: target.to_string(),
            })?;

        debug!("Registering alias {} -> {} ({})", name, target, arity);
        self.functions.insert(
            name.to_string(),
            FunctionSpec {
                name: name.to_string(),
                arity,
                callback,
            },
        );
        Ok(())
    }

    pub(crate) fn define<F>(&mut self, name: &str, arity: Arity, callback: F)
    where
        F: Fn(&[Scalar]) -> Result<Scalar, RpnError> + Send + Sync + 'static,
    {
        debug!("Registering function {} ({})", name, arity);
        self.functions.insert(
            name.to_string(),
            FunctionSpec {
                name: name.to_string(),
                arity,
                callback: Arc::new(callback),
            },
        );
    }

    fn checked_arity(min: usize, max: Option<MaxParams>) -> Result<Arity, RegistryError> {
        match max {
            None => Ok(Arity::exact(min)),
            Some(MaxParams::Unlimited) => Ok(Arity::at_least(min)),
            Some(MaxParams::Limited(max)) if max < min => {
                Err(RegistryError::InvalidArity { min, max })
            }
            Some(MaxParams::Limited(max)) => Ok(Arity::range(min, max)),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook substituting `$name` operands during evaluation.
pub trait VariableResolver: Send + Sync {
    /// Receives the variable name without its marker, e.g. `user.name`.
    fn resolve(&self, name: &str) -> Scalar;
}

impl<F> VariableResolver for F
where
    F: Fn(&str) -> Scalar + Send + Sync,
{
    fn resolve(&self, name: &str) -> Scalar {
        self(name)
    }
}
