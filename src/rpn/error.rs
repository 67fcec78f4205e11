use crate::rpn::{Arity, RpnProgram};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpnError {
    #[error("function '{name}' takes {expected} arguments, got {given}")]
    WrongArity {
        name: String,
        given: usize,
        expected: Arity,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("'{context}' requires numeric operands, got '{operand}'")]
    NumericRequired { context: String, operand: String },

    #[error("operand expected, found '{found}'")]
    OperandExpected { found: String },

    #[error("function '{name}' failed: {message}")]
    FunctionFailed { name: String, message: String },
}

impl RpnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpnError::WrongArity { .. } => ErrorKind::WrongArity,
            RpnError::DivisionByZero => ErrorKind::DivisionByZero,
            RpnError::NumericRequired { .. } => ErrorKind::NumericRequired,
            RpnError::OperandExpected { .. } => ErrorKind::OperandExpected,
            RpnError::FunctionFailed { .. } => ErrorKind::FunctionFailed,
        }
    }

    pub(crate) fn operand_expected(found: impl Into<String>) -> Self {
        RpnError::OperandExpected {
            found: found.into(),
        }
    }

    pub(crate) fn function_failed(name: &str, message: impl Into<String>) -> Self {
        RpnError::FunctionFailed {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Payload-free error discriminant with stable numeric codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    WrongArity = 1,
    DivisionByZero = 2,
    NumericRequired = 3,
    OperandExpected = 4,
    FunctionFailed = 5,
}

impl ErrorKind {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Failed conversion or evaluation, with the program built up to that point.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error} (rpn: '{partial}')")]
pub struct RpnFailure {
    #[source]
    pub error: RpnError,
    pub partial: RpnProgram,
}

impl RpnFailure {
    pub fn new(error: RpnError, partial: RpnProgram) -> Self {
        Self { error, partial }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn partial_rpn(&self) -> String {
        self.partial.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("maximum of {max} parameters is below the minimum of {min}")]
    InvalidArity { min: usize, max: usize },

    #[error("no registered function named '{target}' to alias")]
    UnknownTarget { target: String },
}
