use std::fmt;

mod converter;
mod engine;
mod error;
mod evaluator;
mod registry;
mod scalar;
mod tokenizer;

pub use converter::*;
pub use engine::*;
pub use error::*;
pub use evaluator::*;
pub use registry::*;
pub use scalar::*;
pub use tokenizer::tokenize;

/// Leading character that marks an operand as an externally resolved variable.
pub const VARIABLE_MARKER: char = '$';

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Operand,
    Operator,
    FunctionName,
    OpenParen,
    CloseParen,
    ArgSeparator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Operator {
    /// Binding rank; a lower rank binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Power => 1,
            Operator::Multiply | Operator::Divide => 2,
            Operator::Add | Operator::Subtract => 3,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
        }
    }

    /// Applies the operator to `op1` (pushed first) and `op2` (pushed last).
    ///
    /// `+` adds when both sides are numeric and concatenates otherwise; every
    /// other operator requires numeric operands.
    pub fn apply(&self, op1: &Scalar, op2: &Scalar) -> Result<Scalar, RpnError> {
        if let (Operator::Add, Some(a), Some(b)) = (self, op1.as_number(), op2.as_number()) {
            return Ok(Scalar::Number(a + b));
        }
        if let Operator::Add = self {
            return Ok(Scalar::Text(format!("{}{}", op1, op2)));
        }

        let a = self.require_number(op1)?;
        let b = self.require_number(op2)?;
        let value = match self {
            Operator::Divide if b == 0.0 => return Err(RpnError::DivisionByZero),
            Operator::Divide => a / b,
            Operator::Subtract => a - b,
            Operator::Multiply => a * b,
            Operator::Power => a.powf(b),
            Operator::Add => a + b,
        };
        Ok(Scalar::Number(value))
    }

    fn require_number(&self, value: &Scalar) -> Result<f64, RpnError> {
        value.as_number().ok_or_else(|| RpnError::NumericRequired {
            context: self.symbol().to_string(),
            operand: value.to_string(),
        })
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            "^" => Ok(Operator::Power),
            _ => Err(format!("Unknown operator: {}", value)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpnItem {
    /// Raw operand text as written, quotes and folded sign included.
    Operand(String),
    Operator(Operator),
    Function { name: String, arity: usize },
}

impl fmt::Display for RpnItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpnItem::Operand(text) => f.write_str(text),
            RpnItem::Operator(operator) => write!(f, "{}", operator),
            RpnItem::Function { name, .. } => f.write_str(name),
        }
    }
}

/// Ordered postfix program produced by [`convert`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpnProgram {
    items: Vec<RpnItem>,
}

impl RpnProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: RpnItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[RpnItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<RpnItem>> for RpnProgram {
    fn from(items: Vec<RpnItem>) -> Self {
        Self { items }
    }
}

/// Space separated postfix text, e.g. `2 3 4 * +`.
impl fmt::Display for RpnProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
