use crate::rpn::RpnError;
use std::fmt;

/// Weakly typed value living on the evaluation stack.
///
/// Literals stay [`Scalar::Text`] until an operator needs a number; whether
/// text is numeric is decided per use by [`is_numeric_str`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(text) if is_numeric_str(text) => text.parse::<f64>().ok(),
            Scalar::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// Empty text, `"0"` and zero are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Number(n) => *n != 0.0,
            Scalar::Text(text) => !(text.is_empty() || text == "0"),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Text(String::new())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => f.write_str(&format_number(*n)),
            Scalar::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Optional sign, then digits with at most one decimal point.
///
/// Exponents and surrounding whitespace are not accepted.
pub fn is_numeric_str(text: &str) -> bool {
    let unsigned = text
        .strip_prefix('+')
        .or_else(|| text.strip_prefix('-'))
        .unwrap_or(text);

    let mut digits = 0;
    let mut points = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NAN".to_string()
    } else if n == f64::INFINITY {
        "INF".to_string()
    } else if n == f64::NEG_INFINITY {
        "-INF".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Conversion of a stack value into a typed callback argument.
pub trait FromScalar: Sized {
    fn from_scalar(value: &Scalar, function: &str) -> Result<Self, RpnError>;
}

impl FromScalar for f64 {
    fn from_scalar(value: &Scalar, function: &str) -> Result<Self, RpnError> {
        value.as_number().ok_or_else(|| RpnError::NumericRequired {
            context: function.to_string(),
            operand: value.to_string(),
        })
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: &Scalar, function: &str) -> Result<Self, RpnError> {
        f64::from_scalar(value, function).map(|n| n.trunc() as i64)
    }
}

impl FromScalar for String {
    fn from_scalar(value: &Scalar, _function: &str) -> Result<Self, RpnError> {
        Ok(value.to_string())
    }
}

impl FromScalar for bool {
    fn from_scalar(value: &Scalar, _function: &str) -> Result<Self, RpnError> {
        Ok(value.is_truthy())
    }
}

impl FromScalar for Scalar {
    fn from_scalar(value: &Scalar, _function: &str) -> Result<Self, RpnError> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_predicate() {
        for text in ["0", "5", "-5", "+5", "3.25", "5.", ".5", "-0.5", "007"] {
            assert!(is_numeric_str(text), "{text:?} should be numeric");
        }
        for text in ["", "-", ".", "1.2.3", "1e3", " 5", "5 ", "abc", "--1", "0x10", "+-1"] {
            assert!(!is_numeric_str(text), "{text:?} should not be numeric");
        }
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Scalar::from("12.5").as_number(), Some(12.5));
        assert_eq!(Scalar::from("-.5").as_number(), Some(-0.5));
        assert_eq!(Scalar::from(3.0).as_number(), Some(3.0));
        assert_eq!(Scalar::from("1e3").as_number(), None);
        assert_eq!(Scalar::from("abc").as_number(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::Number(14.0).to_string(), "14");
        assert_eq!(Scalar::Number(-3.0).to_string(), "-3");
        assert_eq!(Scalar::Number(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Number(-0.0).to_string(), "0");
        assert_eq!(Scalar::Number(f64::INFINITY).to_string(), "INF");
        assert_eq!(Scalar::Number(f64::NAN).to_string(), "NAN");
        assert_eq!(Scalar::from("3.50").to_string(), "3.50");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Scalar::from("").is_truthy());
        assert!(!Scalar::from("0").is_truthy());
        assert!(!Scalar::Number(0.0).is_truthy());
        assert!(Scalar::from("false").is_truthy());
        assert!(Scalar::Number(-1.0).is_truthy());
    }

    #[test]
    fn test_from_scalar() {
        assert_eq!(f64::from_scalar(&Scalar::from("2.5"), "f"), Ok(2.5));
        assert_eq!(i64::from_scalar(&Scalar::from("-2.7"), "f"), Ok(-2));
        assert_eq!(
            String::from_scalar(&Scalar::Number(7.0), "f"),
            Ok("7".to_string())
        );

        let err = f64::from_scalar(&Scalar::from("x"), "sin").unwrap_err();
        assert_eq!(
            err,
            RpnError::NumericRequired {
                context: "sin".to_string(),
                operand: "x".to_string(),
            }
        );
    }
}
