use crate::rpn::{Arity, FunctionRegistry, RpnError, Scalar, NEGATE_FUNCTION};
use rpn_eval_macros::rpn_fn;
use std::cmp::Ordering;

pub fn register(registry: &mut FunctionRegistry) {
    registry.define("max", Arity::at_least(2), max);
    registry.define("min", Arity::at_least(2), min);
    registry.define("sin", Arity::exact(1), sin);
    registry.define("cos", Arity::exact(1), cos);
    registry.define("tan", Arity::exact(1), tan);
    registry.define("atan", Arity::exact(1), atan);
    registry.define(NEGATE_FUNCTION, Arity::exact(1), negate);
}

#[rpn_fn]
fn max(first: Scalar, second: Scalar, rest: Vec<Scalar>) -> Result<Scalar, RpnError> {
    Ok(extremum(first, second, rest, Ordering::Greater))
}

#[rpn_fn]
fn min(first: Scalar, second: Scalar, rest: Vec<Scalar>) -> Result<Scalar, RpnError> {
    Ok(extremum(first, second, rest, Ordering::Less))
}

/// Picks the argument that compares as `wanted` against all others, keeping
/// the earliest on ties. Values compare numerically only when every one of
/// them is numeric; the winner is returned as passed in.
fn extremum(first: Scalar, second: Scalar, rest: Vec<Scalar>, wanted: Ordering) -> Scalar {
    let values: Vec<Scalar> = [first, second].into_iter().chain(rest).collect();
    let numeric = values.iter().all(Scalar::is_numeric);

    let compare = |a: &Scalar, b: &Scalar| {
        if numeric {
            a.as_number()
                .partial_cmp(&b.as_number())
                .unwrap_or(Ordering::Equal)
        } else {
            a.to_string().cmp(&b.to_string())
        }
    };

    values
        .into_iter()
        .reduce(|best, value| {
            if compare(&value, &best) == wanted {
                value
            } else {
                best
            }
        })
        .unwrap_or_default()
}

#[rpn_fn]
fn sin(x: f64) -> Result<Scalar, RpnError> {
    Ok(Scalar::Number(x.sin()))
}

#[rpn_fn]
fn cos(x: f64) -> Result<Scalar, RpnError> {
    Ok(Scalar::Number(x.cos()))
}

#[rpn_fn]
fn tan(x: f64) -> Result<Scalar, RpnError> {
    Ok(Scalar::Number(x.tan()))
}

#[rpn_fn]
fn atan(x: f64) -> Result<Scalar, RpnError> {
    Ok(Scalar::Number(x.atan()))
}

#[rpn_fn]
fn negate(x: f64) -> Result<Scalar, RpnError> {
    Ok(Scalar::Number(-x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpn::ErrorKind;

    fn s(value: &str) -> Scalar {
        Scalar::from(value)
    }

    #[test]
    fn test_max_min_numeric() {
        assert_eq!(max(&[s("3"), s("7"), s("2")]), Ok(s("7")));
        assert_eq!(min(&[s("3"), s("7"), s("2")]), Ok(s("2")));
        // numeric, not lexicographic
        assert_eq!(max(&[s("10"), s("9")]), Ok(s("10")));
        assert_eq!(min(&[s("-1.5"), Scalar::Number(-1.0)]), Ok(s("-1.5")));
        // the first of equal values wins, as passed
        assert_eq!(max(&[s("2.0"), s("2")]), Ok(s("2.0")));
    }

    #[test]
    fn test_max_min_text() {
        assert_eq!(max(&[s("apple"), s("pear"), s("fig")]), Ok(s("pear")));
        assert_eq!(min(&[s("apple"), s("pear"), s("fig")]), Ok(s("apple")));
        assert_eq!(max(&[s("10"), s("9"), s("x")]), Ok(s("x")));
    }

    #[test]
    fn test_max_requires_two() {
        assert_eq!(max(&[s("1")]).unwrap_err().kind(), ErrorKind::WrongArity);
    }

    #[test]
    fn test_trigonometry() {
        assert_eq!(sin(&[s("0")]), Ok(Scalar::Number(0.0)));
        assert_eq!(cos(&[s("0")]), Ok(Scalar::Number(1.0)));
        let quarter = atan(&[s("1")]).unwrap().as_number().unwrap();
        assert!((quarter - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        let tangent = tan(&[Scalar::Number(quarter)]).unwrap().as_number().unwrap();
        assert!((tangent - 1.0).abs() < 1e-12);
        assert_eq!(
            sin(&[s("abc")]).unwrap_err().kind(),
            ErrorKind::NumericRequired
        );
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&[s("5")]), Ok(Scalar::Number(-5.0)));
        assert_eq!(negate(&[s("-2.5")]), Ok(Scalar::Number(2.5)));
        assert!(negate(&[s("five")]).is_err());
    }
}
