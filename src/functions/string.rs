use crate::rpn::{Arity, FunctionRegistry, RpnError, Scalar};
use rpn_eval_macros::rpn_fn;

pub fn register(registry: &mut FunctionRegistry) {
    registry.define("upper", Arity::exact(1), upper);
    registry.define("lower", Arity::exact(1), lower);
    registry.define("substr", Arity::range(2, 3), substr);
    registry.define("number", Arity::range(1, 4), number);
    registry.define("wrap", Arity::range(1, 4), wrap);
    registry.define("word", Arity::range(2, 3), word);
}

#[rpn_fn]
fn upper(text: String) -> Result<Scalar, RpnError> {
    Ok(Scalar::Text(text.to_uppercase()))
}

#[rpn_fn]
fn lower(text: String) -> Result<Scalar, RpnError> {
    Ok(Scalar::Text(text.to_lowercase()))
}

/// Character based substring. A negative `start` counts from the end; a
/// negative `length` leaves that many characters off the end.
#[rpn_fn]
fn substr(text: String, start: i64, length: Option<i64>) -> Result<Scalar, RpnError> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;

    let begin = if start < 0 { len.saturating_add(start).max(0) } else { start };
    if begin >= len {
        return Ok(Scalar::default());
    }
    let end = match length {
        None => len,
        Some(length) if length < 0 => len.saturating_add(length),
        Some(length) => begin.saturating_add(length).min(len),
    };
    if end <= begin {
        return Ok(Scalar::default());
    }

    Ok(Scalar::Text(
        chars[begin as usize..end as usize].iter().collect(),
    ))
}

/// Rounds half away from zero and groups thousands, `number(1234.5, 1)` is
/// `1,234.5`.
#[rpn_fn]
fn number(
    value: f64,
    decimals: Option<i64>,
    decimal_point: Option<String>,
    thousands_separator: Option<String>,
) -> Result<Scalar, RpnError> {
    if !value.is_finite() {
        return Ok(Scalar::Number(value));
    }
    let decimals = decimals.unwrap_or(0).clamp(0, 15) as usize;
    let decimal_point = decimal_point.unwrap_or_else(|| ".".to_string());
    let thousands_separator = thousands_separator.unwrap_or_else(|| ",".to_string());

    let factor = 10f64.powi(decimals as i32);
    let rounded = (value.abs() * factor).round() / factor;
    let formatted = format!("{:.*}", decimals, rounded);
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (formatted.as_str(), ""),
    };

    let mut result = String::new();
    if value < 0.0 && rounded != 0.0 {
        result.push('-');
    }
    let digits = integer.len();
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            result.push_str(&thousands_separator);
        }
        result.push(digit);
    }
    if decimals > 0 {
        result.push_str(&decimal_point);
        result.push_str(fraction);
    }
    Ok(Scalar::Text(result))
}

/// Greedy word wrap at `width` characters (75). Existing `line_break`
/// sequences start a new line; with `cut`, words longer than `width` are split.
#[rpn_fn]
fn wrap(
    text: String,
    width: Option<i64>,
    line_break: Option<String>,
    cut: Option<bool>,
) -> Result<Scalar, RpnError> {
    let width = width.unwrap_or(75).max(0) as usize;
    let line_break = line_break.unwrap_or_else(|| "\n".to_string());
    let cut = cut.unwrap_or(false);

    if line_break.is_empty() {
        return Err(RpnError::function_failed("wrap", "break string cannot be empty"));
    }
    if cut && width == 0 {
        return Err(RpnError::function_failed(
            "wrap",
            "cannot force a cut when width is zero",
        ));
    }

    let wrapped: Vec<String> = text
        .split(line_break.as_str())
        .map(|paragraph| wrap_paragraph(paragraph, width, cut).join(&line_break))
        .collect();
    Ok(Scalar::Text(wrapped.join(&line_break)))
}

fn wrap_paragraph(paragraph: &str, width: usize, cut: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;
    let mut started = false;

    for word in paragraph.split(' ') {
        let word_len = word.chars().count();
        if started && line_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
            started = false;
        }
        if started {
            line.push(' ');
            line_len += 1;
        }
        line.push_str(word);
        line_len += word_len;
        started = true;

        if cut {
            while line_len > width {
                let head: String = line.chars().take(width).collect();
                let tail: String = line.chars().skip(width).collect();
                lines.push(head);
                line = tail;
                line_len -= width;
            }
            started = line_len > 0;
        }
    }
    lines.push(line);
    lines
}

/// N-th word (1-based). Letters, `'` and `-` make up words, plus any
/// characters in `extra`.
#[rpn_fn]
fn word(text: String, index: i64, extra: Option<String>) -> Result<Scalar, RpnError> {
    let extra = extra.unwrap_or_default();
    let is_word_char = |c: char| c.is_alphabetic() || c == '\'' || c == '-' || extra.contains(c);

    let words: Vec<&str> = text
        .split(|c: char| !is_word_char(c))
        .filter(|w| !w.is_empty())
        .collect();

    usize::try_from(index)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|n| words.get(n))
        .map(|w| Scalar::from(*w))
        .ok_or_else(|| {
            RpnError::function_failed(
                "word",
                format!("no word {} in a text of {} words", index, words.len()),
            )
        })
}
