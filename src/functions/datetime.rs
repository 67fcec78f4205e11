use crate::rpn::{Arity, FunctionRegistry, RpnError, Scalar};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use rpn_eval_macros::rpn_fn;

pub fn register(registry: &mut FunctionRegistry) {
    registry.define("date", Arity::range(1, 2), date);
    registry.define("time", Arity::exact(0), time);
    registry.define("strtotime", Arity::range(1, 2), strtotime);
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

fn from_timestamp(function: &str, timestamp: i64) -> Result<DateTime<Utc>, RpnError> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        RpnError::function_failed(function, format!("timestamp {} out of range", timestamp))
    })
}

/// Formats a unix timestamp (default: now) in UTC using date format letters
/// such as `Y-m-d H:i:s`. A backslash makes the next character literal.
#[rpn_fn]
fn date(format: String, timestamp: Option<i64>) -> Result<Scalar, RpnError> {
    let moment = match timestamp {
        Some(timestamp) => from_timestamp("date", timestamp)?,
        None => Utc::now(),
    };

    let mut out = String::new();
    let mut letters = format.chars();
    while let Some(letter) = letters.next() {
        if letter == '\\' {
            if let Some(escaped) = letters.next() {
                out.push(escaped);
            }
            continue;
        }
        format_letter(&mut out, letter, &moment);
    }
    Ok(Scalar::Text(out))
}

fn format_letter(out: &mut String, letter: char, moment: &DateTime<Utc>) {
    let piece = match letter {
        // day
        'd' => format!("{:02}", moment.day()),
        'D' => moment.format("%a").to_string(),
        'j' => moment.day().to_string(),
        'l' => moment.format("%A").to_string(),
        'N' => moment.weekday().number_from_monday().to_string(),
        'S' => ordinal_suffix(moment.day()).to_string(),
        'w' => moment.weekday().num_days_from_sunday().to_string(),
        'z' => moment.ordinal0().to_string(),
        // week
        'W' => format!("{:02}", moment.iso_week().week()),
        // month
        'F' => moment.format("%B").to_string(),
        'm' => format!("{:02}", moment.month()),
        'M' => moment.format("%b").to_string(),
        'n' => moment.month().to_string(),
        't' => days_in_month(moment.year(), moment.month()).to_string(),
        // year
        'L' => u8::from(is_leap_year(moment.year())).to_string(),
        'o' => moment.iso_week().year().to_string(),
        'Y' => moment.year().to_string(),
        'y' => format!("{:02}", moment.year() % 100),
        // time
        'a' => meridiem(moment).to_lowercase(),
        'A' => meridiem(moment).to_string(),
        'g' => moment.hour12().1.to_string(),
        'G' => moment.hour().to_string(),
        'h' => format!("{:02}", moment.hour12().1),
        'H' => format!("{:02}", moment.hour()),
        'i' => format!("{:02}", moment.minute()),
        's' => format!("{:02}", moment.second()),
        'u' => "000000".to_string(),
        'v' => "000".to_string(),
        // timezone, always UTC
        'e' | 'T' => "UTC".to_string(),
        'P' => "+00:00".to_string(),
        'p' => "Z".to_string(),
        'O' => "+0000".to_string(),
        'Z' | 'I' => "0".to_string(),
        // full date/time
        'c' => moment.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
        'r' => moment.format("%a, %d %b %Y %H:%M:%S +0000").to_string(),
        'U' => moment.timestamp().to_string(),
        other => {
            out.push(other);
            return;
        }
    };
    out.push_str(&piece);
}

fn meridiem(moment: &DateTime<Utc>) -> &'static str {
    if moment.hour12().0 {
        "PM"
    } else {
        "AM"
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

#[rpn_fn]
fn time() -> Result<Scalar, RpnError> {
    Ok(Scalar::from(Utc::now().timestamp()))
}

/// Parses a date/time description into a unix timestamp, relative to `base`
/// (default: now) where the text is relative.
#[rpn_fn]
fn strtotime(text: String, base: Option<i64>) -> Result<Scalar, RpnError> {
    let base = match base {
        Some(base) => from_timestamp("strtotime", base)?,
        None => Utc::now(),
    };
    parse_moment(text.trim(), base)
        .map(|moment| Scalar::from(moment.timestamp()))
        .ok_or_else(|| {
            RpnError::function_failed("strtotime", format!("cannot parse '{}' as a date", text))
        })
}

fn parse_moment(text: &str, base: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let midnight = |moment: DateTime<Utc>| {
        moment
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
    };
    let one_day = TimeDelta::try_days(1)?;

    match text.to_ascii_lowercase().as_str() {
        "now" => return Some(base),
        "today" | "midnight" => return midnight(base),
        "tomorrow" => return midnight(base.checked_add_signed(one_day)?),
        "yesterday" => return midnight(base.checked_sub_signed(one_day)?),
        _ => {}
    }

    if let Some(seconds) = text.strip_prefix('@') {
        return DateTime::<Utc>::from_timestamp(seconds.parse().ok()?, 0);
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.with_timezone(&Utc));
    }
    if let Ok(moment) = DateTime::parse_from_rfc2822(text) {
        return Some(moment.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(moment) = NaiveDateTime::parse_from_str(text, format) {
            return Some(moment.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(text, format) {
            return day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    apply_relative(text, base)
}

/// `+1 day`, `-2 weeks 3 hours` and similar amount/unit pairs.
fn apply_relative(text: &str, base: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.is_empty() || parts.len() % 2 != 0 {
        return None;
    }

    let mut moment = base;
    for pair in parts.chunks(2) {
        let amount: i64 = pair[0].strip_prefix('+').unwrap_or(pair[0]).parse().ok()?;
        let unit = pair[1].to_ascii_lowercase();
        let unit = unit.strip_suffix('s').unwrap_or(&unit);

        moment = match unit {
            "sec" | "second" => moment.checked_add_signed(TimeDelta::try_seconds(amount)?)?,
            "min" | "minute" => moment.checked_add_signed(TimeDelta::try_minutes(amount)?)?,
            "hour" => moment.checked_add_signed(TimeDelta::try_hours(amount)?)?,
            "day" => moment.checked_add_signed(TimeDelta::try_days(amount)?)?,
            "week" => moment.checked_add_signed(TimeDelta::try_weeks(amount)?)?,
            "month" => shift_months(moment, amount)?,
            "year" => shift_months(moment, amount.checked_mul(12)?)?,
            _ => return None,
        };
    }
    Some(moment)
}

fn shift_months(moment: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        moment.checked_add_months(months)
    } else {
        moment.checked_sub_months(months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpn::ErrorKind;

    // 2023-11-14 22:13:20 UTC, a Tuesday
    const SAMPLE: &str = "1700000000";

    fn s(value: &str) -> Scalar {
        Scalar::from(value)
    }

    fn formatted(format: &str, timestamp: &str) -> String {
        date(&[s(format), s(timestamp)]).unwrap().to_string()
    }

    fn timestamp(args: &[Scalar]) -> f64 {
        strtotime(args).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_date_letters() {
        assert_eq!(formatted("Y-m-d H:i:s", "0"), "1970-01-01 00:00:00");
        assert_eq!(formatted("D, d M Y", "31536000"), "Fri, 01 Jan 1971");
        assert_eq!(formatted("l jS F", SAMPLE), "Tuesday 14th November");
        assert_eq!(formatted("N w z t L", SAMPLE), "2 2 317 30 0");
        assert_eq!(formatted("g:i a / h A / G", SAMPLE), "10:13 pm / 10 PM / 22");
        assert_eq!(formatted("c", SAMPLE), "2023-11-14T22:13:20+00:00");
        assert_eq!(formatted("r", SAMPLE), "Tue, 14 Nov 2023 22:13:20 +0000");
        assert_eq!(formatted("U", SAMPLE), SAMPLE);
    }

    #[test]
    fn test_date_escapes() {
        assert_eq!(formatted(r"\Y: Y", "0"), "Y: 1970");
        assert_eq!(formatted("Y#", "0"), "1970#");
    }

    #[test]
    fn test_ordinal_suffix() {
        let suffixes: Vec<&str> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31]
            .into_iter()
            .map(ordinal_suffix)
            .collect();
        assert_eq!(
            suffixes,
            vec!["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd", "st"]
        );
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
    }

    #[test]
    fn test_time_is_now() {
        let before = Utc::now().timestamp() as f64;
        let now = time(&[]).unwrap().as_number().unwrap();
        assert!(now >= before && now <= before + 5.0);
    }

    #[test]
    fn test_strtotime_absolute() {
        assert_eq!(timestamp(&[s("1970-01-02")]), 86400.0);
        assert_eq!(timestamp(&[s("@42")]), 42.0);
        assert_eq!(timestamp(&[s("2023-11-14T22:13:20Z")]), 1_700_000_000.0);
        assert_eq!(timestamp(&[s("2023-11-14 22:13:20")]), 1_700_000_000.0);
        assert_eq!(
            timestamp(&[s("Tue, 14 Nov 2023 22:13:20 +0000")]),
            1_700_000_000.0
        );
    }

    #[test]
    fn test_strtotime_relative() {
        assert_eq!(timestamp(&[s("+1 day"), s("0")]), 86400.0);
        assert_eq!(timestamp(&[s("+1 week 2 days"), s("0")]), 777_600.0);
        assert_eq!(timestamp(&[s("-1 hour"), s("3600")]), 0.0);
        assert_eq!(timestamp(&[s("+1 month"), s("0")]), 2_678_400.0);
        assert_eq!(timestamp(&[s("now"), s(SAMPLE)]), 1_700_000_000.0);
        assert_eq!(timestamp(&[s("tomorrow"), s(SAMPLE)]), 1_700_006_400.0);
        assert_eq!(timestamp(&[s("Yesterday"), s(SAMPLE)]), 1_699_833_600.0);
    }

    #[test]
    fn test_strtotime_rejects_garbage() {
        for text in ["garbage", "+1 fortnight", "1 day extra", ""] {
            let err = strtotime(&[s(text), s("0")]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FunctionFailed, "{text:?}");
        }
    }
}
