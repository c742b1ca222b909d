//! Time builtins.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::{CallContext, string_arg};
use crate::api::Timezone;
use crate::values::Value;
use crate::vm::RuntimeError;

type Output = Result<Value, RuntimeError>;

/// Current instant in the configured zone.
pub(super) fn now(ctx: &mut CallContext<'_>, _args: &[Value]) -> Output {
    Ok(Value::Time(ctx.timezone.now()))
}

pub(super) fn duration(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let text = string_arg("duration", args, 0)?;
    parse_duration(text)
        .map(Value::Duration)
        .map_err(RuntimeError::mismatch)
}

// ============================================================================
// Durations
// ============================================================================

fn unit_nanos(unit: &str) -> Option<f64> {
    Some(match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        _ => return None,
    })
}

/// Parses durations such as `1h30m`, `-1.5s` or `300ms`.
///
/// ```
/// use chrono::Duration;
/// use exprel_core::builtins::parse_duration;
///
/// assert_eq!(parse_duration("1h30m"), Ok(Duration::minutes(90)));
/// assert!(parse_duration("1x").is_err());
/// ```
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let invalid = || format!("time: invalid duration {:?}", text);
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }
    let mut total = 0.0_f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(format!("time: missing unit in duration {:?}", text));
        }
        let unit = &rest[..unit_len];
        let scale = unit_nanos(unit)
            .ok_or_else(|| format!("time: unknown unit {:?} in duration {:?}", unit, text))?;
        total += number * scale;
        rest = &rest[unit_len..];
    }
    if total > i64::MAX as f64 {
        return Err(invalid());
    }
    let nanos = total.round() as i64;
    Ok(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}

// ============================================================================
// Dates
// ============================================================================

/// Layouts tried, in order, when `date` gets no layout.
const DEFAULT_LAYOUTS: &[&str] = &["%Y-%m-%d", "%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// `date(s)`, `date(s, layout)` or `date(s, layout, zone)`. Layouts use
/// `strftime` syntax; inputs without an offset are read in `zone`, or
/// in the configured timezone.
pub(super) fn date(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let text = string_arg("date", args, 0)?;
    let zone = match args.get(2) {
        Some(_) => {
            let name = string_arg("date", args, 2)?;
            Timezone::parse(name)
                .ok_or_else(|| RuntimeError::mismatch(format!("unknown time zone {}", name)))?
        }
        None => *ctx.timezone,
    };
    let parsed = match args.get(1) {
        Some(_) => parse_with_layout(text, string_arg("date", args, 1)?, &zone),
        None => parse_default(text, &zone),
    };
    parsed
        .map(Value::Time)
        .ok_or_else(|| RuntimeError::mismatch(format!("invalid date {}", text)))
}

fn parse_default(text: &str, zone: &Timezone) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t);
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(text) {
        return Some(t);
    }
    DEFAULT_LAYOUTS
        .iter()
        .find_map(|layout| parse_with_layout(text, layout, zone))
}

fn parse_with_layout(
    text: &str,
    layout: &str,
    zone: &Timezone,
) -> Option<DateTime<chrono::FixedOffset>> {
    if layout.contains("%z") || layout.contains("%:z") || layout.contains("%#z") {
        return DateTime::parse_from_str(text, layout).ok();
    }
    let naive = NaiveDateTime::parse_from_str(text, layout)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, layout)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            let time = NaiveTime::parse_from_str(text, layout).ok()?;
            NaiveDate::from_ymd_opt(0, 1, 1).map(|d| d.and_time(time))
        })?;
    zone.localize(&naive)
}
