//! Text parsing helpers shared by the [`Arg`](crate::Arg) implementations.
//!
//! - [`slice_literal_fields`]: splits a bracketed list literal into its
//!   top-level fields
//! - [`parse_duration`]: `1h30m`, `250ms`, `1.5s` style durations
//! - [`parse_bool`]: `true`/`false`/`1`/`0`/`t`/`f`
//! - time parsing against the [`TIME_FORMATS`], [`NAIVE_DATE_TIME_FORMATS`]
//!   and [`DATE_FORMATS`] lists

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::ConvertError;

/// Formats with an explicit UTC offset, tried in order after RFC 3339.
pub const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%a, %d %b %Y %H:%M:%S %z",
];

/// Formats without offset, tried in order.
pub const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Date-only formats, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

const RFC3339: &str = "RFC 3339";

/// Splits a `[a,b,c]` literal into its top-level, whitespace-trimmed fields.
///
/// Nesting depth is tracked separately for `[]` and `{}`, so
/// `[[1,2],[3,4]]` yields `"[1,2]"` and `"[3,4]"`, and commas inside JSON
/// objects do not split. `[]` yields no fields.
pub fn slice_literal_fields(source: &str) -> Result<Vec<String>, ConvertError> {
    if !source.starts_with('[') {
        return Err(ConvertError::MissingOpenBracket(source.to_string()));
    }
    if !source.ends_with(']') {
        return Err(ConvertError::MissingCloseBracket(source.to_string()));
    }

    let unbalanced = |symbol| ConvertError::Unbalanced {
        input: source.to_string(),
        symbol,
    };

    let mut fields = Vec::new();
    let mut object_depth = 0i32;
    let mut bracket_depth = 0i32;
    let mut begin = 1;

    for (i, c) in source.char_indices() {
        match c {
            '{' => object_depth += 1,
            '}' => {
                object_depth -= 1;
                if object_depth < 0 {
                    return Err(unbalanced('}'));
                }
            }
            '[' => bracket_depth += 1,
            ']' => {
                bracket_depth -= 1;
                if bracket_depth < 0 {
                    return Err(unbalanced(']'));
                }
                if object_depth == 0 && bracket_depth == 0 {
                    if i != source.len() - 1 {
                        // text after the closing bracket
                        return Err(unbalanced(']'));
                    }
                    let raw = &source[begin..i];
                    let field = raw.trim();
                    if !field.is_empty() || (!raw.is_empty() && !fields.is_empty()) {
                        fields.push(field.to_string());
                    }
                }
            }
            ',' if object_depth == 0 && bracket_depth == 1 => {
                fields.push(source[begin..i].trim().to_string());
                begin = i + 1;
            }
            _ => {}
        }
    }

    if object_depth > 0 {
        return Err(unbalanced('{'));
    }
    if bracket_depth > 0 {
        return Err(unbalanced('['));
    }
    Ok(fields)
}

/// Parses a boolean the way command lines usually spell them.
pub fn parse_bool(source: &str) -> Result<bool, ConvertError> {
    match source.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(ConvertError::Parse {
            input: source.to_string(),
            type_name: "bool".into(),
            message: "expected true, false, t, f, 1 or 0".into(),
        }),
    }
}

/// Parses a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted. Negative durations are rejected.
pub fn parse_duration(source: &str) -> Result<Duration, ConvertError> {
    let fail = |message: &str| ConvertError::Parse {
        input: source.to_string(),
        type_name: "Duration".into(),
        message: message.to_string(),
    };

    let trimmed = source.trim();
    let mut rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest.starts_with('-') {
        return Err(fail("negative durations are not supported"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(fail("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];
        if number.is_empty() || number == "." {
            return Err(fail("expected a number"));
        }

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => return Err(fail("missing unit")),
            _ => return Err(fail(&format!("unknown unit {unit:?}"))),
        };

        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if frac_part.contains('.') {
            return Err(fail("malformed number"));
        }
        let int: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| fail("number out of range"))?
        };
        let mut nanos = int
            .checked_mul(unit_nanos)
            .ok_or_else(|| fail("duration out of range"))?;
        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| fail("malformed number"))?;
            nanos += frac * unit_nanos / 10u128.pow(digits.len() as u32);
        }
        total = total
            .checked_add(nanos)
            .ok_or_else(|| fail("duration out of range"))?;
    }

    let nanos = u64::try_from(total).map_err(|_| fail("duration out of range"))?;
    Ok(Duration::from_nanos(nanos))
}

fn time_error(source: &str, type_name: &str, formats: Vec<&'static str>) -> ConvertError {
    ConvertError::Time {
        input: source.to_string(),
        type_name: type_name.to_string(),
        formats,
    }
}

fn try_fixed(source: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(source).ok().or_else(|| {
        TIME_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(source, format).ok())
    })
}

fn try_naive(source: &str) -> Option<NaiveDateTime> {
    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(source, format).ok())
        .or_else(|| try_date(source).map(|date| date.and_time(NaiveTime::MIN)))
}

fn try_date(source: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(source, format).ok())
}

/// Parses a timestamp that carries a UTC offset.
pub fn parse_fixed_offset(source: &str) -> Result<DateTime<FixedOffset>, ConvertError> {
    try_fixed(source.trim()).ok_or_else(|| {
        let mut formats = vec![RFC3339];
        formats.extend_from_slice(TIME_FORMATS);
        time_error(source, "DateTime<FixedOffset>", formats)
    })
}

/// Parses a UTC timestamp. Values without offset are taken as UTC.
pub fn parse_utc(source: &str) -> Result<DateTime<Utc>, ConvertError> {
    let trimmed = source.trim();
    try_fixed(trimmed)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|| try_naive(trimmed).map(|t| t.and_utc()))
        .ok_or_else(|| {
            let mut formats = vec![RFC3339];
            formats.extend_from_slice(TIME_FORMATS);
            formats.extend_from_slice(NAIVE_DATE_TIME_FORMATS);
            formats.extend_from_slice(DATE_FORMATS);
            time_error(source, "DateTime<Utc>", formats)
        })
}

/// Parses a date and time without offset. Dates alone mean midnight.
pub fn parse_naive_date_time(source: &str) -> Result<NaiveDateTime, ConvertError> {
    try_naive(source.trim()).ok_or_else(|| {
        let mut formats = NAIVE_DATE_TIME_FORMATS.to_vec();
        formats.extend_from_slice(DATE_FORMATS);
        time_error(source, "NaiveDateTime", formats)
    })
}

pub fn parse_date(source: &str) -> Result<NaiveDate, ConvertError> {
    try_date(source.trim()).ok_or_else(|| time_error(source, "NaiveDate", DATE_FORMATS.to_vec()))
}
