//! Gateway field formatting rules.

use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;

use crate::error::{PaymentError, PaymentResult};

fn decimal_pattern() -> PaymentResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+(\.\d+)?$|^\.\d+$"))
        .as_ref()
        .map_err(|e| PaymentError::configuration(format!("Invalid decimal pattern: {}", e)))
}

/// Parses a major-unit amount such as `12.50`.
pub fn parse_amount(field: &str, raw: &str) -> PaymentResult<f64> {
    let trimmed = raw.trim();
    if !decimal_pattern()?.is_match(trimmed) {
        return Err(PaymentError::invalid_field(
            field,
            format!("'{}' is not a positive decimal amount", trimmed),
        ));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| PaymentError::invalid_field(field, "amount out of range"))?;

    if !value.is_finite() {
        return Err(PaymentError::invalid_field(field, "amount out of range"));
    }
    Ok(value)
}

/// Converts a major-unit amount to minor units with a fixed x100 rule,
/// rounding to the nearest integer.
pub fn to_minor_units(field: &str, raw: &str) -> PaymentResult<String> {
    let value = parse_amount(field, raw)?;
    let minor = (value * 100.0).round();
    if minor > u64::MAX as f64 {
        return Err(PaymentError::invalid_field(field, "amount out of range"));
    }
    Ok((minor as u64).to_string())
}

/// `ddMMyyyyHHmmss`, in the timestamp's own offset.
pub fn format_transaction_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%d%m%Y%H%M%S").to_string()
}

/// ISO-8601 UTC without fractional seconds, e.g. `2025-03-01T09:15:00Z`.
pub fn format_signed_date_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Trims a caller-supplied reference and keeps at most `max_len` characters.
pub fn truncate_reference(raw: &str, max_len: usize) -> String {
    raw.trim().chars().take(max_len).collect()
}

/// Random uppercase hex reference of exactly `len` characters.
pub fn generate_reference(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    OsRng.fill_bytes(&mut bytes);
    let mut encoded = hex::encode_upper(bytes);
    encoded.truncate(len);
    encoded
}
