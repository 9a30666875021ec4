//! Helper functions and utilities
//!
//! This module contains common parsing and formatting helpers used throughout the application.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use crate::utils::errors::{EventHubError, Result};

/// Format an event date for display
pub fn format_event_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Truncate text to a maximum length with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse a calendar date.
///
/// Accepts a plain `YYYY-MM-DD` date or an RFC 3339 timestamp, in which case
/// the UTC calendar date is kept.
pub fn parse_event_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| EventHubError::InvalidInput(format!("Invalid date: {}", input)))
}

/// Parse a positive whole number given as text
pub fn parse_positive_int(field: &str, input: &str) -> Result<i32> {
    let trimmed = input.trim();
    let value = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        })
        .ok_or_else(|| EventHubError::InvalidInput(format!("{} must be a number", field)))?;
    check_positive(field, value)
}

/// Check that a number is a positive `i32`
pub fn check_positive(field: &str, value: i64) -> Result<i32> {
    if value <= 0 {
        return Err(EventHubError::InvalidInput(format!("{} must be greater than 0", field)));
    }
    i32::try_from(value)
        .map_err(|_| EventHubError::InvalidInput(format!("{} is too large", field)))
}

/// Parse a non-negative price given as text
pub fn parse_price(input: &str) -> Result<Decimal> {
    let price = Decimal::from_str(input.trim())
        .map_err(|_| EventHubError::InvalidInput("Price must be a number".to_string()))?;
    check_price(price)
}

/// Largest price a `NUMERIC(10, 2)` column holds
pub const MAX_PRICE: Decimal = Decimal::from_parts(0x540B_E3FF, 2, 0, false, 2); // 9_999_999_999 scaled by 2

/// Check that a price is not negative and fits the stored precision
pub fn check_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(EventHubError::InvalidInput("Price cannot be negative".to_string()));
    }
    let price = price.round_dp(2);
    if price > MAX_PRICE {
        return Err(EventHubError::InvalidInput(format!("Price cannot exceed {}", MAX_PRICE)));
    }
    Ok(price)
}

/// Check that text is at most `max_chars` characters long
pub fn check_length(field: &str, value: String, max_chars: usize) -> Result<String> {
    if value.chars().count() > max_chars {
        return Err(EventHubError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(value)
}

/// Require a non-blank string field
pub fn require_text(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(EventHubError::InvalidInput(format!("{} is required", field))),
    }
}

/// Normalize free-form tags: trim, drop blanks, remove duplicates keeping first occurrence
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Turn an optional string into `None` when blank
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
