//! Lead payload validation.
//!
//! Checks an untyped JSON body against the lead schema and either returns a
//! normalized [`Lead`] or every violation found, so a caller can fix all of
//! them in one round trip.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

use crate::errors::AppError;
use crate::models::{Lead, DEFAULT_SOURCE};

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const FREE_TEXT_MAX_LEN: usize = 1000;

/// Schema field names, in the order violations are reported.
pub const LEAD_FIELDS: [&str; 7] = [
    "first_name",
    "last_name",
    "email",
    "phone",
    "company",
    "message",
    "source",
];

// local@domain.tld, TLD of at least two letters
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$",
    )
    .expect("email regex is valid")
});

/// Every field-level violation of one payload, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub details: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {}", self.details.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.details)
    }
}

/// Checks the email grammar: dotted domain with an alphabetic TLD, and no
/// leading, trailing or doubled dots in the local part.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > EMAIL_MAX_LEN || !EMAIL_REGEX.is_match(email) {
        return false;
    }

    let Some((local, _domain)) = email.split_once('@') else {
        return false;
    };

    !(local.starts_with('.') || local.ends_with('.') || local.contains(".."))
}

/// Validates a raw submission.
///
/// Collects all violations rather than stopping at the first one. Optional
/// fields that are absent or `null` are not errors; `source` falls back to
/// [`DEFAULT_SOURCE`].
pub fn validate_lead(payload: &Value, received_at: DateTime<Utc>) -> Result<Lead, ValidationError> {
    let Some(fields) = payload.as_object() else {
        return Err(ValidationError {
            details: vec![r#""value" must be of type object"#.to_string()],
        });
    };

    let mut errors = Vec::new();

    let first_name = required_string(fields, "first_name", NAME_MAX_LEN, &mut errors);
    let last_name = required_string(fields, "last_name", NAME_MAX_LEN, &mut errors);
    // Overlong addresses are rejected by the grammar check below.
    let email = required_string(fields, "email", usize::MAX, &mut errors).and_then(|email| {
        if is_valid_email(&email) {
            Some(email)
        } else {
            errors.push(r#""email" must be a valid email"#.to_string());
            None
        }
    });
    let phone = optional_string(fields, "phone", FREE_TEXT_MAX_LEN, true, &mut errors);
    let company = optional_string(fields, "company", FREE_TEXT_MAX_LEN, true, &mut errors);
    let message = optional_string(fields, "message", FREE_TEXT_MAX_LEN, true, &mut errors);
    let source = optional_string(fields, "source", FREE_TEXT_MAX_LEN, false, &mut errors);

    let mut unknown: Vec<&String> = fields
        .keys()
        .filter(|key| !LEAD_FIELDS.contains(&key.as_str()))
        .collect();
    unknown.sort();
    errors.extend(
        unknown
            .into_iter()
            .map(|key| format!(r#""{}" is not allowed"#, key)),
    );

    match (first_name, last_name, email) {
        (Some(first_name), Some(last_name), Some(email)) if errors.is_empty() => Ok(Lead {
            first_name,
            last_name,
            email,
            phone,
            company,
            message,
            source: source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            received_at,
        }),
        _ => Err(ValidationError { details: errors }),
    }
}

fn required_string(
    fields: &Map<String, Value>,
    name: &str,
    max_len: usize,
    errors: &mut Vec<String>,
) -> Option<String> {
    match fields.get(name) {
        None | Some(Value::Null) => {
            errors.push(format!(r#""{}" is required"#, name));
            None
        }
        Some(value) => checked_string(name, value, max_len, false, errors),
    }
}

fn optional_string(
    fields: &Map<String, Value>,
    name: &str,
    max_len: usize,
    allow_empty: bool,
    errors: &mut Vec<String>,
) -> Option<String> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(value) => checked_string(name, value, max_len, allow_empty, errors),
    }
}

fn checked_string(
    name: &str,
    value: &Value,
    max_len: usize,
    allow_empty: bool,
    errors: &mut Vec<String>,
) -> Option<String> {
    let Some(raw) = value.as_str() else {
        errors.push(format!(r#""{}" must be a string"#, name));
        return None;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() && !allow_empty {
        errors.push(format!(r#""{}" is not allowed to be empty"#, name));
        return None;
    }
    if trimmed.chars().count() > max_len {
        errors.push(format!(
            r#""{}" length must be less than or equal to {} characters long"#,
            name, max_len
        ));
        return None;
    }

    Some(trimmed.to_string())
}
