//! Field validators shared by the request types, plus flattening of
//! `validator` errors into pointer/message pairs for error responses.

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid username regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("valid email regex")
    })
}

fn code2_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}$").expect("valid language code regex"))
}

fn verification_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{32}$").expect("valid verification code regex"))
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(2..=32).contains(&len) || !username_regex().is_match(username) {
        return Err(invalid("username", "invalid username"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 128 || !email_regex().is_match(email) {
        return Err(invalid("email", "invalid email"));
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must contain a non-space character"));
    }
    Ok(())
}

pub fn validate_code2(code: &str) -> Result<(), ValidationError> {
    if !code2_regex().is_match(code) {
        return Err(invalid("code2", "invalid language code"));
    }
    Ok(())
}

pub fn validate_verification_code(code: &str) -> Result<(), ValidationError> {
    if !verification_code_regex().is_match(code) {
        return Err(invalid("code", "code is invalid"));
    }
    Ok(())
}

/// Birthdays must fall between 1900-08-04 and today.
pub fn validate_birthday(birthday: &NaiveDate) -> Result<(), ValidationError> {
    let earliest = NaiveDate::from_ymd_opt(1900, 8, 4).expect("valid calendar date");
    let today = Utc::now().date_naive();
    if *birthday < earliest || *birthday > today {
        return Err(invalid("birthday", "invalid birthday"));
    }
    Ok(())
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON pointer into the request document, e.g. `/data/attributes/username`.
    pub pointer: String,
    pub message: String,
}

impl FieldError {
    pub fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

/// Flatten nested `validator` errors, prefixing each pointer with `base`.
pub fn field_errors(base: &str, errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(base, errors, &mut out);
    out.sort_by(|a, b| a.pointer.cmp(&b.pointer));
    out
}

fn collect(base: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let pointer = format!("{}/{}", base, wire_name(field));
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {}", wire_name(field)));
                    out.push(FieldError::new(pointer.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(&pointer, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(&format!("{}/{}", pointer, index), nested, out);
                }
            }
        }
    }
}

/// JSON name of a validated request field. Request structs rename to
/// camelCase through serde; validator reports the Rust field name.
fn wire_name(field: &str) -> &str {
    match field {
        "given_name" => "givenName",
        "family_name" => "familyName",
        "email_verification_code" => "emailVerificationCode",
        other => other,
    }
}
