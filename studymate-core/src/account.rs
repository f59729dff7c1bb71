//! Sign-in and payment form validation
//!
//! Failures are returned as [`Error::Validation`] with every problem
//! listed, so callers can show them inline next to the form.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::session::{DownloadRecord, PaymentRecord, User};
use crate::{Error, Result};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("valid phone regex"));

const MIN_PASSWORD_LEN: usize = 6;

/// Check the sign-in form and build the user on success
pub fn validate_sign_in(name: &str, email: &str, password: &str) -> Result<User> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }
    if !EMAIL_RE.is_match(email.trim()) {
        errors.push(format!("'{}' is not a valid email address", email.trim()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    if !errors.is_empty() {
        return Err(Error::Validation(errors.join("; ")));
    }

    Ok(User {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        email: email.trim().to_ascii_lowercase(),
        joined_at: Utc::now(),
    })
}

/// Normalize a phone number, rejecting anything that is not 9-15 digits
/// with an optional leading `+`. Spaces, dashes and parentheses are ignored.
pub fn validate_phone(phone: &str) -> Result<String> {
    let normalized: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    if PHONE_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(Error::Validation(format!(
            "'{}' is not a valid phone number",
            phone.trim()
        )))
    }
}

/// Check the payment form and build the payment record on success
pub fn validate_payment(phone: &str, amount: f64, method: &str) -> Result<PaymentRecord> {
    let mut errors = Vec::new();

    let phone = match validate_phone(phone) {
        Ok(p) => Some(p),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    };
    if !amount.is_finite() || amount <= 0.0 {
        errors.push("amount must be a positive number".to_string());
    }
    if method.trim().is_empty() {
        errors.push("payment method must not be empty".to_string());
    }

    match phone {
        Some(phone) if errors.is_empty() => Ok(PaymentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            phone,
            amount,
            method: method.trim().to_string(),
            date: Utc::now(),
        }),
        _ => Err(Error::Validation(errors.join("; "))),
    }
}

pub fn download_record(name: impl Into<String>, kind: impl Into<String>) -> DownloadRecord {
    DownloadRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.into(),
        kind: kind.into(),
        date: Utc::now(),
    }
}
