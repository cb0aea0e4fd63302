//! Client-side form rules. Every check here runs before a request is sent.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::error::{DomainError, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

static WEBSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
    .expect("static regex")
});

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("static regex"));

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        })
    }
}

/// Croatian numbers: `385` followed by 9 digits, or `0` followed by 9 digits.
/// Separators and a leading `+` are ignored.
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let ok = if digits.starts_with("385") {
        digits.len() == 12
    } else if digits.starts_with('0') {
        digits.len() == 10
    } else {
        false
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

/// Empty is accepted; the website field is optional.
pub fn validate_website(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() || WEBSITE_RE.is_match(url) {
        Ok(())
    } else {
        Err(ValidationError::InvalidWebsite)
    }
}

/// Empty is accepted; otherwise only ASCII digits.
pub fn validate_numeric(field: &str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::NotNumeric {
            field: field.to_string(),
        })
    }
}

pub fn validate_required(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::required(field)),
    }
}

pub fn validate_time(time: &str) -> Result<(), ValidationError> {
    if TIME_RE.is_match(time.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTime)
    }
}

/// Check a flat form: every `required` field must be non-blank, and the
/// well-known `email`, `phone_number` and `website` fields are format-checked
/// when filled in. Returns one entry per failing field, in form order.
pub fn validate_form(
    fields: &[(&str, &str)],
    required: &[&str],
) -> Vec<(String, ValidationError)> {
    let value_of = |name: &str| {
        fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| *value)
    };

    let mut errors: Vec<(String, ValidationError)> = required
        .iter()
        .filter_map(|name| {
            validate_required(name, value_of(name))
                .err()
                .map(|e| (name.to_string(), e))
        })
        .collect();

    let format_checks: [(&str, fn(&str) -> Result<(), ValidationError>); 3] = [
        ("email", validate_email),
        ("phone_number", validate_phone_number),
        ("website", validate_website),
    ];
    for (name, check) in format_checks {
        let Some(value) = value_of(name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        if let Err(e) = check(value) {
            // a required-field error already covers this field
            if !errors.iter().any(|(field, _)| field == name) {
                errors.push((name.to_string(), e));
            }
        }
    }
    errors
}

/// `validate_form` folded into a single domain error.
pub fn ensure_valid(fields: &[(&str, &str)], required: &[&str]) -> Result<(), DomainError> {
    let errors = validate_form(fields, required);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(errors))
    }
}
