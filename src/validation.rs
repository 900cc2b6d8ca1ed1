//! Request body rules for registration, login and profile updates.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const PASSWORD_SPECIALS: &str = "@$!%*?&";

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z ]{3,}$").unwrap());

/// Collects `"field: message"` entries and turns them into a single 422.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.0.push(format!("{}: {}", field, message));
        }
        self
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self.0))
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err("value is not a valid email address".to_string());
    }
    Ok(())
}

/// At least 8 characters drawn from letters, digits and `@$!%*?&`, with at
/// least one of each class.
pub fn validate_password(password: &str) -> Result<(), String> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let strong = password.chars().count() >= MIN_PASSWORD_LENGTH
        && allowed
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if !strong {
        return Err("Password must be at least 8 characters long, include an uppercase letter, \
                    a lowercase letter, a number, and a special character."
            .to_string());
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if !NAME_REGEX.is_match(name) {
        return Err("Name must be at least 3 characters long and contain only letters \
                    (a-z, A-Z) and spaces"
            .to_string());
    }
    Ok(())
}
