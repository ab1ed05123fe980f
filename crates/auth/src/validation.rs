//! Local credential validation
//!
//! Runs before any network call so malformed input never reaches the
//! identity provider.

use validator::{Validate, ValidateEmail};

use crate::error::AuthError;

pub const MAX_EMAIL_LENGTH: u64 = 255;
pub const MIN_PASSWORD_LENGTH: u64 = 6;
/// Upper bound imposed by bcrypt on the provider side
pub const MAX_PASSWORD_LENGTH: u64 = 72;

/// Email/password pair, email already trimmed
#[derive(Debug, Clone, Validate)]
pub struct Credentials {
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    #[validate(length(min = 6, max = 72, message = "Password must be 6 to 72 characters"))]
    pub password: String,
}

impl Credentials {
    /// Trim the email and validate both fields
    pub fn validated(email: &str, password: &str) -> Result<Self, AuthError> {
        let credentials = Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        credentials
            .validate()
            .map_err(|e| AuthError::Validation(format!("Validation failed: {}", e)))?;

        Ok(credentials)
    }
}

pub fn validate_email_address(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.validate_email() {
        return Err(AuthError::Validation(
            "Enter a valid email address".to_string(),
        ));
    }
    if email.chars().count() as u64 > MAX_EMAIL_LENGTH {
        return Err(AuthError::Validation(
            "Email must be at most 255 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count() as u64;
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(AuthError::Validation(
            "Password must be 6 to 72 characters".to_string(),
        ));
    }
    Ok(())
}
