//! User validation utilities

use thiserror::Error;
use validator::ValidateEmail;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Username exceeds maximum length of {0} characters")]
    UsernameTooLong(usize),

    #[error("Username contains invalid character: '{0}'. Only letters, digits and @/./+/-/_ are allowed")]
    InvalidUsernameCharacter(char),

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Password is too short. Minimum length is {0} characters")]
    PasswordTooShort(usize),

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),
}

const MAX_USERNAME_LENGTH: usize = 150;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate a username
///
/// Rules:
/// - Cannot be empty
/// - Maximum 150 characters
/// - Letters, digits and `@ . + - _` only
pub fn validate_username(username: &str) -> Result<(), UserValidationError> {
    if username.is_empty() {
        return Err(UserValidationError::EmptyUsername);
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(UserValidationError::UsernameTooLong(MAX_USERNAME_LENGTH));
    }

    for c in username.chars() {
        if !c.is_alphanumeric() && !matches!(c, '@' | '.' | '+' | '-' | '_') {
            return Err(UserValidationError::InvalidUsernameCharacter(c));
        }
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(UserValidationError::InvalidEmail)
    }
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}
