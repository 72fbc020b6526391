//! Client-side checks run before any request is sent.

use thiserror::Error;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum search query length accepted by the server.
pub const MIN_QUERY_LENGTH: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Search query must be at least {min} characters")]
    QueryTooShort { min: usize },
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    require(email, "Email")?;
    require(password, "Password")
}

pub fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
) -> Result<(), ValidationError> {
    require(email, "Email")?;
    require(username, "Username")?;
    require(password, "Password")?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Validate and normalize a search query.
pub fn validate_query(query: &str) -> Result<&str, ValidationError> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LENGTH {
        return Err(ValidationError::QueryTooShort {
            min: MIN_QUERY_LENGTH,
        });
    }
    Ok(query)
}

/// Sign-up form input, including the confirmation field.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.email, "Email")?;
        require(&self.username, "Username")?;
        require(&self.password, "Password")?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        validate_registration(&self.email, &self.username, &self.password)
    }
}
