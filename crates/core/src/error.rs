//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// The `Display` output of every variant is safe to show to API clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more fields failed validation. Messages are joined with `". "`.
    #[error("Invalid input. {0}")]
    Validation(String),

    /// An identifier could not be parsed; carries `"<field>: <value>"`.
    #[error("Invalid {0}")]
    InvalidId(String),

    /// A request parameter could not be interpreted; the message is shown verbatim.
    #[error("{0}")]
    Malformed(String),

    /// The referenced document does not exist (or is hidden from the caller).
    #[error("No {0} found with that ID")]
    NotFound(&'static str),

    /// A unique key is already taken by another document.
    #[error("Duplicate {field}: value ({value})")]
    Duplicate { field: String, value: String },

    /// The operation conflicts with current state.
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Collapse several validation messages into a single error.
    ///
    /// Returns `Ok(())` when `messages` is empty.
    pub fn check(messages: Vec<String>) -> DomainResult<()> {
        if messages.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(messages.join(". ")))
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound(resource)
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_joins_messages() {
        let err = DomainError::check(vec!["a".into(), "b".into()]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input. a. b");
        assert!(DomainError::check(Vec::new()).is_ok());
    }

    #[test]
    fn duplicate_message_names_field_and_value() {
        let err = DomainError::duplicate("email", "a@b.io");
        assert_eq!(err.to_string(), "Duplicate email: value (a@b.io)");
    }
}
