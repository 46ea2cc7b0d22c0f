//! Accumulated form validation messages.

use std::fmt;

/// Human-readable validation messages collected while checking a form.
///
/// Forms are checked completely before anything is persisted, so the page can
/// show every problem at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a message.
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Record `message` unless `ok` holds.
    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.push(message);
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// `Ok(())` when no message was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one message was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

impl From<String> for ValidationErrors {
    fn from(message: String) -> Self {
        Self(vec![message])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_messages() {
        let mut errors = ValidationErrors::new();
        errors.check(true, "never shown");
        errors.check(false, "First name is required");
        errors.push("Surname is required");

        assert_eq!(
            errors.messages(),
            ["First name is required", "Surname is required"]
        );
        assert_eq!(
            errors.to_string(),
            "First name is required; Surname is required"
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
