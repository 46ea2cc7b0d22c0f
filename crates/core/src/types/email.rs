//! Login identifier shared by users and administrators.
//!
//! The stored form is normalised: surrounding whitespace is dropped and the
//! whole address is lower-cased, so two spellings of the same mailbox compare
//! equal and hit the same unique index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest address accepted (RFC 5321).
const MAX_EMAIL_LEN: usize = 254;

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailError {
    #[error("an email address is required")]
    Blank,
    #[error("an email address cannot exceed {MAX_EMAIL_LEN} characters")]
    Oversized,
    #[error("an email address cannot contain spaces")]
    Whitespace,
    #[error("an email address needs exactly one @")]
    AtSign,
    #[error("an email address needs text on both sides of the @")]
    MissingPart,
}

/// A normalised email address.
///
/// ```
/// use tienda_core::Email;
///
/// let email: Email = "  Ana.Lopez@Example.com ".parse().unwrap();
/// assert_eq!(email.as_str(), "ana.lopez@example.com");
/// assert!("a@b@c".parse::<Email>().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalise raw input.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmailError`] the input runs into.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let candidate = raw.trim();

        match candidate {
            "" => Err(EmailError::Blank),
            c if c.len() > MAX_EMAIL_LEN => Err(EmailError::Oversized),
            c if c.contains(char::is_whitespace) => Err(EmailError::Whitespace),
            c if c.matches('@').count() != 1 => Err(EmailError::AtSign),
            c if c.starts_with('@') || c.ends_with('@') => Err(EmailError::MissingPart),
            c => Ok(Self(c.to_lowercase())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
    use sqlx::{Decode, Encode, Postgres, Type};

    use super::Email;

    impl Type<Postgres> for Email {
        fn type_info() -> PgTypeInfo {
            <String as Type<Postgres>>::type_info()
        }

        fn compatible(ty: &PgTypeInfo) -> bool {
            <String as Type<Postgres>>::compatible(ty)
        }
    }

    // Stored rows go through the same parse as user input.
    impl<'r> Decode<'r, Postgres> for Email {
        fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
            let raw = <&str as Decode<Postgres>>::decode(value)?;
            Ok(Self::parse(raw)?)
        }
    }

    impl Encode<'_, Postgres> for Email {
        fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
            <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
        }
    }
}
