//! Monetary amount backed by decimal arithmetic.
//!
//! Used for a client's accumulated spend, the numeric attribute the
//! administration filter ranges over. Amounts are never negative and always
//! carry at most two decimal places.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Amount`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input is not a decimal number.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
    /// The input is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The input does not fit the stored `NUMERIC(12, 2)` column.
    #[error("amount cannot exceed {}", Amount::MAX)]
    TooLarge,
}

/// A non-negative amount of money in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount the database can hold.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2)); // 9_999_999_999.99

    /// Create an amount from a decimal, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Negative`] for values below zero and
    /// [`AmountError::TooLarge`] for values above [`Amount::MAX`].
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative);
        }
        let rounded = value.round_dp(2);
        if rounded > Self::MAX.0 {
            return Err(AmountError::TooLarge);
        }
        Ok(Self(rounded))
    }

    /// Create an amount from a count of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Parse user input such as `"120"`, `"99.5"` or `"12,50"`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Invalid`] when the text is not a number, and
    /// the errors of [`Amount::new`] when it is out of range.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let normalised = input.trim().replace(',', ".");
        let value: Decimal = normalised
            .parse()
            .map_err(|_| AmountError::Invalid(input.trim().to_owned()))?;
        Self::new(value)
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::str::FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Amount {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Amount {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let decimal = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(decimal)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Amount {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dot_and_comma() {
        assert_eq!(Amount::parse("12.50").unwrap(), Amount::from_cents(1250));
        assert_eq!(Amount::parse(" 12,5 ").unwrap(), Amount::from_cents(1250));
        assert_eq!(Amount::parse("100").unwrap(), Amount::from_cents(10_000));
    }

    #[test]
    fn test_parse_rejects_garbage_and_negatives() {
        assert_eq!(
            Amount::parse("abc"),
            Err(AmountError::Invalid("abc".to_owned()))
        );
        assert_eq!(Amount::parse("-1"), Err(AmountError::Negative));
        assert!(Amount::parse("").is_err());
    }

    #[test]
    fn test_parse_caps_at_column_precision() {
        assert_eq!(Amount::parse("9999999999.99").unwrap(), Amount::MAX);
        assert_eq!(Amount::parse("100000000000"), Err(AmountError::TooLarge));
        assert_eq!(Amount::parse("9999999999.999"), Err(AmountError::TooLarge));
        assert_eq!(
            AmountError::TooLarge.to_string(),
            "amount cannot exceed 9999999999.99"
        );
    }

    #[test]
    fn test_ordering_follows_value() {
        assert!(Amount::from_cents(5_000) < Amount::from_cents(12_000));
        assert_eq!(Amount::parse("50").unwrap(), Amount::from_cents(5_000));
    }

    #[test]
    fn test_display_has_two_decimals() {
        assert_eq!(Amount::from_cents(5_000).to_string(), "50.00");
        assert_eq!(Amount::parse("0.999").unwrap().to_string(), "1.00");
    }
}
