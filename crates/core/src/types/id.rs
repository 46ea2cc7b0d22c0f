//! Newtype IDs for type-safe entity references.
//!
//! Principals and client records are keyed by opaque UUID tokens; the small
//! reference catalogs (client types, block reasons, recovery questions) use
//! database serials. Both flavours come from [`define_id!`].

/// Macro to define a type-safe ID wrapper.
///
/// - `define_id!(uuid Name)` wraps a [`uuid::Uuid`] and adds `Name::generate()`.
/// - `define_id!(serial Name)` wraps an `i32`.
///
/// Every ID gets:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `new()`, `get()`, `Display`, `FromStr` and `From` conversions
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use tienda_core::define_id;
/// define_id!(uuid OrderId);
/// define_id!(serial TaxRateId);
///
/// let order = OrderId::generate();
/// let rate = TaxRateId::new(3);
/// assert_eq!(rate.get(), 3);
/// assert_ne!(order, OrderId::generate());
/// ```
#[macro_export]
macro_rules! define_id {
    (uuid $name:ident) => {
        $crate::define_id!(@common $name, ::uuid::Uuid);

        impl $name {
            /// Generate a fresh random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }
        }
    };
    (serial $name:ident) => {
        $crate::define_id!(@common $name, i32);
    };
    (@common $name:ident, $inner:ty) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Wrap a raw value.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Get the underlying value.
            #[must_use]
            pub const fn get(&self) -> $inner {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = <$inner as ::core::str::FromStr>::Err;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<$inner>().map(Self)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <$inner as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <$inner as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Principals and client records
define_id!(uuid UserId);
define_id!(uuid AdministratorId);
define_id!(uuid ClientId);

// Reference catalogs
define_id!(serial ClientTypeId);
define_id!(serial BlockReasonId);
define_id!(serial RecoveryQuestionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ClientId::generate(), ClientId::generate());
    }

    #[test]
    fn test_uuid_id_round_trips_through_text() {
        let id = UserId::generate();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_serial_id_parses_trimmed_text() {
        let id: ClientTypeId = " 7 ".parse().unwrap();
        assert_eq!(id.get(), 7);
        assert!("seven".parse::<ClientTypeId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&BlockReasonId::new(2)).unwrap();
        assert_eq!(json, "2");
    }
}
