//! Principal kinds.

use serde::{Deserialize, Serialize};

/// The two kinds of authenticated identity a session can hold.
///
/// Each kind has its own login flow and its own slot in the session, so a
/// browser may be logged in as a user and as an administrator at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// Customer/employee account.
    User,
    /// Store administrator.
    Administrator,
}

impl PrincipalKind {
    /// Path of the login entry point for this kind.
    #[must_use]
    pub const fn login_path(self) -> &'static str {
        match self {
            Self::User => "/auth/login",
            Self::Administrator => "/admin/login",
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Administrator => write!(f, "administrator"),
        }
    }
}

impl std::str::FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "administrator" => Ok(Self::Administrator),
            _ => Err(format!("invalid principal kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips() {
        for kind in [PrincipalKind::User, PrincipalKind::Administrator] {
            assert_eq!(kind.to_string().parse::<PrincipalKind>(), Ok(kind));
        }
        assert!("root".parse::<PrincipalKind>().is_err());
    }

    #[test]
    fn test_login_paths_are_distinct() {
        assert_ne!(
            PrincipalKind::User.login_path(),
            PrincipalKind::Administrator.login_path()
        );
    }
}
