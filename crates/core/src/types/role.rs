//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0} (expected admin, employer or client)")]
pub struct RoleParseError(pub String);

/// Role of an application user.
///
/// Stored in Postgres as the `user_role` enum and embedded verbatim in the
/// session payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(
    feature = "postgres",
    derive(sqlx::Type),
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages user accounts.
    Admin,
    /// Manages inventory, clients and suppliers.
    Employer,
    /// Storefront customer.
    #[default]
    Client,
}

impl Role {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employer => "employer",
            Self::Client => "client",
        }
    }

    /// Landing page for this role after login.
    #[must_use]
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Employer => "/employer",
            Self::Client => "/client",
        }
    }

    /// Role implied by the user form: the admin flag wins, otherwise the
    /// account type decides.
    #[must_use]
    pub const fn from_account_type(is_admin: bool, is_employer: bool) -> Self {
        if is_admin {
            Self::Admin
        } else if is_employer {
            Self::Employer
        } else {
            Self::Client
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "employer" => Ok(Self::Employer),
            "client" => Ok(Self::Client),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}
