//! Customer authorization role.

use serde::{Deserialize, Serialize};

/// What a customer account is allowed to do.
///
/// `Admin` bypasses every ownership check; `User` may only act on its own
/// account and cart. Serialized as `"User"` / `"Admin"`, which is also the
/// value carried in the bearer token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bookshop.customer_role", rename_all = "snake_case")
)]
pub enum Role {
    /// Regular shopper.
    #[default]
    User,
    /// Store administrator.
    Admin,
}

impl Role {
    /// Map a free-form role string from a request onto a role.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Anything that is not recognisably `admin` - including a missing value
    /// or something like `"administrator"` - becomes [`Role::User`].
    ///
    /// ```
    /// use bookshop_core::Role;
    ///
    /// assert_eq!(Role::normalize(Some(" ADMIN ")), Role::Admin);
    /// assert_eq!(Role::normalize(Some("administrator")), Role::User);
    /// assert_eq!(Role::normalize(None), Role::User);
    /// ```
    #[must_use]
    pub fn normalize(requested: Option<&str>) -> Self {
        match requested.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Self::Admin,
            _ => Self::User,
        }
    }

    /// Whether this role bypasses ownership checks.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        match self {
            Self::Admin => true,
            Self::User => false,
        }
    }

    /// Claim/display form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(Role::normalize(Some("admin")), Role::Admin);
        assert_eq!(Role::normalize(Some("Admin")), Role::Admin);
        assert_eq!(Role::normalize(Some("user")), Role::User);
        assert_eq!(Role::normalize(Some("")), Role::User);
        assert_eq!(Role::normalize(Some("root")), Role::User);
    }

    #[test]
    fn test_display_uses_claim_form() {
        assert_eq!(Role::User.to_string(), "User");
        assert_eq!(Role::Admin.to_string(), "Admin");
    }

    #[test]
    fn test_serde_uses_claim_form() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
        let role: Role = serde_json::from_str("\"User\"").unwrap();
        assert_eq!(role, Role::User);
    }
}
