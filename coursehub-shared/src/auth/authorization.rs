/// Caller identity and capabilities
///
/// Operations take their authority as explicit values instead of consulting
/// ambient state:
///
/// 1. **[`CurrentUser`]**: an authenticated learner or administrator
/// 2. **[`AdminCapability`]**: proof that the caller is an administrator.
///    It can only be obtained through [`CurrentUser::admin`], so holding one
///    means the role check already happened.
///
/// # Example
///
/// ```
/// use coursehub_shared::auth::{CurrentUser, Role};
/// use uuid::Uuid;
///
/// let admin = CurrentUser::new(Uuid::new_v4(), "ops@example.com", Role::Admin);
/// let capability = admin.admin().expect("admin role");
/// assert_eq!(capability.admin_id(), admin.id);
///
/// let learner = CurrentUser::new(Uuid::new_v4(), "l@example.com", Role::Learner);
/// assert!(learner.admin().is_err());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No authenticated user
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated user lacks the required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },
}

/// User role carried in the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Learner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(id: Uuid, email: impl Into<String>, role: Role) -> Self {
        CurrentUser {
            id,
            email: email.into(),
            role,
        }
    }

    /// Upgrades the caller to an admin capability
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::InsufficientRole` for non-admin users.
    pub fn admin(&self) -> Result<AdminCapability, AuthzError> {
        match self.role {
            Role::Admin => Ok(AdminCapability { admin_id: self.id }),
            actual => Err(AuthzError::InsufficientRole {
                required: Role::Admin,
                actual,
            }),
        }
    }
}

/// Requires an authenticated caller
pub fn require_user(user: Option<&CurrentUser>) -> Result<&CurrentUser, AuthzError> {
    user.ok_or(AuthzError::Unauthenticated)
}

/// Proof of administrator authority
///
/// Has no public constructor; see [`CurrentUser::admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCapability {
    admin_id: Uuid,
}

impl AdminCapability {
    /// ID of the administrator holding the capability
    pub fn admin_id(&self) -> Uuid {
        self.admin_id
    }
}
