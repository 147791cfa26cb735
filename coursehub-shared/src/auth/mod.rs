/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: HS256 bearer token claims, creation and validation
/// - [`authorization`]: caller identity, roles and the admin capability
///
/// # Example
///
/// ```
/// use coursehub_shared::auth::jwt::{create_token, validate_token, Claims};
/// use coursehub_shared::auth::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "your-secret-key-at-least-32-bytes";
/// let token = create_token(&Claims::new(Uuid::new_v4(), "ops@example.com", Role::Admin), secret)?;
///
/// let user = validate_token(&token, secret)?.current_user();
/// let capability = user.admin()?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;

pub use authorization::{require_user, AdminCapability, AuthzError, CurrentUser, Role};
