//! Staff user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin with a password
//! rh-cli user create -e admin@example.com -n "Admin Name" -r admin -p 'long-password'
//!
//! # Create a designer without a password (cannot log in until one is set)
//! rh-cli user create -e designer@example.com -n "Designer" -r designer
//! ```

use rich_habits_core::{UnknownVariant, UserRole};
use rich_habits_server::services::{AuthError, AuthService};
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: {valid}", valid = valid_roles())]
    InvalidRole(String),

    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),
}

fn valid_roles() -> String {
    UserRole::ALL
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a role name given on the command line.
///
/// # Errors
///
/// Returns `UserError::InvalidRole` for anything outside [`UserRole::ALL`].
pub fn parse_role(role: &str) -> Result<UserRole, UserError> {
    role.parse()
        .map_err(|e: UnknownVariant| UserError::InvalidRole(e.value))
}

/// Create a staff user.
///
/// # Errors
///
/// Returns an error if the role is unknown, the email is invalid, the
/// password is too short, or the email is already taken.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: Option<&str>,
) -> Result<(), UserError> {
    let role = parse_role(role)?;
    let pool = super::connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = AuthService::new(&pool)
        .create_user(email, name, role, password)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    if password.is_none() {
        tracing::warn!("Note: User has no password and cannot log in until one is set.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_accepts_every_role() {
        for role in UserRole::ALL {
            assert!(matches!(parse_role(role.as_str()), Ok(parsed) if parsed == *role));
        }
    }

    #[test]
    fn test_parse_role_rejects_unknown() {
        match parse_role("super_admin") {
            Err(UserError::InvalidRole(value)) => assert_eq!(value, "super_admin"),
            other => panic!("expected InvalidRole, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_role_message_lists_roles() {
        let message = UserError::InvalidRole("x".to_owned()).to_string();
        assert!(message.contains("admin"));
        assert!(message.contains("designer"));
    }
}
