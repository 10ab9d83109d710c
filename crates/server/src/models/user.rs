//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rich_habits_core::{Email, UserId, UserRole};

/// A staff user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    /// When the user accepted the software license, if ever.
    pub license_accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Plain-text password; hashed before it reaches the repository.
    pub password: Option<String>,
}

/// Input for updating a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}
