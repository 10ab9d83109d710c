//! Persisted runtime settings.
//!
//! One JSONB value per key in the `settings` table.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Get a setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, SettingsError> {
    let value = sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Set a setting value, replacing any previous one.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(pool: &PgPool, key: &str, value: &JsonValue) -> Result<(), SettingsError> {
    sqlx::query(
        "INSERT INTO settings (key, value)
         VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a setting and deserialize it, treating a missing key as `None`.
///
/// # Errors
///
/// Returns an error if the query fails or the stored value has the wrong shape.
pub async fn get_typed<T: serde::de::DeserializeOwned>(
    pool: &PgPool,
    key: &str,
) -> Result<Option<T>, SettingsError> {
    get_setting(pool, key)
        .await?
        .map(serde_json::from_value)
        .transpose()
        .map_err(SettingsError::from)
}

/// Serialize and store a setting.
///
/// # Errors
///
/// Returns an error if serialization or the database write fails.
pub async fn set_typed<T: serde::Serialize>(
    pool: &PgPool,
    key: &str,
    value: &T,
) -> Result<(), SettingsError> {
    let value = serde_json::to_value(value)?;
    set_setting(pool, key, &value).await
}
