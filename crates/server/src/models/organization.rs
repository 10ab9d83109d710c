//! Organizations (schools, clubs, teams) and their contacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rich_habits_core::{ContactId, OrganizationId};

use super::double_option;

/// A customer organization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub sport: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    /// Always a `/public-objects/<uploadId>` path, never a signed URL.
    pub logo_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an organization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationInput {
    pub name: String,
    pub sport: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating an organization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationInput {
    pub name: Option<String>,
    pub sport: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    /// `null` clears the logo.
    #[serde(default, deserialize_with = "double_option")]
    pub logo_url: Option<Option<String>>,
    pub notes: Option<String>,
}

/// A person at an organization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a contact to an organization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let absent: UpdateOrganizationInput = serde_json::from_str(r#"{"name":"Eagles"}"#).unwrap();
        assert_eq!(absent.logo_url, None);

        let cleared: UpdateOrganizationInput = serde_json::from_str(r#"{"logoUrl":null}"#).unwrap();
        assert_eq!(cleared.logo_url, Some(None));

        let set: UpdateOrganizationInput =
            serde_json::from_str(r#"{"logoUrl":"/public-objects/abc"}"#).unwrap();
        assert_eq!(set.logo_url, Some(Some("/public-objects/abc".to_string())));
    }
}
