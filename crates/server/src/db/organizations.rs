//! Organizations and contacts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rich_habits_core::{ContactId, OrganizationId};

use super::RepositoryError;
use crate::models::{
    Contact, CreateContactInput, CreateOrganizationInput, Organization, UpdateOrganizationInput,
};

const ORGANIZATION_COLUMNS: &str = "id, name, sport, city, state, phone, email, website, \
                                    logo_url, notes, created_at, updated_at";
const CONTACT_COLUMNS: &str =
    "id, organization_id, name, email, phone, title, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: OrganizationId,
    name: String,
    sport: Option<String>,
    city: Option<String>,
    state: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    logo_url: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            sport: row.sport,
            city: row.city,
            state: row.state,
            phone: row.phone,
            email: row.email,
            website: row.website,
            logo_url: row.logo_url,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: ContactId,
    organization_id: OrganizationId,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    title: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for organizations and their contacts.
pub struct OrganizationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrganizationRepository<'a> {
    /// Create a new organization repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List organizations by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Organization>, RepositoryError> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Organization::from).collect())
    }

    /// Get an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        let row: Option<OrganizationRow> = sqlx::query_as(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Organization::from))
    }

    /// Create an organization. `logo_url` must already be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        input: &CreateOrganizationInput,
    ) -> Result<Organization, RepositoryError> {
        let row: OrganizationRow = sqlx::query_as(&format!(
            "INSERT INTO organizations
                (name, sport, city, state, phone, email, website, logo_url, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ORGANIZATION_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.sport.as_deref())
        .bind(input.city.as_deref())
        .bind(input.state.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .bind(input.website.as_deref())
        .bind(input.logo_url.as_deref())
        .bind(input.notes.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "organization"))?;
        Ok(row.into())
    }

    /// Update an organization. An explicit `logoUrl: null` clears the logo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the organization does not exist.
    pub async fn update(
        &self,
        id: OrganizationId,
        input: &UpdateOrganizationInput,
    ) -> Result<Organization, RepositoryError> {
        let (logo_set, logo_value) = match &input.logo_url {
            None => (false, None),
            Some(value) => (true, value.as_deref()),
        };

        let row: Option<OrganizationRow> = sqlx::query_as(&format!(
            "UPDATE organizations SET
                name = COALESCE($2, name),
                sport = COALESCE($3, sport),
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                phone = COALESCE($6, phone),
                email = COALESCE($7, email),
                website = COALESCE($8, website),
                logo_url = CASE WHEN $9 THEN $10 ELSE logo_url END,
                notes = COALESCE($11, notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ORGANIZATION_COLUMNS}"
        ))
        .bind(id)
        .bind(input.name.as_deref())
        .bind(input.sport.as_deref())
        .bind(input.city.as_deref())
        .bind(input.state.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .bind(input.website.as_deref())
        .bind(logo_set)
        .bind(logo_value)
        .bind(input.notes.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "organization"))?;

        row.map(Organization::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete an organization and its contacts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the organization does not exist.
    pub async fn delete(&self, id: OrganizationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List contacts of an organization.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_contacts(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE organization_id = $1 ORDER BY name"
        ))
        .bind(organization_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    /// Add a contact to an organization.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the organization does not exist.
    pub async fn create_contact(
        &self,
        organization_id: OrganizationId,
        input: &CreateContactInput,
    ) -> Result<Contact, RepositoryError> {
        let row: ContactRow = sqlx::query_as(&format!(
            "INSERT INTO contacts (organization_id, name, email, phone, title)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(organization_id)
        .bind(&input.name)
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.title.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "contact"))?;
        Ok(row.into())
    }
}
