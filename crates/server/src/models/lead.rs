//! Sales leads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rich_habits_core::{ContactId, LeadId, LeadStage, OrganizationId, UserId};

use super::double_option;

/// A lead moving through the sales pipeline.
///
/// Stage changes are made by sales staff; any stage may follow any other.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub organization_id: Option<OrganizationId>,
    pub contact_id: Option<ContactId>,
    pub owner_user_id: Option<UserId>,
    pub stage: LeadStage,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a lead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadInput {
    pub organization_id: Option<OrganizationId>,
    pub contact_id: Option<ContactId>,
    /// Defaults to the creating user.
    pub owner_user_id: Option<UserId>,
    #[serde(default)]
    pub stage: LeadStage,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating a lead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadInput {
    pub stage: Option<LeadStage>,
    #[serde(default, deserialize_with = "double_option")]
    pub owner_user_id: Option<Option<UserId>>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Filter criteria for listing leads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub stage: Option<LeadStage>,
    /// Restrict to one owner; set by the server when the caller lacks view-all.
    #[serde(skip)]
    pub owner_user_id: Option<UserId>,
}
