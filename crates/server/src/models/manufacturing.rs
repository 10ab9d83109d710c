//! Manufacturing records and their status history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rich_habits_core::{ManufacturingId, ManufacturingStatus, ManufacturingUpdateId, OrderId, UserId};

/// Production of one order by a manufacturer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturing {
    pub id: ManufacturingId,
    pub order_id: OrderId,
    pub manufacturer_id: Option<UserId>,
    pub status: ManufacturingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A status change recorded against a manufacturing record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturingUpdate {
    pub id: ManufacturingUpdateId,
    pub manufacturing_id: ManufacturingId,
    pub status: ManufacturingStatus,
    pub note: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a manufacturing record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManufacturingInput {
    pub order_id: OrderId,
    pub manufacturer_id: Option<UserId>,
    pub notes: Option<String>,
}

/// Input for updating a manufacturing record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManufacturingInput {
    pub manufacturer_id: Option<UserId>,
    pub notes: Option<String>,
}

/// Input for posting a status update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManufacturingUpdateInput {
    pub status: ManufacturingStatus,
    pub note: Option<String>,
}

/// Filter criteria for listing manufacturing records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturingFilter {
    pub status: Option<ManufacturingStatus>,
    #[serde(skip)]
    pub manufacturer_id: Option<UserId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_rejects_legacy_status() {
        let legacy: Result<CreateManufacturingUpdateInput, _> =
            serde_json::from_str(r#"{"status": "in_progress"}"#);
        assert!(legacy.is_err());

        let current: CreateManufacturingUpdateInput =
            serde_json::from_str(r#"{"status": "cutting_sewing", "note": "day 1"}"#).unwrap();
        assert_eq!(current.status, ManufacturingStatus::CuttingSewing);
    }
}
