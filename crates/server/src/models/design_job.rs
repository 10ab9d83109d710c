//! Design jobs and designer availability.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rich_habits_core::{DesignJobId, DesignJobStatus, OrderId, OrganizationId, UserId};

use super::{User, double_option};

/// A unit of design work, optionally assigned to a designer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignJob {
    pub id: DesignJobId,
    pub order_id: Option<OrderId>,
    pub organization_id: Option<OrganizationId>,
    pub assigned_designer_id: Option<UserId>,
    pub status: DesignJobStatus,
    pub brief: String,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a design job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDesignJobInput {
    pub order_id: Option<OrderId>,
    pub organization_id: Option<OrganizationId>,
    pub assigned_designer_id: Option<UserId>,
    #[serde(default)]
    pub brief: String,
    pub due_at: Option<DateTime<Utc>>,
}

/// Input for updating a design job.
///
/// `assignedDesignerId: null` unassigns the job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDesignJobInput {
    pub status: Option<DesignJobStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_designer_id: Option<Option<UserId>>,
    pub brief: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,
}

/// Filter criteria for listing design jobs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignJobFilter {
    pub status: Option<DesignJobStatus>,
    #[serde(skip)]
    pub assigned_designer_id: Option<UserId>,
}

/// Designers split by whether they currently hold active work.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DesignerAvailability {
    pub busy: Vec<User>,
    pub available: Vec<User>,
}

/// Partition designers into busy and available.
///
/// A designer is busy when any job assigned to them is in active work
/// (`assigned` or `in_progress`). Input order is preserved in both halves.
#[must_use]
pub fn partition_designers(designers: Vec<User>, jobs: &[DesignJob]) -> DesignerAvailability {
    let busy_ids: HashSet<UserId> = jobs
        .iter()
        .filter(|job| job.status.is_active_work())
        .filter_map(|job| job.assigned_designer_id)
        .collect();

    let (busy, available) = designers
        .into_iter()
        .partition(|designer| busy_ids.contains(&designer.id));

    DesignerAvailability { busy, available }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rich_habits_core::{Email, UserRole};

    fn designer(id: i32) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("designer{id}@richhabits.com")).unwrap(),
            name: format!("Designer {id}"),
            role: UserRole::Designer,
            is_active: true,
            license_accepted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn job(id: i32, designer: Option<i32>, status: DesignJobStatus) -> DesignJob {
        DesignJob {
            id: DesignJobId::new(id),
            order_id: None,
            organization_id: None,
            assigned_designer_id: designer.map(UserId::new),
            status,
            brief: String::new(),
            due_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_partition_designers() {
        let designers = vec![designer(1), designer(2), designer(3)];
        let jobs = vec![
            job(10, Some(1), DesignJobStatus::InProgress),
            job(11, Some(2), DesignJobStatus::Completed),
            job(12, None, DesignJobStatus::Assigned),
        ];

        let availability = partition_designers(designers, &jobs);
        let busy: Vec<i32> = availability.busy.iter().map(|u| u.id.as_i32()).collect();
        let available: Vec<i32> = availability.available.iter().map(|u| u.id.as_i32()).collect();

        assert_eq!(busy, vec![1]);
        assert_eq!(available, vec![2, 3]);
    }

    #[test]
    fn test_review_is_not_busy() {
        let availability =
            partition_designers(vec![designer(1)], &[job(1, Some(1), DesignJobStatus::Review)]);
        assert!(availability.busy.is_empty());
        assert_eq!(availability.available.len(), 1);
    }

    #[test]
    fn test_unassign_deserializes_as_explicit_null() {
        let input: UpdateDesignJobInput =
            serde_json::from_str(r#"{"assignedDesignerId": null}"#).unwrap();
        assert_eq!(input.assigned_designer_id, Some(None));

        let input: UpdateDesignJobInput = serde_json::from_str(r#"{"brief": "x"}"#).unwrap();
        assert_eq!(input.assigned_designer_id, None);
    }
}
