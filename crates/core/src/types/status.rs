//! Workflow status enumerations.
//!
//! All of these are stored as `TEXT`. Lead, order and design-job statuses
//! carry no enforced transition rules; the manufacturing workflow is the
//! only one with an ordering that the server checks.

define_text_enum! {
    /// Sales pipeline stage of a lead, in pipeline order.
    LeadStage("lead stage") {
        FutureLead => "future_lead",
        Lead => "lead",
        HotLead => "hot_lead",
        MockUp => "mock_up",
        MockUpSent => "mock_up_sent",
        TeamStoreOrDirectOrder => "team_store_or_direct_order",
        CurrentClients => "current_clients",
        /// Terminal: the lead never answered and is queued for deletion.
        NoAnswerDelete => "no_answer_delete",
    }
}

impl Default for LeadStage {
    fn default() -> Self {
        Self::FutureLead
    }
}

impl LeadStage {
    /// Whether the lead has left the pipeline for good.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NoAnswerDelete)
    }
}

define_text_enum! {
    /// Status of a customer order.
    OrderStatus("order status") {
        New => "new",
        Claimed => "claimed",
        Qualified => "qualified",
        Won => "won",
        Lost => "lost",
        InProduction => "in_production",
        Shipped => "shipped",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::New
    }
}

impl OrderStatus {
    /// Whether the order is closed (no further work expected).
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Lost | Self::Completed | Self::Cancelled)
    }
}

define_text_enum! {
    /// Status of a design job.
    DesignJobStatus("design job status") {
        Pending => "pending",
        Assigned => "assigned",
        InProgress => "in_progress",
        Review => "review",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
    }
}

impl Default for DesignJobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl DesignJobStatus {
    /// Whether a job in this status keeps its designer busy.
    #[must_use]
    pub const fn is_active_work(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }
}

define_text_enum! {
    /// Manufacturing workflow stage, in production order.
    ManufacturingStatus("manufacturing status") {
        AwaitingAdminConfirmation => "awaiting_admin_confirmation",
        Confirmed => "confirmed",
        CuttingSewing => "cutting_sewing",
        Printing => "printing",
        Packaging => "packaging",
        Shipping => "shipping",
        Complete => "complete",
    }
}

impl Default for ManufacturingStatus {
    fn default() -> Self {
        Self::AwaitingAdminConfirmation
    }
}

impl ManufacturingStatus {
    /// The following stage, or `None` once complete.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        let index = Self::ALL.iter().position(|s| s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// Whether moving from `self` to `target` goes backwards in the workflow.
    #[must_use]
    pub fn is_regression_to(&self, target: Self) -> bool {
        target < *self
    }
}

define_text_enum! {
    /// Category of an in-app notification.
    NotificationType("notification type") {
        Order => "order",
        Design => "design",
        Manufacturing => "manufacturing",
        Lead => "lead",
        System => "system",
    }
}

define_text_enum! {
    /// Lifecycle of a direct-to-storage upload ticket.
    UploadStatus("upload status") {
        Pending => "pending",
        Completed => "completed",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_maps_optional_filters() {
        let stage = Some(LeadStage::HotLead);
        let status: Option<ManufacturingStatus> = None;

        assert_eq!(stage.map(LeadStage::as_str), Some("hot_lead"));
        assert_eq!(status.map(ManufacturingStatus::as_str), None);
        assert_eq!(
            Some(OrderStatus::InProduction).map(OrderStatus::as_str),
            Some("in_production")
        );
    }

    #[test]
    fn test_lead_stage_order_and_terminal() {
        assert!(LeadStage::FutureLead < LeadStage::CurrentClients);
        assert!(LeadStage::NoAnswerDelete.is_terminal());
        assert!(!LeadStage::HotLead.is_terminal());
        assert_eq!(LeadStage::default(), LeadStage::FutureLead);
    }

    #[test]
    fn test_lead_stage_parse() {
        let stage: LeadStage = "team_store_or_direct_order".parse().unwrap();
        assert_eq!(stage, LeadStage::TeamStoreOrDirectOrder);
        assert!("mockup".parse::<LeadStage>().is_err());
    }

    #[test]
    fn test_manufacturing_workflow_has_seven_stages() {
        assert_eq!(ManufacturingStatus::ALL.len(), 7);
        assert_eq!(
            ManufacturingStatus::ALL.first(),
            Some(&ManufacturingStatus::AwaitingAdminConfirmation)
        );
        assert_eq!(
            ManufacturingStatus::ALL.last(),
            Some(&ManufacturingStatus::Complete)
        );
    }

    #[test]
    fn test_manufacturing_next() {
        assert_eq!(
            ManufacturingStatus::Confirmed.next(),
            Some(ManufacturingStatus::CuttingSewing)
        );
        assert_eq!(ManufacturingStatus::Complete.next(), None);
    }

    #[test]
    fn test_manufacturing_regression() {
        assert!(ManufacturingStatus::Printing.is_regression_to(ManufacturingStatus::Confirmed));
        assert!(!ManufacturingStatus::Printing.is_regression_to(ManufacturingStatus::Printing));
        assert!(!ManufacturingStatus::Printing.is_regression_to(ManufacturingStatus::Shipping));
    }

    #[test]
    fn test_manufacturing_rejects_legacy_values() {
        assert!("pending".parse::<ManufacturingStatus>().is_err());
        assert!("in_progress".parse::<ManufacturingStatus>().is_err());
        assert!("complete".parse::<ManufacturingStatus>().is_ok());
    }

    #[test]
    fn test_design_job_active_work() {
        assert!(DesignJobStatus::Assigned.is_active_work());
        assert!(DesignJobStatus::InProgress.is_active_work());
        assert!(!DesignJobStatus::Review.is_active_work());
        assert!(!DesignJobStatus::Pending.is_active_work());
    }

    #[test]
    fn test_order_status_closed() {
        assert!(OrderStatus::Cancelled.is_closed());
        assert!(!OrderStatus::InProduction.is_closed());
    }

    #[test]
    fn test_notification_type_serde() {
        let json = serde_json::to_string(&NotificationType::Manufacturing).unwrap();
        assert_eq!(json, "\"manufacturing\"");
    }
}
