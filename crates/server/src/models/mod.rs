//! Domain models for the Rich Habits API.
//!
//! API-facing types serialize in camelCase, which is what the single-page
//! app consumes.

pub mod design_job;
pub mod lead;
pub mod manufacturing;
pub mod notification;
pub mod order;
pub mod organization;
pub mod session;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use design_job::{
    CreateDesignJobInput, DesignJob, DesignJobFilter, DesignerAvailability, UpdateDesignJobInput,
    partition_designers,
};
pub use lead::{CreateLeadInput, Lead, LeadFilter, UpdateLeadInput};
pub use manufacturing::{
    CreateManufacturingInput, CreateManufacturingUpdateInput, Manufacturing, ManufacturingFilter,
    ManufacturingUpdate, UpdateManufacturingInput,
};
pub use notification::{CreateNotification, Notification};
pub use order::{
    CreateLineItemInput, CreateOrderInput, Order, OrderFilter, OrderLineItem, OrderWithItems,
    UpdateOrderInput,
};
pub use organization::{
    Contact, CreateContactInput, CreateOrganizationInput, Organization, UpdateOrganizationInput,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{CreateUserInput, UpdateUserInput, User};

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
