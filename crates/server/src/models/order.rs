//! Orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rich_habits_core::{
    LeadId, OrderId, OrderLineItemId, OrderStatus, OrganizationId, UserId, VariantId,
};

use super::double_option;

/// A customer order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_code: String,
    pub organization_id: Option<OrganizationId>,
    pub lead_id: Option<LeadId>,
    pub salesperson_id: Option<UserId>,
    pub status: OrderStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub id: OrderLineItemId,
    pub order_id: OrderId,
    pub variant_id: Option<VariantId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderLineItem {
    /// `quantity * unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// An order with its line items loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub line_items: Vec<OrderLineItem>,
    pub total: Decimal,
}

impl OrderWithItems {
    /// Combine an order with its items and compute the total.
    #[must_use]
    pub fn new(order: Order, line_items: Vec<OrderLineItem>) -> Self {
        let total = line_items.iter().map(OrderLineItem::line_total).sum();
        Self {
            order,
            line_items,
            total,
        }
    }
}

/// Input for creating an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub order_code: String,
    pub organization_id: Option<OrganizationId>,
    pub lead_id: Option<LeadId>,
    /// Defaults to the creating user.
    pub salesperson_id: Option<UserId>,
    #[serde(default)]
    pub status: OrderStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Input for updating an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderInput {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub salesperson_id: Option<Option<UserId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub notes: Option<String>,
}

/// Input for adding a line item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLineItemInput {
    pub variant_id: Option<VariantId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Filter criteria for listing orders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub organization_id: Option<OrganizationId>,
    #[serde(skip)]
    pub salesperson_id: Option<UserId>,
}
