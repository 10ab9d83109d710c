//! Orders and line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use rich_habits_core::{
    LeadId, OrderId, OrderLineItemId, OrderStatus, OrganizationId, UserId, VariantId,
};

use super::{RepositoryError, count_by, parse_column};
use crate::models::{
    CreateLineItemInput, CreateOrderInput, Order, OrderFilter, OrderLineItem, OrderWithItems,
    UpdateOrderInput,
};

const ORDER_COLUMNS: &str = "id, order_code, organization_id, lead_id, salesperson_id, status, \
                             due_at, notes, created_at, updated_at";
const LINE_ITEM_COLUMNS: &str =
    "id, order_id, variant_id, description, quantity, unit_price, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_code: String,
    organization_id: Option<OrganizationId>,
    lead_id: Option<LeadId>,
    salesperson_id: Option<UserId>,
    status: String,
    due_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_code: row.order_code,
            organization_id: row.organization_id,
            lead_id: row.lead_id,
            salesperson_id: row.salesperson_id,
            status: parse_column(&row.status)?,
            due_at: row.due_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: OrderLineItemId,
    order_id: OrderId,
    variant_id: Option<VariantId>,
    description: String,
    quantity: i32,
    unit_price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<LineItemRow> for OrderLineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            variant_id: row.variant_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            created_at: row.created_at,
        }
    }
}

/// Repository for orders and their line items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::INTEGER IS NULL OR organization_id = $2)
               AND ($3::INTEGER IS NULL OR salesperson_id = $3)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.status.map(OrderStatus::as_str))
        .bind(filter.organization_id)
        .bind(filter.salesperson_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored status is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(Order::try_from).transpose()
    }

    /// Get an order with its line items and total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_items(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.list_line_items(id).await?;
        Ok(Some(OrderWithItems::new(order, items)))
    }

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order code is taken.
    pub async fn create(
        &self,
        input: &CreateOrderInput,
        salesperson: UserId,
    ) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders
                (order_code, organization_id, lead_id, salesperson_id, status, due_at, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&input.order_code)
        .bind(input.organization_id)
        .bind(input.lead_id)
        .bind(input.salesperson_id.unwrap_or(salesperson))
        .bind(input.status.as_str())
        .bind(input.due_at)
        .bind(input.notes.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order"))?;

        Order::try_from(row)
    }

    /// Update an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update(&self, id: OrderId, input: &UpdateOrderInput) -> Result<Order, RepositoryError> {
        let (salesperson_set, salesperson) = input
            .salesperson_id
            .map_or((false, None), |value| (true, value));
        let (due_set, due_at) = input.due_at.map_or((false, None), |value| (true, value));

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET
                status = COALESCE($2, status),
                salesperson_id = CASE WHEN $3 THEN $4 ELSE salesperson_id END,
                due_at = CASE WHEN $5 THEN $6 ELSE due_at END,
                notes = COALESCE($7, notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(input.status.map(OrderStatus::as_str))
        .bind(salesperson_set)
        .bind(salesperson)
        .bind(due_set)
        .bind(due_at)
        .bind(input.notes.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order"))?;

        row.ok_or(RepositoryError::NotFound).and_then(Order::try_from)
    }

    /// Delete an order and its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "order"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Line items of an order, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>, RepositoryError> {
        let rows: Vec<LineItemRow> = sqlx::query_as(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_line_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderLineItem::from).collect())
    }

    /// Add a line item to an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is missing or the quantity is not positive.
    pub async fn add_line_item(
        &self,
        order_id: OrderId,
        input: &CreateLineItemInput,
    ) -> Result<OrderLineItem, RepositoryError> {
        let row: LineItemRow = sqlx::query_as(&format!(
            "INSERT INTO order_line_items (order_id, variant_id, description, quantity, unit_price)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {LINE_ITEM_COLUMNS}"
        ))
        .bind(order_id)
        .bind(input.variant_id)
        .bind(&input.description)
        .bind(input.quantity)
        .bind(input.unit_price)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "line item"))?;
        Ok(row.into())
    }

    /// Remove a line item from an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such item belongs to the order.
    pub async fn delete_line_item(
        &self,
        order_id: OrderId,
        item_id: OrderLineItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM order_line_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Order counts grouped by status, limited to `owner`'s orders when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<(String, i64)>, RepositoryError> {
        count_by(self.pool, "orders", "status", "salesperson_id", owner).await
    }
}
