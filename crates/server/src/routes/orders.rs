//! Orders and their line items.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use rust_decimal::Decimal;
use tracing::instrument;

use rich_habits_core::{OrderId, OrderLineItemId, PermissionKind, UserId};

use crate::{
    db::OrderRepository,
    error::AppError,
    middleware::{RequireAuth, record_scope, require_permission},
    models::{
        CreateLineItemInput, CreateOrderInput, Order, OrderFilter, OrderLineItem, OrderWithItems,
        UpdateOrderInput,
    },
    state::AppState,
};

use super::{ensure_in_scope, found};

const RESOURCE: &str = "orders";

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/{id}", get(show).patch(update).delete(destroy))
        .route("/api/orders/{id}/line-items", post(add_line_item))
        .route(
            "/api/orders/{id}/line-items/{item_id}",
            delete(delete_line_item),
        )
}

fn validate_line_item(input: &CreateLineItemInput) -> Result<(), AppError> {
    if input.description.trim().is_empty() {
        return Err(AppError::BadRequest("Description is required".to_string()));
    }
    if input.quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    if input.unit_price < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Unit price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Load an order the caller can see.
async fn visible_order(
    repo: &OrderRepository<'_>,
    scope: Option<UserId>,
    id: OrderId,
) -> Result<Order, AppError> {
    let order = found(repo.get(id).await?, "Order")?;
    ensure_in_scope(scope, order.salesperson_id, "Order")?;
    Ok(order)
}

/// List orders by `?status=` / `?organizationId=`. Without view-all, only the caller's own.
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(mut filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    filter.salesperson_id = record_scope(&state, &user, RESOURCE).await;

    let orders = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(orders))
}

/// Order detail with line items and total.
#[instrument(skip_all)]
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;

    let order = found(
        OrderRepository::new(state.pool()).get_with_items(id).await?,
        "Order",
    )?;
    ensure_in_scope(
        record_scope(&state, &user, RESOURCE).await,
        order.order.salesperson_id,
        "Order",
    )?;
    Ok(Json(order))
}

#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut input): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    if input.order_code.trim().is_empty() {
        return Err(AppError::BadRequest("Order code is required".to_string()));
    }
    if record_scope(&state, &user, RESOURCE).await.is_some() {
        input.salesperson_id = None;
    }

    let order = OrderRepository::new(state.pool()).create(&input, user.id).await?;
    tracing::info!(order_id = %order.id, order_code = %order.order_code, "Order created");
    Ok((StatusCode::CREATED, Json(order)))
}

#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(mut input): Json<UpdateOrderInput>,
) -> Result<Json<Order>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    let repo = OrderRepository::new(state.pool());
    let scope = record_scope(&state, &user, RESOURCE).await;
    visible_order(&repo, scope, id).await?;
    if scope.is_some() {
        input.salesperson_id = None;
    }

    let order = repo.update(id, &input).await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order updated");
    Ok(Json(order))
}

#[instrument(skip_all)]
async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Delete).await?;

    let repo = OrderRepository::new(state.pool());
    let scope = record_scope(&state, &user, RESOURCE).await;
    visible_order(&repo, scope, id).await?;

    repo.delete(id).await?;
    tracing::info!(order_id = %id, user_id = %user.id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
async fn add_line_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(input): Json<CreateLineItemInput>,
) -> Result<(StatusCode, Json<OrderLineItem>), AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;
    validate_line_item(&input)?;

    let repo = OrderRepository::new(state.pool());
    let scope = record_scope(&state, &user, RESOURCE).await;
    visible_order(&repo, scope, id).await?;

    let item = repo.add_line_item(id, &input).await?;
    tracing::info!(order_id = %id, line_item_id = %item.id, "Line item added");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip_all)]
async fn delete_line_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((id, item_id)): Path<(OrderId, OrderLineItemId)>,
) -> Result<StatusCode, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    let repo = OrderRepository::new(state.pool());
    let scope = record_scope(&state, &user, RESOURCE).await;
    visible_order(&repo, scope, id).await?;

    repo.delete_line_item(id, item_id).await?;
    tracing::info!(order_id = %id, line_item_id = %item_id, "Line item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(description: &str, quantity: i32, unit_price: &str) -> CreateLineItemInput {
        CreateLineItemInput {
            variant_id: None,
            description: description.to_string(),
            quantity,
            unit_price: Decimal::from_str(unit_price).unwrap_or_default(),
        }
    }

    #[test]
    fn test_validate_line_item() {
        assert!(validate_line_item(&item("Singlet", 12, "45.00")).is_ok());
        assert!(validate_line_item(&item("Free sample", 1, "0")).is_ok());
        assert!(validate_line_item(&item("", 1, "10")).is_err());
        assert!(validate_line_item(&item("Singlet", 0, "10")).is_err());
        assert!(validate_line_item(&item("Singlet", 1, "-1")).is_err());
    }
}
