use std::str::FromStr;

use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::{ensure_staff, AuthUser},
    entities::order::OrderStatus,
    errors::{ApiError, ServiceError},
    services::checkout::PlaceOrderInput,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/mine", get(my_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_status))
}

/// Place an order from the caller's cart
async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = PlaceOrderInput {
        customer_name: payload.name,
        customer_surname: payload.surname,
        payment_method_id: payload.payment_method_id,
        delivery_zone_id: payload.delivery_zone_id,
        address: payload.address,
        card_id: payload.card_id,
    };

    let placed = state
        .services
        .checkout
        .place_order(user.id, input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(placed))
}

/// List all orders (staff only)
async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    ensure_staff(&user).map_err(map_service_error)?;

    let (orders, total) = state
        .services
        .fulfillment
        .list_orders(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// List the caller's own orders
async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .fulfillment
        .list_orders_for_user(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Get an order with its lines; owners and staff only
async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (order, lines) = state
        .services
        .fulfillment
        .get_order(order_id)
        .await
        .map_err(map_service_error)?;

    if order.user_id != user.id {
        ensure_staff(&user).map_err(map_service_error)?;
    }

    Ok(success_response(serde_json::json!({
        "order": order,
        "lines": lines,
    })))
}

/// Advance the fulfillment status of an order
async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let new_status = OrderStatus::from_str(&payload.status).map_err(|_| {
        map_service_error(ServiceError::InvalidStatus(format!(
            "Unknown order status '{}'",
            payload.status
        )))
    })?;

    let order = state
        .services
        .fulfillment
        .update_status(&user, order_id, new_status, payload.courier_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Surname is required"))]
    pub surname: String,
    pub payment_method_id: i32,
    pub delivery_zone_id: Option<i32>,
    pub address: Option<String>,
    pub card_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub courier_id: Option<Uuid>,
}
