use std::str::FromStr;

use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::{ensure_role, AuthUser},
    entities::{backorder_request::BackorderStatus, user::UserRole},
    errors::{ApiError, ServiceError},
    services::backorders::ShortageInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Creates the router for backorder endpoints
pub fn backorders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(report_shortages))
        .route("/grouped", get(list_grouped))
        .route("/order/:id", get(list_for_order))
        .route("/status", patch(advance_status))
}

/// Report shortages for an order (warehouse)
async fn report_shortages(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ReportShortagesRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    ensure_role(&user, UserRole::Warehouse).map_err(map_service_error)?;
    validate_input(&payload)?;

    let entries = payload
        .items
        .into_iter()
        .map(|item| ShortageInput {
            variant_id: item.variant_id,
            quantity: item.quantity,
        })
        .collect();

    let created = state
        .services
        .backorders
        .report_shortages(payload.order_id, entries)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// Aggregated shortage overview (logistics)
async fn list_grouped(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    ensure_role(&user, UserRole::Logistics).map_err(map_service_error)?;

    let grouped = state
        .services
        .backorders
        .list_grouped()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(grouped))
}

/// Per-line availability of one order (warehouse and logistics)
async fn list_for_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if ensure_role(&user, UserRole::Warehouse).is_err() {
        ensure_role(&user, UserRole::Logistics).map_err(map_service_error)?;
    }

    let lines = state
        .services
        .backorders
        .list_for_order(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(lines))
}

/// Bulk-advance backorder requests (logistics)
async fn advance_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AdvanceStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    ensure_role(&user, UserRole::Logistics).map_err(map_service_error)?;

    let new_status = BackorderStatus::from_str(&payload.status).map_err(|_| {
        map_service_error(ServiceError::InvalidStatus(format!(
            "Unknown backorder status '{}'",
            payload.status
        )))
    })?;

    let updated = state
        .services
        .backorders
        .advance_status(payload.ids, new_status, payload.received_at)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct ReportShortagesRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "At least one shortage line is required"))]
    pub items: Vec<ShortageItemRequest>,
}

// Per-line quantities are validated by the service, which rejects the
// whole batch on the first bad entry.
#[derive(Debug, Deserialize, Serialize)]
pub struct ShortageItemRequest {
    pub variant_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub ids: Vec<Uuid>,
    pub status: String,
    pub received_at: Option<DateTime<Utc>>,
}
