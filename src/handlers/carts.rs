use crate::handlers::common::{
    map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::cart::{AddItemInput, LocalCartItem},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, patch, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_item).delete(clear_cart))
        .route("/merge", post(merge_cart))
        .route("/:id", put(update_quantity).delete(remove_item))
        .route("/:id/promotion", patch(apply_promotion))
}

/// Get the caller's cart with priced items and summary
async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Add an item to the caller's cart
async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = AddItemInput {
        product_id: payload.product_id,
        variant_id: payload.variant_id,
        quantity: payload.quantity,
        promotion_id: payload.promotion_id,
    };

    let cart = state
        .services
        .cart
        .add_item(user.id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Set the quantity of a cart item
async fn update_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .set_quantity(user.id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Remove an item from the caller's cart
async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_item(user.id, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Clear the caller's cart
async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Apply or clear the promotion of a cart item
async fn apply_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<ApplyPromotionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .apply_promotion(user.id, item_id, payload.promotion_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Merge an anonymous local cart into the caller's account cart
async fn merge_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MergeCartRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let items = payload
        .items
        .into_iter()
        .map(|item| LocalCartItem {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            promotion_id: item.promotion_id,
        })
        .collect();

    let cart = state
        .services
        .cart
        .merge_local_cart(user.id, items)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

// Request DTOs

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: i32,
    pub variant_id: i32,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub promotion_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyPromotionRequest {
    pub promotion_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MergeCartRequest {
    pub items: Vec<LocalItemRequest>,
}

// Per-item quantities are validated by the merge itself, which rolls the
// whole batch back on the first bad entry.
#[derive(Debug, Deserialize)]
pub struct LocalItemRequest {
    pub product_id: i32,
    pub variant_id: i32,
    pub quantity: i32,
    pub promotion_id: Option<i32>,
}
