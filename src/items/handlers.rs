use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, jwt::JwtKeys, middleware::require_token},
    error::AppError,
    state::AppState,
};

use super::dto::{ItemListResponse, ItemMessageResponse, ItemRequest, ItemResponse, Pagination};

/// Every item route sits behind the auth gate.
pub fn item_routes(keys: JwtKeys) -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item).get(list_items))
        .route("/items/:id", get(get_item).put(update_item))
        .route_layer(middleware::from_fn_with_state(keys, require_token))
}

// An id that does not parse cannot name a stored item.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Item not found"))
}

#[instrument(skip(state, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemMessageResponse>), AppError> {
    let Json(payload) = payload?;
    let fields = payload.validate()?;
    let item = state
        .items
        .create(&fields)
        .await
        .map_err(|e| AppError::internal("Failed to create item", e))?;
    info!(%user_id, item_id = %item.id, "item created");
    Ok((
        StatusCode::CREATED,
        Json(ItemMessageResponse {
            message: "Item created successfully!",
            item,
        }),
    ))
}

#[instrument(skip(state, query))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<ItemListResponse>, AppError> {
    let Query(p) = query?;
    p.validate()?;
    let items = state
        .items
        .list(p.limit, p.offset)
        .await
        .map_err(|e| AppError::internal("Failed to fetch items", e))?;
    Ok(Json(ItemListResponse { items }))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    let id = parse_id(&id)?;
    let item = state
        .items
        .find(id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch item", e))?
        .ok_or(AppError::NotFound("Item not found"))?;
    Ok(Json(ItemResponse { item }))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<Json<ItemMessageResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let fields = payload.validate()?;
    let item = state
        .items
        .update(id, &fields)
        .await
        .map_err(|e| AppError::internal("Failed to update item", e))?
        .ok_or(AppError::NotFound("Item not found"))?;
    info!(%user_id, item_id = %item.id, "item updated");
    Ok(Json(ItemMessageResponse {
        message: "Item updated successfully",
        item,
    }))
}
