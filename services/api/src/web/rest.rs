//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use hearth_core::{houses_from_payload, Action};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_state_handler,
        dispatch_handler,
        sync_handler,
    ),
    tags(
        (name = "Household Store API", description = "Read and drive the shared household store.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Return the current store.
#[utoipa::path(
    get,
    path = "/state",
    responses(
        (status = 200, description = "The full store as JSON")
    )
)]
pub async fn get_state_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.current().await)
}

/// Apply one action and return the resulting store.
///
/// Rejected actions still answer 200: the store comes back unchanged with a
/// `toast` describing why.
#[utoipa::path(
    post,
    path = "/dispatch",
    request_body(content_type = "application/json", description = "A tagged action, e.g. {\"type\":\"LOGOUT\"}."),
    responses(
        (status = 200, description = "The store after the action"),
        (status = 422, description = "The body is not a known action")
    )
)]
pub async fn dispatch_handler(
    State(app_state): State<Arc<AppState>>,
    Json(action): Json<Action>,
) -> impl IntoResponse {
    Json(app_state.dispatch(action).await)
}

/// Fold a remote household payload into the store.
///
/// Accepts a bare array of houses, `{ "houses": [...] }`, `{ "data": [...] }`
/// or a single house object.
#[utoipa::path(
    post,
    path = "/sync",
    request_body(content_type = "application/json", description = "Remote houses payload."),
    responses(
        (status = 200, description = "The store after reconciliation"),
        (status = 400, description = "The payload holds no houses")
    )
)]
pub async fn sync_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !(payload.is_array() || payload.is_object()) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Expected a house, a list of houses, or an object wrapping them".to_string(),
        ));
    }
    let houses = houses_from_payload(payload);
    info!("Received {} house(s) to sync.", houses.len());
    let store = app_state.dispatch(Action::SyncRemoteHouses { houses }).await;
    Ok(Json(store))
}
