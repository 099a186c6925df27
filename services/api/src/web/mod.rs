pub mod protocol;
pub mod rest;
pub mod state;
pub mod tasks;
pub mod ws_handler;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{dispatch_handler, get_state_handler, sync_handler};
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Routes for the store API, without CORS or the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(get_state_handler))
        .route("/dispatch", post(dispatch_handler))
        .route("/sync", post(sync_handler))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
