//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileSnapshotStore, HttpRemoteHouses},
    config::Config,
    error::ApiError,
    web::{router, rest::ApiDoc, state::AppState, tasks},
};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use chrono::Utc;
use hearth_core::{
    normalize_snapshot,
    ports::{RemoteHouseSource, SnapshotStore},
    seed, Env, Store,
};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Restore the Store ---
    let snapshots = Arc::new(FileSnapshotStore::new(config.snapshot_path.clone()));
    let mut rng = StdRng::from_entropy();
    let store = {
        let mut env = Env::new(Utc::now(), &mut rng);
        match snapshots.load().await? {
            Some(raw) => {
                info!("Restoring snapshot from {}", snapshots.path().display());
                normalize_snapshot(raw, &mut env)
            }
            None if config.seed_demo => {
                info!("No snapshot found; starting from the demo household.");
                seed::demo_store(&mut env)
            }
            None => {
                info!("No snapshot found; starting empty.");
                Store::default()
            }
        }
    };

    // --- 3. Initialize Service Adapters ---
    let remote: Option<Arc<dyn RemoteHouseSource>> = match &config.remote {
        Some(remote) => {
            info!("Remote household source: {}", remote.houses_url);
            Some(Arc::new(HttpRemoteHouses::new(remote.houses_url.clone())?))
        }
        None => None,
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        store,
        rng,
        snapshots,
        remote,
    ));

    // --- 5. Start Background Tasks ---
    let token = CancellationToken::new();
    let mut background = vec![
        tokio::spawn(tasks::persist_snapshots(app_state.clone(), token.clone())),
        tokio::spawn(tasks::sweep_dnd(app_state.clone(), token.clone())),
    ];
    if let Some(remote) = &config.remote {
        background.push(tokio::spawn(tasks::refresh_remote(
            app_state.clone(),
            remote.room_key.clone(),
            remote.refresh_every,
            token.clone(),
        )));
    }

    // --- 6. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state.clone()).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 8. Drain Background Work & Write the Final Snapshot ---
    token.cancel();
    for task in background {
        if let Err(e) = task.await {
            error!("Background task failed: {:?}", e);
        }
    }
    app_state.flush().await?;
    info!("Final snapshot written. Goodbye.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}
