use std::sync::Arc;

use tracing::info;

use crate::config::ConfigV1;
use crate::media::create_media_host;
use crate::routes::create_router;
use crate::state::AppState;
use crate::store::create_store;
use crate::tokens::TokenService;

/// Wires up the store, token service and media host, then serves the API.
pub async fn run(config: ConfigV1) -> Result<(), String> {
    let store = create_store(&config.store).await;
    let media = create_media_host(&config.media);
    let tokens = Arc::new(TokenService::new(config.tokens.clone()));

    tokio::fs::create_dir_all(&config.media.temp_dir)
        .await
        .map_err(|e| format!("failed to create upload spool directory: {}", e))?;

    let bind_address = config.bind_address.clone();
    let state = AppState {
        config: Arc::new(config),
        store,
        tokens,
        media,
    };

    let app = create_router(state);

    info!("Starting server on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| format!("failed to bind {}: {}", bind_address, e))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {}", e))
}
