// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state, and wires the whole
//! service together in [`run`].

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use confide_config::model::{ConfideConfig, GatewayConfig};
use confide_core::{CompletionProvider, ConfideError, ConversationStore, IdentityResolver};
use confide_engine::ChatEngine;
use confide_engine::shutdown::install_signal_handler;
use confide_storage::SqliteStore;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::auth::{StaticTokenResolver, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ChatEngine>,
    /// Process start time for uptime calculation.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<ChatEngine>) -> Self {
        Self {
            engine,
            started: Instant::now(),
        }
    }
}

/// Build the router:
/// - GET /health (public)
/// - POST /api/conversations/chat
/// - GET /api/conversations
/// - GET, PUT, DELETE /api/conversations/{id}
pub fn build_router(state: GatewayState, resolver: Arc<dyn IdentityResolver>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/conversations/chat", post(handlers::post_chat))
        .route("/api/conversations", get(handlers::list_conversations))
        .route(
            "/api/conversations/{id}",
            get(handlers::get_conversation)
                .put(handlers::update_conversation)
                .delete(handlers::delete_conversation),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            resolver,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), ConfideError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConfideError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ConfideError::Internal(format!("gateway server error: {e}")))?;

    info!("gateway stopped accepting connections");
    Ok(())
}

/// Install a global fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Already installed by the embedding binary or an earlier call.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the full service: open the store, start the engine, serve HTTP
/// until SIGINT/SIGTERM, then drain background jobs and close the store.
pub async fn run(
    config: ConfideConfig,
    provider: Arc<dyn CompletionProvider>,
) -> Result<(), ConfideError> {
    init_tracing(&config.gateway.log_level);

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    let store: Arc<dyn ConversationStore> = store;

    let engine = Arc::new(ChatEngine::new(&config, Arc::clone(&store), provider).await);

    let resolver = StaticTokenResolver::from_config(&config.gateway.tokens);
    if resolver.is_empty() {
        warn!("no gateway tokens configured, every API request will be rejected");
    }

    let app = build_router(GatewayState::new(Arc::clone(&engine)), Arc::new(resolver));
    let shutdown = install_signal_handler();
    let served = start_server(&config.gateway, app, shutdown).await;

    if !engine.shutdown().await {
        warn!("background jobs were interrupted during shutdown");
    }
    store.close().await?;
    info!("shutdown complete");
    served
}
