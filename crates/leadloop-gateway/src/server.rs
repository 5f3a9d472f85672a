// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook server built on axum: routes, shared state, and startup.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use leadloop_core::LeadloopError;
use leadloop_engine::{InboundProcessor, InitialContactFlow};
use leadloop_storage::Database;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage handle, used by the reset endpoint.
    pub db: Database,
    /// Processor for gateway message events.
    pub inbound: Arc<InboundProcessor>,
    /// Initial-contact flow for CRM lead events.
    pub opener: Arc<InitialContactFlow>,
    /// Whether the destructive reset endpoint is enabled.
    pub allow_reset: bool,
}

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Assemble the webhook router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/crm", post(handlers::post_crm_webhook))
        .route("/webhook/whatsapp", post(handlers::post_whatsapp_webhook))
        .route("/webhook/reset", post(handlers::post_reset))
        .route("/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until externally interrupted.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), LeadloopError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadloopError::Internal(format!("failed to bind webhook server to {addr}: {e}")))?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| LeadloopError::Internal(format!("webhook server error: {e}")))?;

    Ok(())
}
