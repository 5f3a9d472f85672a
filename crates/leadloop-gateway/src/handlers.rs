// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook endpoints.
//!
//! Both webhook handlers answer 200 before the real work happens: each
//! event is spawned onto its own task so a slow CRM or classifier call
//! never stalls the sender's delivery pipeline.

use std::collections::HashMap;

use axum::extract::{Form, Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use leadloop_storage::queries::admin;
use leadloop_whatsapp::envelope::WebhookEvent;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::server::AppState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// POST /webhook/crm
///
/// The CRM delivers urlencoded forms with bracketed keys like
/// `leads[status][0][id]` (stage changes) or `leads[add][0][id]` (new
/// leads). Either triggers the initial-contact flow in the background.
pub async fn post_crm_webhook(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(lead_id) = extract_lead_id(&form) else {
        warn!("CRM webhook carried no lead id");
        return StatusCode::OK;
    };

    let correlation = uuid::Uuid::new_v4();
    info!(lead_id, %correlation, "CRM trigger received, dispatching in background");

    let opener = state.opener.clone();
    tokio::spawn(async move {
        if let Err(e) = opener.run(lead_id, None).await {
            error!(lead_id, %correlation, error = %e, "initial contact failed");
        }
    });

    StatusCode::OK
}

/// Find the lead id in a CRM webhook form.
///
/// Stage-change keys are preferred over lead-creation keys, matching the
/// order the CRM fires them in.
pub fn extract_lead_id(form: &HashMap<String, String>) -> Option<i64> {
    for marker in ["leads[status]", "leads[add]"] {
        let mut candidates: Vec<(&String, i64)> = form
            .iter()
            .filter(|(key, _)| key.starts_with(marker) && key.ends_with("[id]"))
            .filter_map(|(key, value)| value.trim().parse::<i64>().ok().map(|id| (key, id)))
            .collect();
        // Deterministic pick when a batch carries several leads.
        candidates.sort_by_key(|(key, _)| key.as_str().to_string());
        if let Some((_, id)) = candidates.first() {
            return Some(*id);
        }
    }
    None
}

/// POST /webhook/whatsapp
///
/// Gateway event envelope. Only `messages.upsert` is interesting; every
/// other event type is acknowledged and dropped.
pub async fn post_whatsapp_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    if event.event != "messages.upsert" {
        return StatusCode::OK;
    }

    let inbound = state.inbound.clone();
    tokio::spawn(async move {
        if let Err(e) = inbound.process(event).await {
            error!(error = %e, "inbound message processing failed");
        }
    });

    StatusCode::OK
}

/// POST /webhook/reset
///
/// Destructive test-environment reset. Refused unless explicitly enabled
/// in configuration, so it can never run against production by accident.
pub async fn post_reset(State(state): State<AppState>) -> impl IntoResponse {
    if !state.allow_reset {
        warn!("reset requested but server.allow_reset is disabled");
        return (StatusCode::FORBIDDEN, "reset is disabled on this server");
    }

    match admin::reset_conversation_data(&state.db).await {
        Ok(()) => (StatusCode::OK, "reset complete"),
        Err(e) => {
            error!(error = %e, "reset failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "reset failed")
        }
    }
}

/// GET /health
pub async fn get_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
