// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations: wire configuration into concrete collaborators
//! and hand them to the engine.

use std::sync::Arc;
use std::time::Duration;

use leadloop_classifier::LlmClassifier;
use leadloop_config::model::LeadloopConfig;
use leadloop_core::LeadloopError;
use leadloop_crm::CrmHttpClient;
use leadloop_engine::{
    DebounceManager, InboundProcessor, InitialContactFlow, MessageComposer, ReplyRouter,
    Scheduler,
};
use leadloop_gateway::{AppState, ServerConfig};
use leadloop_storage::Database;
use leadloop_whatsapp::WhatsAppClient;
use tracing::info;

/// Everything a command needs: storage plus the wired engine components.
struct Runtime {
    db: Database,
    crm: Arc<CrmHttpClient>,
    opener: Arc<InitialContactFlow>,
    inbound: Arc<InboundProcessor>,
}

async fn build_runtime(config: &LeadloopConfig) -> Result<Runtime, LeadloopError> {
    let db = Database::open(&config.storage.database_path).await?;

    let crm = Arc::new(CrmHttpClient::new(&config.crm)?);
    let gateway = Arc::new(WhatsAppClient::new(&config.whatsapp)?);
    let classifier = Arc::new(LlmClassifier::new(&config.classifier)?);

    let composer = Arc::new(MessageComposer::new(
        db.clone(),
        classifier.clone(),
        config.material.clone(),
    ));

    let router = Arc::new(ReplyRouter::new(
        db.clone(),
        crm.clone(),
        gateway.clone(),
        classifier.clone(),
        composer.clone(),
        config.crm.human_stage_id,
    ));
    let debouncer = DebounceManager::new(
        Duration::from_secs(config.debounce.quiet_secs),
        router,
    );
    let inbound = Arc::new(InboundProcessor::new(
        db.clone(),
        debouncer,
        gateway.clone(),
        classifier.clone(),
    ));
    let opener = Arc::new(InitialContactFlow::new(
        db.clone(),
        crm.clone(),
        gateway,
        composer,
    ));

    Ok(Runtime {
        db,
        crm,
        opener,
        inbound,
    })
}

/// `leadloop serve`: run the webhook server until interrupted.
pub async fn run_serve(config: LeadloopConfig) -> Result<(), LeadloopError> {
    info!(name = config.agent.name, "starting webhook server");
    let runtime = build_runtime(&config).await?;

    let state = AppState {
        db: runtime.db.clone(),
        inbound: runtime.inbound.clone(),
        opener: runtime.opener.clone(),
        allow_reset: config.server.allow_reset,
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    leadloop_gateway::start_server(&server_config, state).await
}

/// `leadloop scheduler`: run the reconciliation loop until interrupted.
pub async fn run_scheduler(config: LeadloopConfig) -> Result<(), LeadloopError> {
    info!(name = config.agent.name, "starting scheduler");
    let runtime = build_runtime(&config).await?;

    let scheduler = Scheduler::new(
        runtime.db.clone(),
        runtime.crm.clone(),
        runtime.opener.clone(),
        config.scheduler.clone(),
        config.crm.human_stage_id,
    );
    scheduler.run().await;
    Ok(())
}

/// `leadloop dispatch`: one manual initial-contact run.
pub async fn run_dispatch(
    config: LeadloopConfig,
    lead_id: i64,
    name_hint: Option<&str>,
) -> Result<(), LeadloopError> {
    info!(lead_id, "manual dispatch");
    let runtime = build_runtime(&config).await?;
    runtime.opener.run(lead_id, name_hint).await
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadloop={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
