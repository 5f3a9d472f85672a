// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The background scheduler: finalize exhausted leads, expire stale ones,
//! and contact the next pending lead.
//!
//! Each cycle runs its three steps independently; a failing step is logged
//! and the cycle continues, so one misbehaving collaborator cannot starve
//! the others. CRM failures leave the lead untouched locally and the next
//! cycle retries it.

use std::sync::Arc;
use std::time::Duration;

use leadloop_config::model::SchedulerConfig;
use leadloop_core::{CrmClient, LeadloopError};
use leadloop_storage::queries::{leads, numbers};
use leadloop_storage::Database;
use rand::Rng;
use tracing::{error, info, warn};

use crate::opener::InitialContactFlow;

/// Closing note for leads whose every number reached a terminal status.
const EXHAUSTED_NOTE: &str = "IDENTIFICAÇÃO FINALIZADA\n\
     Todos os números vinculados a este lead foram contatados e finalizados.";

/// Closing note for leads past the age limit.
const EXPIRED_NOTE: &str = "TIMEOUT AUTOMÁTICO (24H)\n\
     Passaram-se 24 horas desde a entrada do lead e não houve uma \
     identificação positiva clara nos números testados.\n\
     O lead foi movido para qualificação humana para análise manual.";

/// Timer-driven reconciliation worker.
pub struct Scheduler {
    db: Database,
    crm: Arc<dyn CrmClient>,
    opener: Arc<InitialContactFlow>,
    config: SchedulerConfig,
    human_stage_id: i64,
}

impl Scheduler {
    pub fn new(
        db: Database,
        crm: Arc<dyn CrmClient>,
        opener: Arc<InitialContactFlow>,
        config: SchedulerConfig,
        human_stage_id: i64,
    ) -> Self {
        Self {
            db,
            crm,
            opener,
            config,
            human_stage_id,
        }
    }

    /// Run cycles forever, sleeping a randomized interval in between.
    /// Only external interruption (process shutdown) ends the loop.
    pub async fn run(&self) {
        info!(
            min_secs = self.config.min_interval_secs,
            max_secs = self.config.max_interval_secs,
            "scheduler started"
        );
        loop {
            let wait = self.next_interval();
            info!(wait_secs = wait.as_secs(), "sleeping until next cycle");
            tokio::time::sleep(wait).await;
            self.cycle().await;
        }
    }

    /// Uniformly random sleep between the configured bounds.
    fn next_interval(&self) -> Duration {
        let min = self.config.min_interval_secs;
        let max = self.config.max_interval_secs.max(min);
        Duration::from_secs(rand::thread_rng().gen_range(min..=max))
    }

    /// One reconciliation cycle: finalize, expire, dispatch.
    pub async fn cycle(&self) {
        if let Err(e) = self.finalize_exhausted().await {
            error!(error = %e, "finalize step failed");
        }
        if let Err(e) = self.expire_stale().await {
            error!(error = %e, "expiry step failed");
        }
        if let Err(e) = self.dispatch_next().await {
            error!(error = %e, "dispatch step failed");
        }
    }

    /// Conclude leads whose every number is terminally resolved.
    async fn finalize_exhausted(&self) -> Result<(), LeadloopError> {
        let exhausted = leads::leads_to_finalize(&self.db).await?;
        if exhausted.is_empty() {
            return Ok(());
        }
        info!(count = exhausted.len(), "finalizing exhausted leads");

        for lead in exhausted {
            // Double-check against races with a reply that reopened a number.
            if !numbers::is_exhausted(&self.db, lead.id).await? {
                continue;
            }
            match self
                .crm
                .update_lead_stage(lead.crm_lead_id, self.human_stage_id)
                .await
            {
                Ok(()) => {
                    self.crm.create_note(lead.crm_lead_id, EXHAUSTED_NOTE).await?;
                    leads::mark_concluded(&self.db, lead.id).await?;
                    info!(crm_lead_id = lead.crm_lead_id, "lead concluded (numbers exhausted)");
                }
                Err(e) => {
                    warn!(
                        crm_lead_id = lead.crm_lead_id,
                        error = %e,
                        "CRM update failed, lead will retry next cycle"
                    );
                }
            }
        }
        Ok(())
    }

    /// Conclude leads older than the configured TTL.
    async fn expire_stale(&self) -> Result<(), LeadloopError> {
        let expired = leads::leads_expired(&self.db, self.config.lead_ttl_hours).await?;
        if expired.is_empty() {
            return Ok(());
        }
        info!(count = expired.len(), "expiring stale leads");

        for lead in expired {
            match self
                .crm
                .update_lead_stage(lead.crm_lead_id, self.human_stage_id)
                .await
            {
                Ok(()) => {
                    self.crm.create_note(lead.crm_lead_id, EXPIRED_NOTE).await?;
                    leads::mark_concluded(&self.db, lead.id).await?;
                    info!(crm_lead_id = lead.crm_lead_id, "lead concluded (24h timeout)");
                }
                Err(e) => {
                    warn!(
                        crm_lead_id = lead.crm_lead_id,
                        error = %e,
                        "CRM update failed, lead will retry next cycle"
                    );
                }
            }
        }
        Ok(())
    }

    /// Contact the oldest pending lead, if any.
    async fn dispatch_next(&self) -> Result<(), LeadloopError> {
        let Some(pending) = numbers::dequeue_pending(&self.db).await? else {
            info!("queue empty, nothing to dispatch");
            return Ok(());
        };
        info!(crm_lead_id = pending.crm_lead_id, "dispatching next pending lead");
        self.opener.run(pending.crm_lead_id, None).await
    }
}
