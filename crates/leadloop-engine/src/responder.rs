// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reply router: classify a coalesced customer reply and drive the
//! matching reaction.
//!
//! Side-effect ordering is the load-bearing part here. Reactions that send
//! something (objection, relative, legitimate denial) apply their status
//! and CRM effects only after the send succeeded; a failed send leaves
//! everything untouched so the next inbound message retries the whole
//! reaction. The fake-mismatch branch deliberately sends nothing.

use std::sync::Arc;

use async_trait::async_trait;
use leadloop_core::types::{ChatMessage, IntentCategory, NumberStatus, Sender};
use leadloop_core::{
    CrmClient, IntentClassifier, LeadloopError, MessageGateway, ReplyContext,
};
use leadloop_storage::queries::{leads, messages, numbers};
use leadloop_storage::Database;
use tracing::{info, warn};

use crate::compose::MessageComposer;
use crate::debounce::ReplyHandler;
use crate::dispatch::{reaction_for, Reaction};

/// Routes classified replies to their reactions.
pub struct ReplyRouter {
    db: Database,
    crm: Arc<dyn CrmClient>,
    gateway: Arc<dyn MessageGateway>,
    classifier: Arc<dyn IntentClassifier>,
    composer: Arc<MessageComposer>,
    /// Pipeline stage every human hand-off moves the lead to.
    human_stage_id: i64,
}

impl ReplyRouter {
    pub fn new(
        db: Database,
        crm: Arc<dyn CrmClient>,
        gateway: Arc<dyn MessageGateway>,
        classifier: Arc<dyn IntentClassifier>,
        composer: Arc<MessageComposer>,
        human_stage_id: i64,
    ) -> Self {
        Self {
            db,
            crm,
            gateway,
            classifier,
            composer,
            human_stage_id,
        }
    }

    async fn classify(&self, context: &ReplyContext) -> IntentCategory {
        let transcript = format_transcript(&context.history, &context.message);
        match self.classifier.classify_intent(&transcript).await {
            Ok(category) => category,
            Err(e) => {
                // A classifier outage must not break the conversation; the
                // number stays open and the next reply tries again.
                warn!(error = %e, "classifier failed, treating reply as unclassified");
                IntentCategory::Unclassified
            }
        }
    }

    /// Send the presentation with a caption, falling back to plain text.
    /// Returns whether anything was delivered.
    async fn send_with_fallback(&self, context: &ReplyContext, caption: &str) -> bool {
        if let Some(pdf_base64) = self.composer.presentation_base64() {
            match self
                .gateway
                .send_media(
                    &context.remote_number,
                    &context.instance_id,
                    &pdf_base64,
                    self.composer.presentation_filename(),
                    caption,
                )
                .await
            {
                Ok(_) => return true,
                Err(e) => {
                    warn!(error = %e, "media send failed, falling back to plain text");
                }
            }
        }

        match self
            .gateway
            .send_text(&context.remote_number, caption, &context.instance_id)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "text send failed, reaction will retry on next reply");
                false
            }
        }
    }

    /// Record a delivered agent message and close the number with `status`.
    async fn record_outcome(
        &self,
        context: &ReplyContext,
        sent_text: &str,
        status: NumberStatus,
    ) -> Result<(), LeadloopError> {
        messages::insert_message(&self.db, context.number_id, Sender::Agent, sent_text).await?;
        numbers::set_status(&self.db, context.number_id, status).await?;
        Ok(())
    }

    /// Advance the lead to the human stage and attach a note.
    async fn hand_off(&self, lead_id: i64, note: &str) -> Result<(), LeadloopError> {
        let Some(crm_lead_id) = leads::crm_id_for(&self.db, lead_id).await? else {
            warn!(lead_id, "lead has no CRM id, skipping hand-off");
            return Ok(());
        };
        self.crm
            .update_lead_stage(crm_lead_id, self.human_stage_id)
            .await?;
        self.crm.create_note(crm_lead_id, note).await?;
        Ok(())
    }

    async fn on_confirmation(&self, context: &ReplyContext) -> Result<(), LeadloopError> {
        info!(number_id = context.number_id, "identity confirmed");
        numbers::set_status(&self.db, context.number_id, NumberStatus::Confirmed).await?;

        let note = format!(
            "IDENTIFICAÇÃO POSITIVA VIA CHATBOT\n\n\
             O número +{} confirmou ser o titular do processo.\n{}",
            context.remote_number,
            note_transcript(&context.history, &context.message),
        );
        self.hand_off(context.lead_id, &note).await
    }

    async fn on_objection(&self, context: &ReplyContext) -> Result<(), LeadloopError> {
        info!(number_id = context.number_id, "objection raised, sending presentation");
        let responsible = leads::buyer_name_for_lead(&self.db, context.lead_id)
            .await?
            .unwrap_or_else(|| "nosso consultor".to_string());
        let caption = self.composer.introduction_message(&responsible).await;

        if !self.send_with_fallback(context, &caption).await {
            return Ok(());
        }

        self.record_outcome(context, &caption, NumberStatus::Objection)
            .await?;
        let note = format!(
            "IDENTIFICAÇÃO DE OBJEÇÃO VIA CHATBOT\n\
             O número +{} apresentou uma objeção durante a interação automática.\n{}",
            context.remote_number,
            note_transcript(&context.history, &context.message),
        );
        self.hand_off(context.lead_id, &note).await
    }

    async fn on_denial(&self, context: &ReplyContext) -> Result<(), LeadloopError> {
        let profile_name = context
            .profile_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let lead_name = leads::contact_name_for(&self.db, context.lead_id).await?;

        let suspected_mismatch = match (profile_name, lead_name.as_deref()) {
            (Some(profile), Some(lead)) => self
                .classifier
                .names_equivalent(lead, profile)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "name match failed, treating as non-equivalent");
                    false
                }),
            // No profile name to compare: treated as a genuine wrong number.
            _ => false,
        };

        if suspected_mismatch {
            info!(
                number_id = context.number_id,
                profile = profile_name.unwrap_or_default(),
                "denial with matching profile name, flagging without reply"
            );
            numbers::set_status(&self.db, context.number_id, NumberStatus::FakeMismatch).await?;

            // No reply on purpose: answering would tip off someone denying
            // their own identity.
            let note = format!(
                "ALERTA DE ENGANO SUSPEITO\n\
                 O número +{} negou ser a pessoa procurada, porém o nome no \
                 perfil do WhatsApp ('{}') bate com o nome do lead ('{}').\n\
                 AÇÃO: ligar pessoalmente ou investigar.\n{}",
                context.remote_number,
                profile_name.unwrap_or_default(),
                lead_name.as_deref().unwrap_or_default(),
                note_transcript(&context.history, &context.message),
            );
            let Some(crm_lead_id) = leads::crm_id_for(&self.db, context.lead_id).await? else {
                warn!(lead_id = context.lead_id, "lead has no CRM id, skipping alert note");
                return Ok(());
            };
            return self.crm.create_note(crm_lead_id, &note).await;
        }

        info!(number_id = context.number_id, "legitimate wrong number, apologizing");
        let apology = self.composer.wrong_number_message().await;
        match self
            .gateway
            .send_text(&context.remote_number, &apology, &context.instance_id)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "apology send failed, leaving number open");
                return Ok(());
            }
        }

        self.record_outcome(context, &apology, NumberStatus::Denied)
            .await?;
        let note = format!(
            "IDENTIFICAÇÃO DE ENGANO (NÚMERO ERRADO)\n\
             O número +{} informou que não pertence ao titular. O bot pediu \
             desculpas e encerrou. Verificar se há outros telefones disponíveis.\n{}",
            context.remote_number,
            note_transcript(&context.history, &context.message),
        );
        let Some(crm_lead_id) = leads::crm_id_for(&self.db, context.lead_id).await? else {
            return Ok(());
        };
        self.crm.create_note(crm_lead_id, &note).await
    }

    async fn on_relative(&self, context: &ReplyContext) -> Result<(), LeadloopError> {
        info!(number_id = context.number_id, "relative answered, sending hand-off request");
        let responsible = leads::buyer_name_for_lead(&self.db, context.lead_id)
            .await?
            .unwrap_or_else(|| "nosso consultor".to_string());
        let lead_name = leads::contact_name_for(&self.db, context.lead_id)
            .await?
            .unwrap_or_else(|| "o titular".to_string());
        let request = self.composer.relative_message(&responsible, &lead_name).await;

        if !self.send_with_fallback(context, &request).await {
            return Ok(());
        }

        self.record_outcome(context, &request, NumberStatus::Relative)
            .await?;
        let note = format!(
            "INTERAÇÃO COM PARENTE/CONHECIDO\n\
             O número +{} informou conhecer o titular ({lead_name}). O bot \
             enviou a solicitação de encaminhamento.\n{}",
            context.remote_number,
            note_transcript(&context.history, &context.message),
        );
        self.hand_off(context.lead_id, &note).await
    }

    async fn on_hold(&self, context: &ReplyContext) -> Result<(), LeadloopError> {
        numbers::set_status(&self.db, context.number_id, NumberStatus::InProgress).await
    }
}

#[async_trait]
impl ReplyHandler for ReplyRouter {
    async fn handle(&self, context: ReplyContext) -> Result<(), LeadloopError> {
        let category = self.classify(&context).await;
        info!(
            lead_id = context.lead_id,
            number_id = context.number_id,
            %category,
            "reply classified"
        );

        match reaction_for(category) {
            Reaction::Confirm => self.on_confirmation(&context).await,
            Reaction::SendPresentation => self.on_objection(&context).await,
            Reaction::JudgeDenial => self.on_denial(&context).await,
            Reaction::HandOffToRelative => self.on_relative(&context).await,
            Reaction::Hold => self.on_hold(&context).await,
        }
    }
}

/// Render the conversation for the classifier.
///
/// Agent turns are prefixed `Agent:`, user turns `Customer:`. A history
/// user turn whose text already appears inside the newest (possibly
/// debounce-joined) message is skipped, so coalesced fragments that echo
/// stored messages are not classified twice. The newest message renders as
/// one `Customer:` line per non-empty line.
pub fn format_transcript(history: &[ChatMessage], newest: &str) -> String {
    let newest = newest.trim();
    let mut lines = Vec::new();

    for msg in history {
        let content = msg.content.trim();
        if msg.sender == Sender::User && !content.is_empty() && newest.contains(content) {
            continue;
        }
        let prefix = match msg.sender {
            Sender::Agent => "Agent: ",
            Sender::User => "Customer: ",
        };
        lines.push(format!("{prefix}{}", msg.content));
    }

    for line in newest.lines() {
        let line = line.trim();
        if !line.is_empty() {
            lines.push(format!("Customer: {line}"));
        }
    }

    lines.join("\n")
}

/// Render the conversation for a CRM audit note.
pub fn note_transcript(history: &[ChatMessage], newest: &str) -> String {
    let mut out = String::from("\n════ HISTÓRICO DA CONVERSA ════\n\n");
    for msg in history {
        let label = match msg.sender {
            Sender::Agent => "BOT",
            Sender::User => "CLIENTE",
        };
        out.push_str(&format!("{label}: {}\n", msg.content));
        out.push_str(&"─".repeat(30));
        out.push('\n');
    }
    out.push_str(&format!("CLIENTE: {newest}\n"));
    out.push_str("\n═══════════════════════════════");
    out
}
