// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook event processing.
//!
//! Resolves the sender, gates on the number's status, extracts text from
//! the (possibly wrapped) payload, transcribes voice notes, stores the
//! user message, and hands the fragment to the debouncer. Every guard
//! drops the event quietly; unknown senders are simply not our leads.

use std::sync::Arc;

use leadloop_core::types::Sender;
use leadloop_core::{AudioTranscriber, LeadloopError, MessageGateway, ReplyContext};
use leadloop_storage::queries::{messages, numbers};
use leadloop_storage::Database;
use leadloop_whatsapp::envelope::{jid_digits, MessageBody, WebhookEvent};
use tracing::{debug, error, info, warn};

use crate::debounce::DebounceManager;

/// Turns gateway webhook events into debounced reply fragments.
pub struct InboundProcessor {
    db: Database,
    debouncer: Arc<DebounceManager>,
    gateway: Arc<dyn MessageGateway>,
    transcriber: Arc<dyn AudioTranscriber>,
}

impl InboundProcessor {
    pub fn new(
        db: Database,
        debouncer: Arc<DebounceManager>,
        gateway: Arc<dyn MessageGateway>,
        transcriber: Arc<dyn AudioTranscriber>,
    ) -> Self {
        Self {
            db,
            debouncer,
            gateway,
            transcriber,
        }
    }

    /// Process one `messages.upsert` event.
    pub async fn process(&self, event: WebhookEvent) -> Result<(), LeadloopError> {
        let Some(data) = event.data else {
            debug!("event carried no data, ignoring");
            return Ok(());
        };

        if data.key.from_me {
            return Ok(());
        }

        let Some(jid) = data.key.sender_jid() else {
            error!("received a linked-device JID without an alternative, dropping event");
            return Ok(());
        };
        let jid = jid.to_string();
        let digits = jid_digits(&jid).to_string();

        let Some(conversation) = numbers::conversation_context(&self.db, &digits).await? else {
            info!(number = digits, "sender is not a known lead number, ignoring");
            return Ok(());
        };

        if !conversation.status.is_open() {
            info!(
                number = digits,
                status = %conversation.status,
                "number already resolved, ignoring reply"
            );
            return Ok(());
        }

        let Some(body) = data.message.as_ref().and_then(|m| m.body()) else {
            info!(number = digits, "unsupported message type, ignoring");
            return Ok(());
        };

        let text = match body {
            MessageBody::Text(text) => text,
            MessageBody::Audio => {
                match self.transcribe_audio(&event.instance, &data.key.id, &jid).await {
                    Some(text) => text,
                    None => return Ok(()),
                }
            }
        };
        if text.trim().is_empty() {
            return Ok(());
        }

        messages::insert_message(&self.db, conversation.number_id, Sender::User, &text).await?;
        numbers::mark_replied(&self.db, conversation.number_id).await?;

        let context = ReplyContext {
            lead_id: conversation.lead_id,
            number_id: conversation.number_id,
            remote_number: digits,
            message: text.clone(),
            history: conversation.history,
            instance_id: event.instance,
            profile_name: data.push_name,
        };
        self.debouncer.add_fragment(&jid, text, context).await;
        Ok(())
    }

    /// Fetch and transcribe a voice note. `None` drops the message.
    async fn transcribe_audio(
        &self,
        instance: &str,
        message_id: &Option<String>,
        jid: &str,
    ) -> Option<String> {
        let Some(message_id) = message_id.as_deref() else {
            warn!("audio message without a message id, dropping");
            return None;
        };

        let audio_base64 = match self
            .gateway
            .fetch_media_base64(instance, message_id, jid, false)
            .await
        {
            Ok(b64) => b64,
            Err(e) => {
                warn!(message_id, error = %e, "media fetch failed, dropping audio");
                return None;
            }
        };

        match self.transcriber.transcribe_base64(&audio_base64).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                info!(message_id, "empty transcription, dropping audio");
                None
            }
            Err(e) => {
                warn!(message_id, error = %e, "transcription failed, dropping audio");
                None
            }
        }
    }
}
