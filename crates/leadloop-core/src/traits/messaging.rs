// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging-gateway collaborator trait: outbound sends and media fetch.

use async_trait::async_trait;

use crate::error::LeadloopError;
use crate::types::MessageId;

/// Client for the WhatsApp gateway.
///
/// `instance` selects which connected outbound identity performs the send;
/// it comes from the outbound-identity selection, or from the inbound event
/// when replying.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Send plain text to a number.
    async fn send_text(
        &self,
        number: &str,
        text: &str,
        instance: &str,
    ) -> Result<MessageId, LeadloopError>;

    /// Send a base64-encoded document with a caption.
    async fn send_media(
        &self,
        number: &str,
        instance: &str,
        file_base64: &str,
        filename: &str,
        caption: &str,
    ) -> Result<MessageId, LeadloopError>;

    /// Fetch the decrypted base64 payload of a received media message.
    async fn fetch_media_base64(
        &self,
        instance: &str,
        message_id: &str,
        remote_jid: &str,
        from_me: bool,
    ) -> Result<String, LeadloopError>;
}
