// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp gateway integration for the leadloop qualification bot.
//!
//! Two halves:
//! - [`client`]: outbound REST client implementing
//!   [`MessageGateway`](leadloop_core::MessageGateway) — text sends, media
//!   sends, and media base64 retrieval.
//! - [`envelope`]: the inbound webhook payload model, including the
//!   nested-envelope unwrapping WhatsApp applies to ephemeral, view-once,
//!   document-with-caption, and edited messages.

pub mod client;
pub mod envelope;

pub use client::WhatsAppClient;
pub use envelope::{MessageBody, MessageKey, MessagePayload, WebhookEvent};
