// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio transcription collaborator trait.

use async_trait::async_trait;

use crate::error::LeadloopError;

/// Transcribes voice messages so they can flow through the text pipeline.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    /// Transcribe a base64-encoded audio payload. An empty string means
    /// nothing intelligible was produced; callers drop the message.
    async fn transcribe_base64(&self, audio_base64: &str) -> Result<String, LeadloopError>;
}
