// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! Captures every send for assertion and lets tests force media or text
//! sends to fail, exercising the attachment-fallback policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadloop_core::{LeadloopError, MessageGateway, MessageId};

/// A captured text send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub number: String,
    pub text: String,
    pub instance: String,
}

/// A captured media send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMedia {
    pub number: String,
    pub instance: String,
    pub filename: String,
    pub caption: String,
}

/// A mock gateway with captured sends and failure switches.
#[derive(Default)]
pub struct MockGateway {
    texts: Arc<Mutex<Vec<SentText>>>,
    media: Arc<Mutex<Vec<SentMedia>>>,
    fail_text: AtomicBool,
    fail_media: AtomicBool,
    media_base64: Mutex<Option<String>>,
    counter: std::sync::atomic::AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `send_text` call fail until reset.
    pub fn fail_text(&self, fail: bool) {
        self.fail_text.store(fail, Ordering::SeqCst);
    }

    /// Make every `send_media` call fail until reset.
    pub fn fail_media(&self, fail: bool) {
        self.fail_media.store(fail, Ordering::SeqCst);
    }

    /// Script the next `fetch_media_base64` response.
    pub async fn put_media_base64(&self, b64: impl Into<String>) {
        *self.media_base64.lock().await = Some(b64.into());
    }

    /// All captured text sends.
    pub async fn sent_texts(&self) -> Vec<SentText> {
        self.texts.lock().await.clone()
    }

    /// All captured media sends.
    pub async fn sent_media(&self) -> Vec<SentMedia> {
        self.media.lock().await.clone()
    }

    /// Total sends of any kind.
    pub async fn send_count(&self) -> usize {
        self.texts.lock().await.len() + self.media.lock().await.len()
    }

    fn next_id(&self) -> MessageId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        MessageId(format!("mock-msg-{n}"))
    }
}

#[async_trait]
impl MessageGateway for MockGateway {
    async fn send_text(
        &self,
        number: &str,
        text: &str,
        instance: &str,
    ) -> Result<MessageId, LeadloopError> {
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(LeadloopError::Gateway {
                message: "mock text send failure".into(),
                source: None,
            });
        }
        self.texts.lock().await.push(SentText {
            number: number.to_string(),
            text: text.to_string(),
            instance: instance.to_string(),
        });
        Ok(self.next_id())
    }

    async fn send_media(
        &self,
        number: &str,
        instance: &str,
        _file_base64: &str,
        filename: &str,
        caption: &str,
    ) -> Result<MessageId, LeadloopError> {
        if self.fail_media.load(Ordering::SeqCst) {
            return Err(LeadloopError::Gateway {
                message: "mock media send failure".into(),
                source: None,
            });
        }
        self.media.lock().await.push(SentMedia {
            number: number.to_string(),
            instance: instance.to_string(),
            filename: filename.to_string(),
            caption: caption.to_string(),
        });
        Ok(self.next_id())
    }

    async fn fetch_media_base64(
        &self,
        _instance: &str,
        _message_id: &str,
        _remote_jid: &str,
        _from_me: bool,
    ) -> Result<String, LeadloopError> {
        self.media_base64
            .lock()
            .await
            .clone()
            .ok_or_else(|| LeadloopError::Gateway {
                message: "mock gateway has no scripted media".into(),
                source: None,
            })
    }
}
