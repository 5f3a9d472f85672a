// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock classifier for deterministic testing.
//!
//! Categories are popped from a FIFO queue; when the queue is empty the
//! classifier answers `Neutral`. Name-equivalence and gender verdicts are
//! scripted, and intent calls can be made to fail to exercise the
//! fall-back-to-unclassified path.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadloop_core::types::{Gender, IntentCategory};
use leadloop_core::{AudioTranscriber, IntentClassifier, LeadloopError};

/// A mock classifier with scripted verdicts.
pub struct MockClassifier {
    categories: Arc<Mutex<VecDeque<IntentCategory>>>,
    transcripts: Arc<Mutex<Vec<String>>>,
    names_match: AtomicBool,
    fail_intent: AtomicBool,
    fail_names: AtomicBool,
    gender: Mutex<Gender>,
    transcription: Mutex<String>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            categories: Arc::new(Mutex::new(VecDeque::new())),
            transcripts: Arc::new(Mutex::new(Vec::new())),
            names_match: AtomicBool::new(false),
            fail_intent: AtomicBool::new(false),
            fail_names: AtomicBool::new(false),
            gender: Mutex::new(Gender::Male),
            transcription: Mutex::new(String::new()),
        }
    }

    /// Create a mock pre-loaded with the given categories.
    pub fn with_categories(categories: Vec<IntentCategory>) -> Self {
        let mock = Self::new();
        *mock.categories.try_lock().expect("fresh mutex") = VecDeque::from(categories);
        mock
    }

    /// Queue another category.
    pub async fn push_category(&self, category: IntentCategory) {
        self.categories.lock().await.push_back(category);
    }

    /// Script the name-equivalence verdict.
    pub fn set_names_match(&self, verdict: bool) {
        self.names_match.store(verdict, Ordering::SeqCst);
    }

    /// Make every `classify_intent` call fail until reset.
    pub fn fail_intent(&self, fail: bool) {
        self.fail_intent.store(fail, Ordering::SeqCst);
    }

    /// Make every `names_equivalent` call fail until reset.
    pub fn fail_names(&self, fail: bool) {
        self.fail_names.store(fail, Ordering::SeqCst);
    }

    /// Script the gender verdict.
    pub async fn set_gender(&self, gender: Gender) {
        *self.gender.lock().await = gender;
    }

    /// Script the transcription result.
    pub async fn set_transcription(&self, text: impl Into<String>) {
        *self.transcription.lock().await = text.into();
    }

    /// Every transcript that reached `classify_intent`.
    pub async fn seen_transcripts(&self) -> Vec<String> {
        self.transcripts.lock().await.clone()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify_intent(&self, transcript: &str) -> Result<IntentCategory, LeadloopError> {
        if self.fail_intent.load(Ordering::SeqCst) {
            return Err(LeadloopError::Classifier {
                message: "mock intent failure".into(),
                source: None,
            });
        }
        self.transcripts.lock().await.push(transcript.to_string());
        Ok(self
            .categories
            .lock()
            .await
            .pop_front()
            .unwrap_or(IntentCategory::Neutral))
    }

    async fn names_equivalent(
        &self,
        _lead_name: &str,
        _profile_name: &str,
    ) -> Result<bool, LeadloopError> {
        if self.fail_names.load(Ordering::SeqCst) {
            return Err(LeadloopError::Classifier {
                message: "mock name match failure".into(),
                source: None,
            });
        }
        Ok(self.names_match.load(Ordering::SeqCst))
    }

    async fn detect_gender(&self, _first_name: &str) -> Result<Gender, LeadloopError> {
        Ok(*self.gender.lock().await)
    }
}

#[async_trait]
impl AudioTranscriber for MockClassifier {
    async fn transcribe_base64(&self, _audio_base64: &str) -> Result<String, LeadloopError> {
        Ok(self.transcription.lock().await.clone())
    }
}
