// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language-model classifier for the leadloop qualification bot.
//!
//! Implements [`IntentClassifier`](leadloop_core::IntentClassifier) and
//! [`AudioTranscriber`](leadloop_core::AudioTranscriber) against an
//! OpenAI-compatible API. The engine never sees this crate directly; it
//! talks to the traits, so tests run with deterministic fakes.

pub mod client;
pub mod prompts;

use async_trait::async_trait;
use leadloop_core::types::{Gender, IntentCategory};
use leadloop_core::{AudioTranscriber, IntentClassifier, LeadloopError};
use tracing::{debug, warn};

use crate::client::ChatCompletionsClient;

/// LLM-backed classifier implementing the capability traits.
#[derive(Debug, Clone)]
pub struct LlmClassifier {
    client: ChatCompletionsClient,
}

impl LlmClassifier {
    pub fn new(config: &leadloop_config::model::ClassifierConfig) -> Result<Self, LeadloopError> {
        Ok(Self {
            client: ChatCompletionsClient::new(config)?,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: String) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

/// Parse the model's answer into the closed category set.
///
/// Anything outside the set maps to `Unclassified` — a wrong answer from
/// the model must never break the reply flow.
pub fn parse_category(raw: &str) -> IntentCategory {
    let cleaned: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    match cleaned.as_str() {
        "confirmation" => IntentCategory::Confirmation,
        "objection" => IntentCategory::Objection,
        "denial" => IntentCategory::Denial,
        "relative" => IntentCategory::Relative,
        "neutral" => IntentCategory::Neutral,
        "unclassified" => IntentCategory::Unclassified,
        other => {
            warn!(answer = other, "classifier answered outside the closed set");
            IntentCategory::Unclassified
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify_intent(&self, transcript: &str) -> Result<IntentCategory, LeadloopError> {
        let answer = self
            .client
            .chat(
                prompts::INTENT_SYSTEM,
                &prompts::intent_user(transcript),
            )
            .await?;
        let category = parse_category(&answer);
        debug!(%category, "intent classified");
        Ok(category)
    }

    async fn names_equivalent(
        &self,
        lead_name: &str,
        profile_name: &str,
    ) -> Result<bool, LeadloopError> {
        let lead = lead_name.trim();
        let profile = profile_name.trim();
        if lead.is_empty() || profile.is_empty() {
            return Ok(false);
        }
        // Identical names need no model call.
        if lead.eq_ignore_ascii_case(profile) {
            return Ok(true);
        }

        let answer = self
            .client
            .chat(
                prompts::NAME_MATCH_SYSTEM,
                &prompts::name_match_user(lead, profile),
            )
            .await?;
        let verdict = answer.trim().to_uppercase().contains("TRUE");
        debug!(lead, profile, verdict, "name equivalence judged");
        Ok(verdict)
    }

    async fn detect_gender(&self, first_name: &str) -> Result<Gender, LeadloopError> {
        let answer = self
            .client
            .chat(prompts::GENDER_SYSTEM, first_name.trim())
            .await?;
        Ok(match answer.trim().to_uppercase().as_str() {
            "F" => Gender::Female,
            _ => Gender::Male,
        })
    }
}

#[async_trait]
impl AudioTranscriber for LlmClassifier {
    async fn transcribe_base64(&self, audio_base64: &str) -> Result<String, LeadloopError> {
        if audio_base64.is_empty() {
            return Ok(String::new());
        }
        self.client.transcribe(audio_base64).await
    }
}
