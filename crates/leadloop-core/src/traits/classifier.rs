// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifier collaborator trait: intent detection and name matching.

use async_trait::async_trait;

use crate::error::LeadloopError;
use crate::types::{Gender, IntentCategory};

/// Black-box language-model classifier.
///
/// Implementations translate free text into the closed [`IntentCategory`]
/// set. Callers treat every error as non-fatal: a failed `classify_intent`
/// becomes `Unclassified`, a failed `names_equivalent` becomes `false`.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify a rendered conversation transcript into one category.
    async fn classify_intent(&self, transcript: &str) -> Result<IntentCategory, LeadloopError>;

    /// Whether two person names plausibly refer to the same person,
    /// accounting for locale nicknames and abbreviations.
    async fn names_equivalent(
        &self,
        lead_name: &str,
        profile_name: &str,
    ) -> Result<bool, LeadloopError>;

    /// Guess the grammatical gender of a first name, for pronoun agreement
    /// in templated messages.
    async fn detect_gender(&self, first_name: &str) -> Result<Gender, LeadloopError>;
}
