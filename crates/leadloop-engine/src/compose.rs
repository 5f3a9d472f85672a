// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message composition.
//!
//! Wording comes from the balanced template table when available, with
//! built-in fallbacks otherwise. Placeholders are filled with the
//! time-of-day greeting, names, and gender-agreed pronouns.

use std::sync::Arc;

use base64::Engine as _;
use chrono::{FixedOffset, Timelike, Utc};
use leadloop_config::model::MaterialConfig;
use leadloop_core::types::Gender;
use leadloop_core::IntentClassifier;
use leadloop_storage::queries::templates;
use leadloop_storage::Database;
use tracing::{error, warn};

/// Template kinds stored in the template table.
pub mod kinds {
    pub const OPENING: &str = "opening";
    pub const WRONG_NUMBER: &str = "wrong_number";
    pub const INTRODUCTION: &str = "introduction";
    pub const RELATIVE: &str = "relative";
}

/// Composes outbound messages and loads the presentation material.
pub struct MessageComposer {
    db: Database,
    classifier: Arc<dyn IntentClassifier>,
    material: MaterialConfig,
}

impl MessageComposer {
    pub fn new(
        db: Database,
        classifier: Arc<dyn IntentClassifier>,
        material: MaterialConfig,
    ) -> Self {
        Self {
            db,
            classifier,
            material,
        }
    }

    /// Filename shown to the recipient for the presentation attachment.
    pub fn presentation_filename(&self) -> &str {
        &self.material.presentation_filename
    }

    /// Current hour in the audience's time zone.
    fn local_hour(&self) -> u32 {
        let offset = FixedOffset::east_opt(self.material.utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Utc::now().with_timezone(&offset).hour()
    }

    /// The opening message for a first contact.
    pub async fn opening_message(&self, first_name: &str) -> String {
        let greeting = greeting_for_hour(self.local_hour());
        match self.fetch(kinds::OPENING).await {
            Some(body) => body
                .replace("{saudacao}", greeting)
                .replace("{saudacao_lower}", &greeting.to_lowercase())
                .replace("{nome_cliente}", first_name),
            None => format!("{greeting}, {first_name}. Tudo bem?"),
        }
    }

    /// The apology sent on a legitimate wrong-number denial.
    pub async fn wrong_number_message(&self) -> String {
        self.fetch(kinds::WRONG_NUMBER)
            .await
            .unwrap_or_else(|| "Desculpe o engano.".to_string())
    }

    /// The caption sent alongside the presentation on an objection.
    pub async fn introduction_message(&self, responsible_name: &str) -> String {
        match self.fetch(kinds::INTRODUCTION).await {
            Some(body) => body.replace("{nome_responsavel}", responsible_name),
            None => format!("Olá, sou {responsible_name}."),
        }
    }

    /// The hand-off request sent when a relative answers, with pronouns
    /// agreed to the lead's first name. Gender detection errors fall back
    /// to masculine forms.
    pub async fn relative_message(&self, responsible_name: &str, lead_name: &str) -> String {
        let gender = match self.classifier.detect_gender(lead_name).await {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "gender detection failed, using masculine forms");
                Gender::Male
            }
        };
        let (forward_pronoun, possessive_pronoun) = match gender {
            Gender::Male => ("encaminhá-lo", "dele"),
            Gender::Female => ("encaminhá-la", "dela"),
        };

        match self.fetch(kinds::RELATIVE).await {
            Some(body) => body
                .replace("{nome_responsavel}", responsible_name)
                .replace("{pronome_encaminhar}", forward_pronoun)
                .replace("{pronome_possessivo}", possessive_pronoun),
            None => format!(
                "Aqui é {responsible_name}. Poderia {forward_pronoun} até este \
                 número, ou me passar o contato {possessive_pronoun}?"
            ),
        }
    }

    /// The presentation PDF as cleaned base64, or `None` when unconfigured
    /// or unreadable (the caller falls back to plain text).
    pub fn presentation_base64(&self) -> Option<String> {
        let path = self.material.presentation_path.as_deref()?;
        match std::fs::read(path) {
            Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            Err(e) => {
                error!(path, error = %e, "presentation material unreadable");
                None
            }
        }
    }

    async fn fetch(&self, kind: &str) -> Option<String> {
        match templates::fetch_balanced(&self.db, kind).await {
            Ok(body) => body,
            Err(e) => {
                warn!(kind, error = %e, "template fetch failed, using fallback wording");
                None
            }
        }
    }
}

/// Greeting for an hour of day: morning from 05, afternoon from 12,
/// evening from 18.
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Bom dia",
        12..=17 => "Boa tarde",
        _ => "Boa noite",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadloop_storage::queries::templates::insert_template;
    use leadloop_test_utils::{temp_db, MockClassifier};

    fn material(path: Option<String>) -> MaterialConfig {
        MaterialConfig {
            presentation_path: path,
            ..MaterialConfig::default()
        }
    }

    #[test]
    fn greeting_bands() {
        assert_eq!(greeting_for_hour(4), "Boa noite");
        assert_eq!(greeting_for_hour(5), "Bom dia");
        assert_eq!(greeting_for_hour(11), "Bom dia");
        assert_eq!(greeting_for_hour(12), "Boa tarde");
        assert_eq!(greeting_for_hour(17), "Boa tarde");
        assert_eq!(greeting_for_hour(18), "Boa noite");
        assert_eq!(greeting_for_hour(23), "Boa noite");
    }

    #[tokio::test]
    async fn opening_fills_template_placeholders() {
        let (db, _dir) = temp_db().await;
        insert_template(&db, kinds::OPENING, "{saudacao}, {nome_cliente}! Falo com você?")
            .await
            .unwrap();

        let composer =
            MessageComposer::new(db, Arc::new(MockClassifier::new()), material(None));
        let msg = composer.opening_message("Francisca").await;
        assert!(msg.contains("Francisca"));
        assert!(
            msg.starts_with("Bom dia") || msg.starts_with("Boa tarde") || msg.starts_with("Boa noite")
        );
    }

    #[tokio::test]
    async fn missing_template_uses_fallback() {
        let (db, _dir) = temp_db().await;
        let composer =
            MessageComposer::new(db, Arc::new(MockClassifier::new()), material(None));

        assert_eq!(composer.wrong_number_message().await, "Desculpe o engano.");
        assert!(composer
            .introduction_message("Carlos")
            .await
            .contains("Carlos"));
    }

    #[tokio::test]
    async fn relative_message_agrees_pronouns() {
        let (db, _dir) = temp_db().await;
        insert_template(
            &db,
            kinds::RELATIVE,
            "Poderia {pronome_encaminhar}? O processo é {pronome_possessivo}.",
        )
        .await
        .unwrap();

        let classifier = Arc::new(MockClassifier::new());
        classifier.set_gender(leadloop_core::Gender::Female).await;
        let composer = MessageComposer::new(db, classifier, material(None));

        let msg = composer.relative_message("Carlos", "Francisca").await;
        assert!(msg.contains("encaminhá-la"));
        assert!(msg.contains("dela"));
    }

    #[tokio::test]
    async fn presentation_base64_reads_file() {
        let (db, _dir) = temp_db().await;
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("apresentacao.pdf");
        std::fs::write(&pdf_path, b"%PDF-1.4 fake").unwrap();

        let composer = MessageComposer::new(
            db,
            Arc::new(MockClassifier::new()),
            material(Some(pdf_path.to_str().unwrap().to_string())),
        );

        let b64 = composer.presentation_base64().unwrap();
        assert!(!b64.is_empty());
        assert!(!b64.contains('\n'));
    }

    #[tokio::test]
    async fn missing_presentation_is_none() {
        let (db, _dir) = temp_db().await;
        let composer = MessageComposer::new(
            db,
            Arc::new(MockClassifier::new()),
            material(Some("/nonexistent/file.pdf".into())),
        );
        assert!(composer.presentation_base64().is_none());
    }
}
