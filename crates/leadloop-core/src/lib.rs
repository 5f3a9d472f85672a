// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the leadloop qualification bot.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the leadloop workspace. The engine depends
//! only on the traits defined here, never on concrete collaborator clients.

pub mod error;
pub mod phone;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LeadloopError;
pub use types::{
    ChatMessage, Gender, IntentCategory, LeadStatus, MessageId, NumberStatus, OutboundIdentity,
    ReplyContext, Sender,
};

// Re-export all collaborator traits at crate root.
pub use traits::{AudioTranscriber, CrmClient, IntentClassifier, MessageGateway};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leadloop_error_has_all_variants() {
        let _config = LeadloopError::Config("test".into());
        let _storage = LeadloopError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _crm = LeadloopError::Crm {
            message: "test".into(),
            source: None,
        };
        let _gateway = LeadloopError::Gateway {
            message: "test".into(),
            source: None,
        };
        let _classifier = LeadloopError::Classifier {
            message: "test".into(),
            source: None,
        };
        let _not_found = LeadloopError::not_found("lead", 42);
        let _timeout = LeadloopError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = LeadloopError::Internal("test".into());
    }

    #[test]
    fn not_found_formats_entity_and_key() {
        let err = LeadloopError::not_found("outbound identity", "buyer=3 region=SP");
        assert_eq!(
            err.to_string(),
            "outbound identity not found: buyer=3 region=SP"
        );
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that the collaborator traits are object safe,
        // since the engine holds them as Arc<dyn Trait>.
        fn _crm(_: &dyn CrmClient) {}
        fn _gateway(_: &dyn MessageGateway) {}
        fn _classifier(_: &dyn IntentClassifier) {}
        fn _transcriber(_: &dyn AudioTranscriber) {}
    }
}
