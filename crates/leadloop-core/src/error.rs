// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the leadloop qualification bot.

use thiserror::Error;

/// The primary error type used across all leadloop crates.
///
/// Lookup misses (`NotFound`) and remote collaborator failures
/// (`Crm`/`Gateway`/`Classifier`) are non-fatal by design: top-level entry
/// points catch them, log, and leave persistent state untouched so the next
/// trigger can retry.
#[derive(Debug, Error)]
pub enum LeadloopError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, rollback).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// CRM collaborator errors (lead fetch, stage update, note creation).
    #[error("CRM error: {message}")]
    Crm {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging-gateway collaborator errors (send, media fetch).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Classifier collaborator errors (intent, name match, transcription).
    #[error("classifier error: {message}")]
    Classifier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lookup missed: lead, contact, number, outbound identity.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadloopError {
    /// Construct a `NotFound` error with a displayable key.
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
