// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./leadloop.toml` > `~/.config/leadloop/leadloop.toml`
//! > `/etc/leadloop/leadloop.toml`, with environment variable overrides via the
//! `LEADLOOP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LeadloopConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/leadloop/leadloop.toml` (system-wide)
/// 3. `~/.config/leadloop/leadloop.toml` (user XDG config)
/// 4. `./leadloop.toml` (local directory)
/// 5. `LEADLOOP_*` environment variables
pub fn load_config() -> Result<LeadloopConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LeadloopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadloopConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LeadloopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadloopConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LeadloopConfig::default()))
        .merge(Toml::file("/etc/leadloop/leadloop.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("leadloop/leadloop.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("leadloop.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `LEADLOOP_CRM_API_TOKEN` must map to
/// `crm.api_token`, not `crm.api.token`.
fn env_provider() -> Env {
    Env::prefixed("LEADLOOP_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: LEADLOOP_CRM_API_TOKEN -> "crm_api_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("crm_", "crm.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("classifier_", "classifier.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("debounce_", "debounce.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("server_", "server.", 1)
            .replacen("material_", "material.", 1);
        mapped.into()
    })
}
