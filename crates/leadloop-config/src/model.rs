// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the leadloop qualification bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level leadloop configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; secrets (tokens, API keys) have no defaults and stay `None`
/// until provided.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadloopConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// CRM collaborator settings.
    #[serde(default)]
    pub crm: CrmConfig,

    /// WhatsApp gateway collaborator settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Language-model classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound message coalescing settings.
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Background scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Presentation material and locale settings.
    #[serde(default)]
    pub material: MaterialConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot process.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "leadloop".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// CRM collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrmConfig {
    /// Account subdomain, e.g. `acme` for `acme.kommo.com`.
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Long-lived bearer token.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Pipeline stage every hand-off moves the lead to (confirmation,
    /// objection, relative, exhaustion, 24h timeout).
    #[serde(default)]
    pub human_stage_id: i64,

    /// Per-request timeout for CRM calls.
    #[serde(default = "default_crm_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            subdomain: None,
            api_token: None,
            human_stage_id: 0,
            request_timeout_secs: default_crm_timeout(),
        }
    }
}

fn default_crm_timeout() -> u64 {
    20
}

/// WhatsApp gateway collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Gateway base URL, without a trailing slash.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Gateway API key, sent as the `apikey` header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Typing-simulation delay the gateway applies before delivering, in ms.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,

    /// Timeout for plain-text sends.
    #[serde(default = "default_text_timeout")]
    pub text_timeout_secs: u64,

    /// Timeout for media uploads (larger payloads need longer).
    #[serde(default = "default_media_timeout")]
    pub media_timeout_secs: u64,

    /// Timeout for media base64 retrieval.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            send_delay_ms: default_send_delay_ms(),
            text_timeout_secs: default_text_timeout(),
            media_timeout_secs: default_media_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_send_delay_ms() -> u64 {
    1200
}

fn default_text_timeout() -> u64 {
    30
}

fn default_media_timeout() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    40
}

/// Language-model classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,

    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chat model used for intent, name-match, and gender calls.
    #[serde(default = "default_classifier_model")]
    pub model: String,

    /// Model used for audio transcription.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Per-request timeout for classifier calls.
    #[serde(default = "default_classifier_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_base_url(),
            api_key: None,
            model: default_classifier_model(),
            transcription_model: default_transcription_model(),
            request_timeout_secs: default_classifier_timeout(),
        }
    }
}

fn default_classifier_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_classifier_timeout() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "leadloop.db".to_string()
}

/// Inbound message coalescing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebounceConfig {
    /// Quiet period after the last fragment before classification fires.
    #[serde(default = "default_quiet_secs")]
    pub quiet_secs: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_secs: default_quiet_secs(),
        }
    }
}

fn default_quiet_secs() -> u64 {
    10
}

/// Background scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Lower bound of the randomized sleep between cycles.
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,

    /// Upper bound of the randomized sleep between cycles.
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,

    /// Age after which an unresolved lead is handed off to a human.
    #[serde(default = "default_lead_ttl_hours")]
    pub lead_ttl_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval(),
            max_interval_secs: default_max_interval(),
            lead_ttl_hours: default_lead_ttl_hours(),
        }
    }
}

fn default_min_interval() -> u64 {
    180
}

fn default_max_interval() -> u64 {
    360
}

fn default_lead_ttl_hours() -> i64 {
    24
}

/// Webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether the destructive `/webhook/reset` endpoint is enabled.
    /// Must stay `false` anywhere near production data.
    #[serde(default)]
    pub allow_reset: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allow_reset: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Presentation material and locale configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialConfig {
    /// Path to the presentation PDF sent on objection/relative replies.
    #[serde(default)]
    pub presentation_path: Option<String>,

    /// Filename shown to the recipient for the presentation attachment.
    #[serde(default = "default_presentation_filename")]
    pub presentation_filename: String,

    /// UTC offset of the audience, used for the time-of-day greeting.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            presentation_path: None,
            presentation_filename: default_presentation_filename(),
            utc_offset_hours: default_utc_offset(),
        }
    }
}

fn default_presentation_filename() -> String {
    "Apresentacao.pdf".to_string()
}

fn default_utc_offset() -> i32 {
    -3
}
