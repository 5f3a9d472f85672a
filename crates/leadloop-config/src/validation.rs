// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as interval ordering and offset ranges. Collects every
//! failure instead of stopping at the first.

use crate::diagnostic::ConfigError;
use crate::model::LeadloopConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadloopConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let host = config.server.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.debounce.quiet_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "debounce.quiet_secs must be greater than zero".to_string(),
        });
    }

    if config.scheduler.min_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.min_interval_secs must be greater than zero".to_string(),
        });
    }

    if config.scheduler.min_interval_secs > config.scheduler.max_interval_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.min_interval_secs ({}) must not exceed scheduler.max_interval_secs ({})",
                config.scheduler.min_interval_secs, config.scheduler.max_interval_secs
            ),
        });
    }

    if config.scheduler.lead_ttl_hours <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.lead_ttl_hours must be positive, got {}",
                config.scheduler.lead_ttl_hours
            ),
        });
    }

    if !(-12..=14).contains(&config.material.utc_offset_hours) {
        errors.push(ConfigError::Validation {
            message: format!(
                "material.utc_offset_hours must be between -12 and 14, got {}",
                config.material.utc_offset_hours
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LeadloopConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let mut config = LeadloopConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("database_path")));
    }

    #[test]
    fn inverted_scheduler_bounds_are_rejected() {
        let mut config = LeadloopConfig::default();
        config.scheduler.min_interval_secs = 600;
        config.scheduler.max_interval_secs = 300;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = LeadloopConfig::default();
        config.storage.database_path = String::new();
        config.debounce.quiet_secs = 0;
        config.scheduler.lead_ttl_hours = 0;
        config.material.utc_offset_hours = 30;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "validation must not fail fast");
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let mut config = LeadloopConfig::default();
        config.material.utc_offset_hours = -13;
        assert!(validate_config(&config).is_err());
        config.material.utc_offset_hours = -3;
        assert!(validate_config(&config).is_ok());
    }
}
