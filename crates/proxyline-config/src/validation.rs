// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive intervals and alert addressing.

use crate::diagnostic::ConfigError;
use crate::model::ProxylineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ProxylineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.pool.max_numbers == 0 {
        errors.push(ConfigError::Validation {
            message: "pool.max_numbers must be at least 1".to_string(),
        });
    }

    if config.relay.inactivity_window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.inactivity_window_secs must be at least 1".to_string(),
        });
    }

    if config.relay.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.sweep_interval_secs must be at least 1".to_string(),
        });
    }

    if config.relay.sync_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.sync_interval_secs must be at least 1".to_string(),
        });
    }

    if config.telephony.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "telephony.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.telephony.country.len() != 2
        || !config.telephony.country.chars().all(|c| c.is_ascii_uppercase())
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "telephony.country must be a two-letter uppercase ISO code, got `{}`",
                config.telephony.country
            ),
        });
    }

    if config.alerts.enabled {
        for (key, value) in [
            ("alerts.smtp_host", &config.alerts.smtp_host),
            ("alerts.from", &config.alerts.from),
            ("alerts.to", &config.alerts.to),
        ] {
            match value {
                Some(v) if !v.trim().is_empty() => {}
                _ => errors.push(ConfigError::Validation {
                    message: format!("{key} is required when alerts.enabled = true"),
                }),
            }
        }
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
    fn default_config_validates() {
        let config = ProxylineConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_pool_cap_is_rejected() {
        let mut config = ProxylineConfig::default();
        config.pool.max_numbers = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("pool.max_numbers")));
    }

    #[test]
    fn enabled_alerts_require_addresses() {
        let mut config = ProxylineConfig::default();
        config.alerts.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        // smtp_host, from, and to are all missing.
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn lowercase_country_code_is_rejected() {
        let mut config = ProxylineConfig::default();
        config.telephony.country = "us".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_all_errors_without_failing_fast() {
        let mut config = ProxylineConfig::default();
        config.pool.max_numbers = 0;
        config.relay.inactivity_window_secs = 0;
        config.storage.database_path = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
