// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Proxyline SMS relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Proxyline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxylineConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telephony provider API settings.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Proxy number pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Relay and presence settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Operational alert email settings.
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "proxyline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telephony provider API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelephonyConfig {
    /// Provider account SID. `None` requires environment variable.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Provider auth token. `None` requires environment variable.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// API base URL override. `None` uses the provider's public endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout applied to every provider call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// ISO country code used when searching purchasable numbers.
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            country: default_country(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_country() -> String {
    "US".to_string()
}

/// Proxy number pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Hard ceiling on the number of pool entries. Purchases beyond this
    /// cap are refused regardless of demand.
    #[serde(default = "default_max_numbers")]
    pub max_numbers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_numbers: default_max_numbers(),
        }
    }
}

fn default_max_numbers() -> usize {
    20
}

/// Relay and presence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// How long a participant must be inactive before pending messages are
    /// flushed to them as a single SMS, in seconds.
    #[serde(default = "default_inactivity_window_secs")]
    pub inactivity_window_secs: u64,

    /// Interval of the serve loop that checks for users past their
    /// inactivity deadline, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Interval of the periodic pool reconciliation, in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            inactivity_window_secs: default_inactivity_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

fn default_inactivity_window_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_sync_interval_secs() -> u64 {
    3600
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
    "proxyline.db".to_string()
}

/// Operational alert email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsConfig {
    /// Whether drift/purchase alert emails are sent at all.
    #[serde(default)]
    pub enabled: bool,

    /// SMTP relay host.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username. `None` sends unauthenticated.
    #[serde(default)]
    pub smtp_username: Option<String>,

    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Sender address for alert mail.
    #[serde(default)]
    pub from: Option<String>,

    /// Recipient address for alert mail (the operations inbox).
    #[serde(default)]
    pub to: Option<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: None,
            to: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}
