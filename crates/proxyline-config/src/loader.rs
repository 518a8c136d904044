// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./proxyline.toml` > `~/.config/proxyline/proxyline.toml`
//! > `/etc/proxyline/proxyline.toml` with environment variable overrides via
//! `PROXYLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ProxylineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/proxyline/proxyline.toml` (system-wide)
/// 3. `~/.config/proxyline/proxyline.toml` (user XDG config)
/// 4. `./proxyline.toml` (local directory)
/// 5. `PROXYLINE_*` environment variables
pub fn load_config() -> Result<ProxylineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ProxylineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ProxylineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ProxylineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ProxylineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ProxylineConfig::default()))
        .merge(Toml::file("/etc/proxyline/proxyline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("proxyline/proxyline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("proxyline.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PROXYLINE_TELEPHONY_AUTH_TOKEN` must map
/// to `telephony.auth_token`, not `telephony.auth.token`.
fn env_provider() -> Env {
    Env::prefixed("PROXYLINE_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
///
/// Example: `PROXYLINE_TELEPHONY_AUTH_TOKEN` arrives as
/// `telephony_auth_token` and maps to `telephony.auth_token`.
fn env_key_to_path(key: &str) -> String {
    key.replacen("service_", "service.", 1)
        .replacen("telephony_", "telephony.", 1)
        .replacen("pool_", "pool.", 1)
        .replacen("relay_", "relay.", 1)
        .replacen("storage_", "storage.", 1)
        .replacen("alerts_", "alerts.", 1)
}
