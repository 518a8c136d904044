// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational alert mail adapter trait.

use async_trait::async_trait;

use crate::error::ProxylineError;

/// Adapter for operational alert email (pool drift, number purchases).
///
/// Alerts are best-effort: callers log a delivery failure and continue; a
/// mailer error must never fail the operation that triggered the alert.
#[async_trait]
pub trait AlertMailer: Send + Sync {
    /// Send one alert with the given subject and rendered body.
    async fn send_alert(&self, subject: &str, body: &str) -> Result<(), ProxylineError>;
}
