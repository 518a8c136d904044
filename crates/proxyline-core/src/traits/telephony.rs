// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony provider adapter trait (Twilio-compatible REST providers).

use async_trait::async_trait;

use crate::error::ProxylineError;
use crate::types::{OwnedNumber, PurchasedNumber};

/// Adapter for the external telephony provider that owns, rents, and routes
/// the proxy numbers.
///
/// The provider is the source of truth for which numbers exist and are
/// billable; the local pool is a cache reconciled against it. All calls are
/// expected to be bounded by the implementation's request timeout.
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Full inventory of numbers the account currently owns.
    async fn list_owned_numbers(&self) -> Result<Vec<OwnedNumber>, ProxylineError>;

    /// A number currently offered for purchase, or `None` if the provider
    /// has nothing matching the configured search.
    async fn find_purchasable_number(&self) -> Result<Option<String>, ProxylineError>;

    /// Purchase `phone_number`. Only returns after the provider confirms,
    /// so callers can safely persist the result.
    async fn purchase_number(
        &self,
        phone_number: &str,
    ) -> Result<PurchasedNumber, ProxylineError>;

    /// Send a single SMS from a proxy number to a participant's real number.
    async fn send_sms(&self, from: &str, to: &str, body: &str)
        -> Result<(), ProxylineError>;
}
