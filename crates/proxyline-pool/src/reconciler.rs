// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation of the local pool against the provider's inventory.
//!
//! The provider is the source of truth for which numbers exist and are
//! billable; the local pool is a cache that can drift when numbers are
//! bought, released, or ported outside this system. `sync` realigns the
//! cache and pages operations when local numbers have gone missing
//! provider-side, since that usually means money is being spent on numbers
//! no longer under our control.

use std::collections::BTreeMap;
use std::sync::Arc;

use proxyline_core::types::now_timestamp;
use proxyline_core::{AlertMailer, NumberStatus, PoolNumber, ProxylineError, TelephonyProvider};
use tracing::{info, warn};

use proxyline_storage::queries::pool;
use proxyline_storage::Database;

/// Outcome of one reconciliation pass, by phone number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Provider numbers that had no local row and were inserted.
    pub added: Vec<String>,
    /// Local rows flipped back to available because the provider still owns them.
    pub restored: Vec<String>,
    /// Local rows flipped to unavailable because the provider no longer
    /// reports them.
    pub lost: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.restored.is_empty() && self.lost.is_empty()
    }
}

/// Keeps the local pool consistent with the provider inventory.
pub struct Reconciler {
    db: Database,
    provider: Arc<dyn TelephonyProvider>,
    mailer: Arc<dyn AlertMailer>,
}

impl Reconciler {
    pub fn new(
        db: Database,
        provider: Arc<dyn TelephonyProvider>,
        mailer: Arc<dyn AlertMailer>,
    ) -> Self {
        Self {
            db,
            provider,
            mailer,
        }
    }

    /// Fetch the provider inventory and merge it into the local pool.
    ///
    /// A provider listing failure is [`ProxylineError::Sync`] and leaves the
    /// pool untouched. Drift alerting is best-effort and never fails the
    /// sync itself.
    pub async fn sync(&self) -> Result<SyncReport, ProxylineError> {
        let inventory =
            self.provider
                .list_owned_numbers()
                .await
                .map_err(|e| ProxylineError::Sync {
                    message: e.to_string(),
                    source: Some(Box::new(e)),
                })?;

        // Sorted map keyed by phone number; entries are consumed as local
        // rows match so the leftovers are exactly the provider-only numbers.
        let mut remote: BTreeMap<String, String> = inventory
            .into_iter()
            .map(|n| (n.phone_number, n.provider_sid))
            .collect();

        let local = pool::list_numbers(&self.db).await?;
        let mut report = SyncReport::default();

        for number in &local {
            match remote.remove(&number.phone_number) {
                Some(_sid) => {
                    if number.status != NumberStatus::Available {
                        pool::set_status(&self.db, &number.id, NumberStatus::Available)
                            .await?;
                        report.restored.push(number.phone_number.clone());
                    }
                }
                None => {
                    if number.status == NumberStatus::Available {
                        pool::set_status(&self.db, &number.id, NumberStatus::Unavailable)
                            .await?;
                        report.lost.push(number.phone_number.clone());
                    }
                }
            }
        }

        for (phone_number, provider_sid) in remote {
            let now = now_timestamp();
            let number = PoolNumber {
                id: uuid::Uuid::new_v4().to_string(),
                phone_number: phone_number.clone(),
                provider_sid,
                status: NumberStatus::Available,
                created_at: now.clone(),
                updated_at: now,
            };
            pool::insert_number(&self.db, &number).await?;
            report.added.push(phone_number);
        }

        if !report.lost.is_empty() {
            self.alert_lost_numbers(&report.lost).await;
        }

        if !report.is_noop() {
            info!(
                added = report.added.len(),
                restored = report.restored.len(),
                lost = report.lost.len(),
                "pool reconciled against provider inventory"
            );
        }

        Ok(report)
    }

    async fn alert_lost_numbers(&self, lost: &[String]) {
        let body = format!(
            "The telephony provider no longer reports the following pool numbers.\n\
             They were marked unavailable and need investigation:\n\n{}\n",
            lost.join("\n")
        );
        if let Err(e) = self
            .mailer
            .send_alert("proxy number pool drift detected", &body)
            .await
        {
            warn!(error = %e, "failed to send pool drift alert");
        }
    }
}
