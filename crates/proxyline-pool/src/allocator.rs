// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proxy number allocation.
//!
//! Numbers are billed per-number-per-month, so allocation exhausts free
//! options before paying: an already-owned idle number, then a resync in
//! case the cache is stale, then release of a number idled by a closed
//! overlapping conversation, and only then a purchase.
//!
//! `allocate` only decides; it does not bind. The conversation-open worker
//! is the sole caller and serializes decide-plus-bind as one unit, so two
//! concurrent conversation-creation calls can never select the same number.
//! The partial unique index on open bindings backstops the invariant at the
//! storage layer.

use std::sync::Arc;

use proxyline_core::types::now_timestamp;
use proxyline_core::{
    AlertMailer, NumberStatus, PoolNumber, ProxylineError, Roster, TelephonyProvider,
};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use proxyline_storage::queries::{conversations, pool};
use proxyline_storage::Database;

use crate::reconciler::Reconciler;

/// The allocation component: direct availability, resync-and-retry,
/// release-for-reuse, then purchase, in that order.
pub struct Allocator {
    db: Database,
    provider: Arc<dyn TelephonyProvider>,
    reconciler: Reconciler,
    mailer: Arc<dyn AlertMailer>,
    max_numbers: usize,
}

impl Allocator {
    pub fn new(
        db: Database,
        provider: Arc<dyn TelephonyProvider>,
        mailer: Arc<dyn AlertMailer>,
        max_numbers: usize,
    ) -> Self {
        let reconciler = Reconciler::new(db.clone(), provider.clone(), mailer.clone());
        Self {
            db,
            provider,
            reconciler,
            mailer,
            max_numbers,
        }
    }

    /// Produce a proxy number usable for a conversation over `roster`.
    ///
    /// Must only be called from the serialized conversation-open path; the
    /// returned number is unreserved until the caller persists a binding.
    pub async fn allocate(&self, roster: &Roster) -> Result<PoolNumber, ProxylineError> {
        // 1. An already-owned idle number.
        if let Some(number) = self.pick_available(roster).await? {
            return Ok(number);
        }

        // 2. The cache may be stale relative to the provider; resync once
        //    and retry. A sync failure falls back to the cached pool.
        match self.reconciler.sync().await {
            Ok(report) => {
                debug!(added = report.added.len(), "resynced pool before retry");
                if let Some(number) = self.pick_available(roster).await? {
                    return Ok(number);
                }
            }
            Err(e) => {
                warn!(error = %e, "inventory sync failed, continuing with cached pool");
            }
        }

        // 3. Release a number idled by a closed conversation that already
        //    shares a phone with this roster. Reuse among related parties
        //    exposes no new real number.
        if let Some(closed) =
            conversations::releasable_closed_overlapping(&self.db, &roster.phone_numbers())
                .await?
        {
            let number_id = closed.proxy_number_id.clone().ok_or_else(|| {
                ProxylineError::Internal(
                    "releasable conversation lost its binding mid-allocation".into(),
                )
            })?;
            conversations::release_binding(&self.db, &closed.id).await?;
            let number = pool::get_by_id(&self.db, &number_id)
                .await?
                .ok_or_else(|| ProxylineError::not_found("proxy number", number_id))?;
            info!(
                conversation_id = %closed.id,
                phone_number = %number.phone_number,
                "released idle number for reuse"
            );
            return Ok(number);
        }

        // 4/5. Nothing releasable: purchase if below the cap, else refuse
        //      before any provider call is made.
        let pool_size = pool::count_numbers(&self.db).await?;
        if pool_size >= self.max_numbers {
            return Err(ProxylineError::MaxNumbersExceeded {
                cap: self.max_numbers,
            });
        }

        self.buy_new_number().await
    }

    async fn pick_available(
        &self,
        roster: &Roster,
    ) -> Result<Option<PoolNumber>, ProxylineError> {
        let candidates =
            pool::available_unbound_numbers(&self.db, &roster.phone_numbers()).await?;
        // All candidates are equivalent; pick uniformly at random.
        Ok(candidates.choose(&mut rand::thread_rng()).cloned())
    }

    async fn buy_new_number(&self) -> Result<PoolNumber, ProxylineError> {
        let candidate = self
            .provider
            .find_purchasable_number()
            .await?
            .ok_or(ProxylineError::NoPhoneAvailable)?;

        let purchased = match self.provider.purchase_number(&candidate).await {
            Ok(purchased) => purchased,
            Err(e) => {
                self.spawn_purchase_alert(
                    "proxy number purchase failed",
                    format!("Purchasing {candidate} from the provider failed: {e}\n"),
                );
                return Err(e);
            }
        };

        // Insert only after the provider confirmed; a timed-out purchase
        // leaves no half-created row.
        let now = now_timestamp();
        let number = PoolNumber {
            id: uuid::Uuid::new_v4().to_string(),
            phone_number: purchased.phone_number,
            provider_sid: purchased.provider_sid,
            status: NumberStatus::Available,
            created_at: now.clone(),
            updated_at: now,
        };
        pool::insert_number(&self.db, &number).await?;

        info!(phone_number = %number.phone_number, "purchased new proxy number");
        self.spawn_purchase_alert(
            "proxy number purchased",
            format!(
                "Purchased {} (provider sid {}) because the pool had no usable number.\n\
                 This number bills monthly until released provider-side.\n",
                number.phone_number, number.provider_sid
            ),
        );

        Ok(number)
    }

    /// Purchase alerts are informational; send them off-path and log failures.
    fn spawn_purchase_alert(&self, subject: &'static str, body: String) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_alert(subject, &body).await {
                warn!(error = %e, "failed to send purchase alert");
            }
        });
    }
}
