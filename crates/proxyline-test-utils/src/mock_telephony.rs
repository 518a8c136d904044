// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock telephony provider for deterministic testing.
//!
//! `MockTelephony` implements `TelephonyProvider` with a scripted inventory,
//! a FIFO queue of purchasable numbers, captured outbound SMS, failure
//! injection, and call counters, enabling fast CI-runnable tests without the
//! real provider. The counters let tests assert negatives such as "no
//! purchase call was made".

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use proxyline_core::{OwnedNumber, ProxylineError, PurchasedNumber, TelephonyProvider};

/// One SMS captured by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// A scripted in-memory telephony provider.
#[derive(Default)]
pub struct MockTelephony {
    inventory: Mutex<Vec<OwnedNumber>>,
    purchasable: Mutex<VecDeque<String>>,
    sent: Mutex<Vec<SentSms>>,
    fail_sms_to: Mutex<HashSet<String>>,
    fail_sms_from: Mutex<HashSet<String>>,
    fail_listings: AtomicU32,
    fail_purchases: AtomicU32,
    listing_calls: AtomicU32,
    purchase_calls: AtomicU32,
    sms_calls: AtomicU32,
}

impl MockTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the owned-number inventory reported by `list_owned_numbers`.
    pub async fn set_inventory(&self, inventory: Vec<OwnedNumber>) {
        *self.inventory.lock().await = inventory;
    }

    /// Queue a number offered for purchase.
    pub async fn push_purchasable(&self, phone_number: &str) {
        self.purchasable
            .lock()
            .await
            .push_back(phone_number.to_string());
    }

    /// Make the next `n` inventory listings fail.
    pub async fn fail_next_listings(&self, n: u32) {
        self.fail_listings.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` purchases fail.
    pub async fn fail_next_purchases(&self, n: u32) {
        self.fail_purchases.store(n, Ordering::SeqCst);
    }

    /// Make every SMS to this recipient fail.
    pub async fn fail_sms_to(&self, to: &str) {
        self.fail_sms_to.lock().await.insert(to.to_string());
    }

    /// Make every SMS sent from this proxy number fail.
    pub async fn fail_sms_from(&self, from: &str) {
        self.fail_sms_from.lock().await.insert(from.to_string());
    }

    /// All SMS captured so far, in send order.
    pub async fn sent_messages(&self) -> Vec<SentSms> {
        self.sent.lock().await.clone()
    }

    pub fn listing_calls(&self) -> u32 {
        self.listing_calls.load(Ordering::SeqCst)
    }

    pub fn purchase_calls(&self) -> u32 {
        self.purchase_calls.load(Ordering::SeqCst)
    }

    pub fn sms_calls(&self) -> u32 {
        self.sms_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TelephonyProvider for MockTelephony {
    async fn list_owned_numbers(&self) -> Result<Vec<OwnedNumber>, ProxylineError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_listings) {
            return Err(ProxylineError::Telephony {
                message: "mock inventory listing failure".to_string(),
                source: None,
            });
        }
        Ok(self.inventory.lock().await.clone())
    }

    async fn find_purchasable_number(&self) -> Result<Option<String>, ProxylineError> {
        Ok(self.purchasable.lock().await.front().cloned())
    }

    async fn purchase_number(
        &self,
        phone_number: &str,
    ) -> Result<PurchasedNumber, ProxylineError> {
        self.purchase_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_purchases) {
            return Err(ProxylineError::PurchaseFailed {
                message: format!("mock purchase failure for {phone_number}"),
                source: None,
            });
        }

        self.purchasable
            .lock()
            .await
            .retain(|candidate| candidate != phone_number);

        let purchased = PurchasedNumber {
            phone_number: phone_number.to_string(),
            provider_sid: format!("PN-MOCK-{}", self.purchase_calls()),
        };
        // The provider now owns it; later listings include it.
        self.inventory.lock().await.push(OwnedNumber {
            phone_number: purchased.phone_number.clone(),
            provider_sid: purchased.provider_sid.clone(),
        });
        Ok(purchased)
    }

    async fn send_sms(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), ProxylineError> {
        self.sms_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sms_to.lock().await.contains(to) {
            return Err(ProxylineError::Telephony {
                message: format!("mock SMS failure to {to}"),
                source: None,
            });
        }
        if self.fail_sms_from.lock().await.contains(from) {
            return Err(ProxylineError::Telephony {
                message: format!("mock SMS failure from {from}"),
                source: None,
            });
        }
        self.sent.lock().await.push(SentSms {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
