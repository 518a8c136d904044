// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock alert mailer that captures alerts instead of sending them.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use proxyline_core::{AlertMailer, ProxylineError};

/// One captured alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAlert {
    pub subject: String,
    pub body: String,
}

/// In-memory alert mailer with failure injection.
#[derive(Default)]
pub struct MockMailer {
    alerts: Mutex<Vec<CapturedAlert>>,
    fail_sends: AtomicU32,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends fail.
    pub async fn fail_next_sends(&self, n: u32) {
        self.fail_sends.store(n, Ordering::SeqCst);
    }

    /// All alerts captured so far, in send order.
    pub async fn alerts(&self) -> Vec<CapturedAlert> {
        self.alerts.lock().await.clone()
    }
}

#[async_trait]
impl AlertMailer for MockMailer {
    async fn send_alert(&self, subject: &str, body: &str) -> Result<(), ProxylineError> {
        let should_fail = self
            .fail_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ProxylineError::Mail {
                message: "mock mail failure".to_string(),
                source: None,
            });
        }
        self.alerts.lock().await.push(CapturedAlert {
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_alerts_in_order() {
        let mock = MockMailer::new();
        mock.send_alert("first", "a").await.unwrap();
        mock.send_alert("second", "b").await.unwrap();

        let alerts = mock.alerts().await;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].subject, "first");
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let mock = MockMailer::new();
        mock.fail_next_sends(1).await;
        assert!(mock.send_alert("boom", "x").await.is_err());
        assert!(mock.send_alert("ok", "y").await.is_ok());
        assert_eq!(mock.alerts().await.len(), 1);
    }
}
