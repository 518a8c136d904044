// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The serve loop: wires storage, provider, and mailer into the relay
//! engine, then runs the background duties -- periodic pool reconciliation
//! and the presence sweeper -- until ctrl-c.
//!
//! The engine's conversation/webhook operations are a library surface; the
//! embedding marketplace service mounts them behind its own transport. This
//! process only owns the maintenance loops.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use proxyline_config::ProxylineConfig;
use proxyline_core::{AlertMailer, ProxylineError, TelephonyProvider};
use proxyline_mailer::{NoopMailer, SmtpAlertMailer};
use proxyline_relay::RelayEngine;
use proxyline_storage::Database;
use proxyline_telephony::TwilioClient;

/// Run the service until ctrl-c.
pub async fn run(config: ProxylineConfig) -> Result<(), ProxylineError> {
    init_tracing(&config.service.log_level);

    let db = Database::open(&config.storage.database_path).await?;
    let provider: Arc<dyn TelephonyProvider> = Arc::new(TwilioClient::new(&config.telephony)?);
    let mailer: Arc<dyn AlertMailer> = if config.alerts.enabled {
        Arc::new(SmtpAlertMailer::new(&config.alerts)?)
    } else {
        Arc::new(NoopMailer)
    };

    let engine = RelayEngine::new(&config, db.clone(), provider, mailer);
    info!(
        service = %config.service.name,
        database = %config.storage.database_path,
        pool_cap = config.pool.max_numbers,
        "proxyline serving"
    );

    let mut sync_tick =
        tokio::time::interval(Duration::from_secs(config.relay.sync_interval_secs));
    sync_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sweep_tick =
        tokio::time::interval(Duration::from_secs(config.relay.sweep_interval_secs));
    sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // First tick fires immediately, so the pool reconciles at startup.
            _ = sync_tick.tick() => {
                match engine.sync_pool().await {
                    Ok(report) if !report.is_noop() => {
                        info!(
                            added = report.added.len(),
                            restored = report.restored.len(),
                            lost = report.lost.len(),
                            "pool sync complete"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "pool sync failed"),
                }
            }
            _ = sweep_tick.tick() => {
                sweep_presence(&engine).await;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "signal handler failed");
                }
                info!("shutting down");
                break;
            }
        }
    }

    db.close().await?;
    Ok(())
}

/// Flush every user past their inactivity deadline. Per-user failures are
/// logged and do not stop the sweep.
async fn sweep_presence(engine: &RelayEngine) {
    let due = match engine.due_users().await {
        Ok(due) => due,
        Err(e) => {
            warn!(error = %e, "presence sweep query failed");
            return;
        }
    };

    for user_id in due {
        match engine.trigger_send_sms(&user_id).await {
            Ok(summary) if summary.failed > 0 => {
                warn!(
                    user_id,
                    failed = summary.failed,
                    sent = summary.sent,
                    "inactivity flush had failures"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, error = %e, "inactivity flush failed"),
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    // Ignore a second init in tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxyline_test_utils::TestHarness;

    #[tokio::test]
    async fn sweep_flushes_due_users() {
        let h = TestHarness::new().await;
        h.provider.push_purchasable("+15559999").await;

        let conversation_id = h
            .engine
            .new_or_get_conversation(
                "order-1",
                "svc-1",
                vec![
                    ("A".to_string(), "555-0100".to_string()),
                    ("B".to_string(), "555-0200".to_string()),
                ],
            )
            .await
            .unwrap();
        h.engine.send_message(&conversation_id, "A", "ping").await.unwrap();

        // Let the 1s harness window expire, then sweep.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        sweep_presence(&h.engine).await;

        let sent = h.provider.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "555-0200");

        // An empty sweep is a no-op.
        sweep_presence(&h.engine).await;
        assert_eq!(h.provider.sms_calls(), 1);
    }
}
