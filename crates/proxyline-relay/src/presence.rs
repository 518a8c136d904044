// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence tracking and the inactivity-driven SMS flush.
//!
//! Chat activity directed at a user arms a deadline `now + window`. Once the
//! deadline passes, `trigger_send_sms` flushes every open conversation's
//! unseen messages to the user as one SMS per conversation. Flushes fan out
//! one task per conversation with independent retry and failure handling:
//! one recipient conversation failing must not block the others.

use std::sync::Arc;
use std::time::Duration;

use proxyline_core::types::now_timestamp;
use proxyline_core::{Conversation, ProxylineError, TelephonyProvider};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use proxyline_storage::queries::{conversations, messages, pool, presence};
use proxyline_storage::Database;

use crate::relay::combine_messages;

/// Outcome of one `trigger_send_sms` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Open conversations examined.
    pub conversations: usize,
    /// Conversations for which an SMS was sent.
    pub sent: usize,
    /// Conversations whose send failed after retry.
    pub failed: usize,
}

/// Arms, sweeps, and flushes per-user inactivity deadlines.
#[derive(Clone)]
pub struct PresenceTracker {
    db: Database,
    provider: Arc<dyn TelephonyProvider>,
    window: Duration,
}

impl PresenceTracker {
    pub fn new(db: Database, provider: Arc<dyn TelephonyProvider>, window: Duration) -> Self {
        Self {
            db,
            provider,
            window,
        }
    }

    /// (Re)arm the user's inactivity deadline to `now + window`.
    pub async fn touch(&self, user_id: &str) -> Result<(), ProxylineError> {
        presence::arm(&self.db, user_id, &self.deadline()).await
    }

    /// Users whose deadline has passed. The serve loop feeds these into
    /// [`PresenceTracker::trigger_send_sms`]; the scheduling itself stays
    /// outside the engine.
    pub async fn due_users(&self) -> Result<Vec<String>, ProxylineError> {
        presence::due(&self.db, &now_timestamp()).await
    }

    /// Flush the user's pending messages: one combined SMS per open
    /// conversation, sent concurrently, marked seen on success.
    pub async fn trigger_send_sms(
        &self,
        user_id: &str,
    ) -> Result<FlushSummary, ProxylineError> {
        let open = conversations::open_for_user(&self.db, user_id).await?;
        let mut summary = FlushSummary {
            conversations: open.len(),
            ..FlushSummary::default()
        };

        let mut tasks = JoinSet::new();
        for conversation in open {
            let db = self.db.clone();
            let provider = self.provider.clone();
            let user = user_id.to_string();
            tasks.spawn(async move {
                let id = conversation.id.clone();
                (id, flush_conversation(db, provider, conversation, &user).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(false))) => {}
                Ok((conversation_id, Ok(true))) => {
                    debug!(conversation_id, user_id, "pending messages flushed");
                    summary.sent += 1;
                }
                Ok((conversation_id, Err(e))) => {
                    warn!(conversation_id, user_id, error = %e, "SMS flush failed");
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!(user_id, error = %e, "SMS flush task panicked");
                    summary.failed += 1;
                }
            }
        }

        // Re-arm after a real flush so follow-up traffic batches again;
        // otherwise stay quiet until new activity arms the timer.
        if summary.sent > 0 {
            presence::arm(&self.db, user_id, &self.deadline()).await?;
        } else {
            presence::disarm(&self.db, user_id).await?;
        }

        if summary.sent > 0 || summary.failed > 0 {
            info!(
                user_id,
                sent = summary.sent,
                failed = summary.failed,
                "inactivity flush complete"
            );
        }
        Ok(summary)
    }

    fn deadline(&self) -> String {
        let window = chrono::Duration::from_std(self.window)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        (chrono::Utc::now() + window)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }
}

/// Flush one conversation to `user`. Returns `Ok(true)` when an SMS went
/// out, `Ok(false)` when there was nothing to send.
async fn flush_conversation(
    db: Database,
    provider: Arc<dyn TelephonyProvider>,
    conversation: Conversation,
    user: &str,
) -> Result<bool, ProxylineError> {
    let unseen = messages::unseen_for_receiver(&db, &conversation.id, user).await?;
    if unseen.is_empty() {
        return Ok(false);
    }

    let number_id = conversation.proxy_number_id.as_deref().ok_or_else(|| {
        ProxylineError::Internal(format!(
            "open conversation `{}` has no bound proxy number",
            conversation.id
        ))
    })?;
    let number = pool::get_by_id(&db, number_id)
        .await?
        .ok_or_else(|| ProxylineError::not_found("proxy number", number_id))?;
    let recipient = conversation
        .participant(user)
        .ok_or_else(|| ProxylineError::not_found("conversation participant", user))?;

    let body = combine_messages(&unseen);

    // One bounded retry, then give up and leave the messages unseen so the
    // next flush attempt picks them up again.
    if let Err(first) = provider
        .send_sms(&number.phone_number, &recipient.phone_number, &body)
        .await
    {
        warn!(
            conversation_id = %conversation.id,
            error = %first,
            "SMS send failed, retrying once"
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        provider
            .send_sms(&number.phone_number, &recipient.phone_number, &body)
            .await?;
    }

    let ids: Vec<String> = unseen.iter().map(|m| m.id.clone()).collect();
    messages::mark_seen(&db, &ids).await?;
    Ok(true)
}
