// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message relay: inbound webhook attribution, app-side sends, and reads.
//!
//! An inbound SMS arrives addressed to a proxy number. Attribution maps the
//! `(proxy number, sender number)` pair to the open conversation bound to
//! that proxy and the participant owning the sender number. Delivery to the
//! other participants is NOT immediate: they get an unread notification and
//! an armed inactivity timer, and the presence sweeper later flushes the
//! accrued messages as one SMS. The provider bills per message, so rapid
//! back-and-forth must batch.

use proxyline_core::types::now_timestamp;
use proxyline_core::{ChatMessage, Conversation, Participant, ProxylineError};
use tracing::{debug, info};

use proxyline_storage::queries::{conversations, messages, notifications, pool};
use proxyline_storage::Database;

use crate::presence::PresenceTracker;

/// Join the payloads of a batch of unseen messages, oldest first, into one
/// outbound SMS body.
pub fn combine_messages(batch: &[ChatMessage]) -> String {
    batch
        .iter()
        .map(|m| m.body.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inbound attribution and message persistence.
#[derive(Clone)]
pub struct Relay {
    db: Database,
    presence: PresenceTracker,
}

impl Relay {
    pub fn new(db: Database, presence: PresenceTracker) -> Self {
        Self { db, presence }
    }

    /// Resolve an inbound `(proxy number, sender number)` pair to the open
    /// conversation and the sending participant.
    ///
    /// Misses (stale/ported proxy number, sender not a participant) are
    /// `NotFound` and are returned as-is, never retried.
    pub async fn resolve_inbound(
        &self,
        proxy_phone: &str,
        sender_phone: &str,
    ) -> Result<(Conversation, Participant), ProxylineError> {
        let number = pool::get_by_phone(&self.db, proxy_phone)
            .await?
            .ok_or_else(|| ProxylineError::not_found("proxy number", proxy_phone))?;
        let conversation = conversations::find_open_by_proxy(&self.db, &number.id)
            .await?
            .ok_or_else(|| ProxylineError::not_found("conversation", proxy_phone))?;
        let sender = conversation
            .participant_by_phone(sender_phone)
            .cloned()
            .ok_or_else(|| {
                ProxylineError::not_found("conversation participant", sender_phone)
            })?;
        Ok((conversation, sender))
    }

    /// Handle one provider webhook: `from` is the sender's real number,
    /// `to` the proxy number the SMS was addressed to.
    pub async fn handle_inbound(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<ChatMessage, ProxylineError> {
        let (conversation, sender) = self.resolve_inbound(to, from).await?;
        debug!(
            conversation_id = %conversation.id,
            sender_id = %sender.user_id,
            "inbound SMS attributed"
        );
        self.persist_and_notify(&conversation, &sender.user_id, body)
            .await
    }

    /// App-side send on behalf of a participant.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
    ) -> Result<ChatMessage, ProxylineError> {
        let conversation = conversations::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| ProxylineError::not_found("conversation", conversation_id))?;
        if conversation.participant(sender_id).is_none() {
            return Err(ProxylineError::InvalidInput(format!(
                "user `{sender_id}` is not a member of conversation `{conversation_id}`"
            )));
        }
        self.persist_and_notify(&conversation, sender_id, body).await
    }

    /// Membership-checked, time-ordered message page. Also acknowledges the
    /// reader's unread marker.
    pub async fn fetch_messages(
        &self,
        conversation_id: &str,
        requesting_user: &str,
        before: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ProxylineError> {
        let conversation = conversations::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| ProxylineError::not_found("conversation", conversation_id))?;
        if conversation.participant(requesting_user).is_none() {
            // Non-members learn nothing, not even that the conversation exists.
            return Err(ProxylineError::not_found("conversation", conversation_id));
        }

        let page = messages::list_messages(&self.db, conversation_id, before, limit).await?;
        notifications::upsert_notification(&self.db, requesting_user, true).await?;
        Ok(page)
    }

    /// Persist the message and mark every other participant unread with a
    /// freshly armed inactivity timer.
    async fn persist_and_notify(
        &self,
        conversation: &Conversation,
        sender_id: &str,
        body: &str,
    ) -> Result<ChatMessage, ProxylineError> {
        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_id: sender_id.to_string(),
            body: body.to_string(),
            seen: false,
            created_at: now_timestamp(),
        };
        messages::insert_message(&self.db, &message).await?;

        for other in conversation.other_participants(sender_id) {
            notifications::upsert_notification(&self.db, &other.user_id, false).await?;
            self.presence.touch(&other.user_id).await?;
        }

        info!(
            conversation_id = %conversation.id,
            sender_id,
            recipients = conversation.participants.len() - 1,
            "chat message persisted"
        );
        Ok(message)
    }
}
