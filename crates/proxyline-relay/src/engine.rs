// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine facade: every operation the marketplace front door consumes,
//! behind one constructor-injected assembly. Transport-agnostic by design --
//! the embedding service mounts these operations behind whatever wire
//! format it uses.

use std::sync::Arc;
use std::time::Duration;

use proxyline_config::ProxylineConfig;
use proxyline_core::{
    AlertMailer, ChatMessage, ConversationSummary, ProxylineError, Roster, TelephonyProvider,
};

use proxyline_pool::{Allocator, Reconciler, SyncReport};
use proxyline_storage::Database;

use crate::conversations::ConversationManager;
use crate::presence::{FlushSummary, PresenceTracker};
use crate::relay::Relay;

/// Inbound webhook payload as delivered by the provider.
#[derive(Debug, Clone)]
pub struct InboundSms {
    /// The sender's real phone number.
    pub from: String,
    /// The proxy number the SMS was addressed to.
    pub to: String,
    pub body: String,
}

/// Fully assembled relay engine.
pub struct RelayEngine {
    manager: ConversationManager,
    relay: Relay,
    presence: PresenceTracker,
    reconciler: Reconciler,
}

impl RelayEngine {
    /// Wire the engine from its collaborators. Spawns the conversation-open
    /// worker, so this must run inside a tokio runtime.
    pub fn new(
        config: &ProxylineConfig,
        db: Database,
        provider: Arc<dyn TelephonyProvider>,
        mailer: Arc<dyn AlertMailer>,
    ) -> Self {
        let allocator = Allocator::new(
            db.clone(),
            provider.clone(),
            mailer.clone(),
            config.pool.max_numbers,
        );
        let manager = ConversationManager::new(db.clone(), allocator);
        let presence = PresenceTracker::new(
            db.clone(),
            provider.clone(),
            Duration::from_secs(config.relay.inactivity_window_secs),
        );
        let relay = Relay::new(db.clone(), presence.clone());
        let reconciler = Reconciler::new(db, provider, mailer);

        Self {
            manager,
            relay,
            presence,
            reconciler,
        }
    }

    /// Open (or idempotently return) the conversation for this order,
    /// service, and `(member id, real phone)` pairing. Returns the
    /// conversation id.
    pub async fn new_or_get_conversation(
        &self,
        order_id: &str,
        service_id: &str,
        members: Vec<(String, String)>,
    ) -> Result<String, ProxylineError> {
        let roster = Roster::new(members)?;
        let conversation = self.manager.open_or_get(order_id, service_id, roster).await?;
        Ok(conversation.id)
    }

    /// Close the order's open conversations. Returns how many were closed.
    pub async fn close_conversation(&self, order_id: &str) -> Result<usize, ProxylineError> {
        self.manager.close(order_id).await
    }

    /// Compact listings for the given conversation ids.
    pub async fn get_conversation_summaries(
        &self,
        ids: &[String],
    ) -> Result<Vec<ConversationSummary>, ProxylineError> {
        self.manager.summaries(ids).await
    }

    /// Attribute and persist one inbound provider webhook.
    pub async fn handle_inbound_webhook(
        &self,
        inbound: InboundSms,
    ) -> Result<ChatMessage, ProxylineError> {
        self.relay
            .handle_inbound(&inbound.from, &inbound.to, &inbound.body)
            .await
    }

    /// App-side send on behalf of a conversation member.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
    ) -> Result<ChatMessage, ProxylineError> {
        self.relay.send_message(conversation_id, sender_id, body).await
    }

    /// Membership-checked message page, oldest first.
    pub async fn fetch_messages(
        &self,
        conversation_id: &str,
        requesting_user: &str,
        before: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ProxylineError> {
        self.relay
            .fetch_messages(conversation_id, requesting_user, before, limit)
            .await
    }

    /// Flush the user's pending messages as batched SMS.
    pub async fn trigger_send_sms(
        &self,
        user_id: &str,
    ) -> Result<FlushSummary, ProxylineError> {
        self.presence.trigger_send_sms(user_id).await
    }

    /// Users past their inactivity deadline, for the serve loop.
    pub async fn due_users(&self) -> Result<Vec<String>, ProxylineError> {
        self.presence.due_users().await
    }

    /// Reconcile the local pool against the provider inventory.
    pub async fn sync_pool(&self) -> Result<SyncReport, ProxylineError> {
        self.reconciler.sync().await
    }
}
