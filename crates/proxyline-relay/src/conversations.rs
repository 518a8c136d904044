// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle: idempotent open-or-get, reopen, rebind, close.
//!
//! All conversation-opening runs on a single worker task fed over an mpsc
//! channel. The worker completes each decision -- availability check,
//! release, purchase, and the binding write -- before looking at the next
//! request, so concurrent opens cannot select the same proxy number. Closing
//! and summaries are plain reads/updates and bypass the worker.

use proxyline_core::types::now_timestamp;
use proxyline_core::{
    Conversation, ConversationStatus, ConversationSummary, NumberStatus, ProxylineError,
    Roster,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use proxyline_pool::Allocator;
use proxyline_storage::queries::{conversations, pool};
use proxyline_storage::Database;

struct OpenRequest {
    order_id: String,
    service_id: String,
    roster: Roster,
    reply: oneshot::Sender<Result<Conversation, ProxylineError>>,
}

/// Conversation lifecycle manager. Cheap to clone; all clones share the
/// single open-worker.
#[derive(Clone)]
pub struct ConversationManager {
    db: Database,
    open_tx: mpsc::Sender<OpenRequest>,
}

impl ConversationManager {
    /// Create the manager and spawn its open-worker, which takes ownership
    /// of the allocator.
    pub fn new(db: Database, allocator: Allocator) -> Self {
        let (open_tx, mut open_rx) = mpsc::channel::<OpenRequest>(64);
        let worker_db = db.clone();
        tokio::spawn(async move {
            while let Some(request) = open_rx.recv().await {
                let result = open_serialized(
                    &worker_db,
                    &allocator,
                    &request.order_id,
                    &request.service_id,
                    &request.roster,
                )
                .await;
                // The requester may have given up; nothing to do then.
                let _ = request.reply.send(result);
            }
            debug!("conversation open worker stopped");
        });
        Self { db, open_tx }
    }

    /// Open a conversation for `(order, service, roster)`, reusing an
    /// existing one when the exact pairing already exists.
    ///
    /// Calling this twice with identical arguments and no intervening close
    /// returns the same conversation without allocating a second number.
    pub async fn open_or_get(
        &self,
        order_id: &str,
        service_id: &str,
        roster: Roster,
    ) -> Result<Conversation, ProxylineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.open_tx
            .send(OpenRequest {
                order_id: order_id.to_string(),
                service_id: service_id.to_string(),
                roster,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProxylineError::Internal("conversation open worker stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| ProxylineError::Internal("open worker dropped the request".into()))?
    }

    /// Close every open conversation for the order. The bound numbers stay
    /// attached; release happens lazily on a later overlapping allocation.
    pub async fn close(&self, order_id: &str) -> Result<usize, ProxylineError> {
        let closed = conversations::close_for_order(&self.db, order_id).await?;
        if closed > 0 {
            info!(order_id, closed, "conversations closed");
        }
        Ok(closed)
    }

    /// Compact listings for the marketplace front door.
    pub async fn summaries(
        &self,
        ids: &[String],
    ) -> Result<Vec<ConversationSummary>, ProxylineError> {
        conversations::summaries(&self.db, ids).await
    }
}

async fn open_serialized(
    db: &Database,
    allocator: &Allocator,
    order_id: &str,
    service_id: &str,
    roster: &Roster,
) -> Result<Conversation, ProxylineError> {
    if let Some(existing) =
        conversations::find_by_exact_members(db, order_id, service_id, &roster.member_ids())
            .await?
    {
        match existing.status {
            // Idempotent: an open conversation for this exact pairing is
            // returned unchanged, no allocation.
            ConversationStatus::Open => return Ok(existing),
            ConversationStatus::Closed => {
                if binding_still_valid(db, &existing, roster).await? {
                    // Reopen in place; the roster write picks up phone
                    // renegotiations while keeping the binding.
                    let number_id = existing.proxy_number_id.as_deref();
                    conversations::update_binding(
                        db,
                        &existing.id,
                        roster.participants(),
                        number_id,
                    )
                    .await?;
                    info!(conversation_id = %existing.id, "conversation reopened in place");
                } else {
                    let number = allocator.allocate(roster).await?;
                    conversations::update_binding(
                        db,
                        &existing.id,
                        roster.participants(),
                        Some(&number.id),
                    )
                    .await?;
                    info!(
                        conversation_id = %existing.id,
                        phone_number = %number.phone_number,
                        "conversation rebound and reopened"
                    );
                }
                return conversations::get_conversation(db, &existing.id)
                    .await?
                    .ok_or_else(|| ProxylineError::not_found("conversation", &*existing.id));
            }
        }
    }

    let number = allocator.allocate(roster).await?;
    let now = now_timestamp();
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        order_id: order_id.to_string(),
        service_id: service_id.to_string(),
        participants: roster.participants().to_vec(),
        proxy_number_id: Some(number.id),
        status: ConversationStatus::Open,
        created_at: now.clone(),
        updated_at: now,
    };
    conversations::insert_conversation(db, &conversation).await?;
    info!(
        conversation_id = %conversation.id,
        order_id,
        phone_number = %number.phone_number,
        "conversation opened"
    );
    Ok(conversation)
}

/// Whether a closed conversation's bound number can be reused as-is for the
/// given roster: still present, still available, and not serving another
/// open or phone-overlapping conversation.
async fn binding_still_valid(
    db: &Database,
    conversation: &Conversation,
    roster: &Roster,
) -> Result<bool, ProxylineError> {
    let Some(number_id) = conversation.proxy_number_id.as_deref() else {
        return Ok(false);
    };
    let Some(number) = pool::get_by_id(db, number_id).await? else {
        return Ok(false);
    };
    if number.status != NumberStatus::Available {
        return Ok(false);
    }
    let conflicts = conversations::binding_conflicts(
        db,
        number_id,
        &conversation.id,
        &roster.phone_numbers(),
    )
    .await?;
    Ok(!conflicts)
}
