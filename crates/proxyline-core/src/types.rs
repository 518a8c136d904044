// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Proxyline workspace.
//!
//! Timestamps are stored and compared as RFC 3339 strings with millisecond
//! precision (`2026-01-01T00:00:00.000Z`), which sort lexicographically in
//! chronological order.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ProxylineError;

/// Current UTC time in the canonical timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Pool entry availability as reported by the last reconciliation.
///
/// "In use" is not a status: it is derived from open conversations
/// referencing the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NumberStatus {
    Available,
    Unavailable,
}

/// Conversation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Closed,
}

/// A rented proxy phone number tracked in the local pool.
///
/// Rows are provider-owned assets and are never deleted locally; a number
/// the provider no longer reports flips to [`NumberStatus::Unavailable`] on
/// the next reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolNumber {
    pub id: String,
    pub phone_number: String,
    pub provider_sid: String,
    pub status: NumberStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// One conversation participant: marketplace user id plus their real phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub phone_number: String,
}

/// The validated, phone-sorted participant list of a conversation.
///
/// A `Roster` can only be built through [`Roster::new`], which sorts the
/// pairs by phone number and rejects empty input, blank fields, and
/// duplicate phone numbers. Code downstream (overlap detection, inbound
/// attribution) can therefore rely on the pairing being consistent without
/// runtime assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    /// Build a roster from `(user_id, phone_number)` pairs.
    pub fn new(pairs: Vec<(String, String)>) -> Result<Self, ProxylineError> {
        if pairs.is_empty() {
            return Err(ProxylineError::InvalidInput(
                "conversation roster must not be empty".into(),
            ));
        }

        let mut participants = Vec::with_capacity(pairs.len());
        for (user_id, phone_number) in pairs {
            if user_id.trim().is_empty() {
                return Err(ProxylineError::InvalidInput(
                    "roster member id must not be empty".into(),
                ));
            }
            if phone_number.trim().is_empty() {
                return Err(ProxylineError::InvalidInput(format!(
                    "roster member `{user_id}` has an empty phone number"
                )));
            }
            participants.push(Participant {
                user_id,
                phone_number,
            });
        }

        participants.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));

        for pair in participants.windows(2) {
            if pair[0].phone_number == pair[1].phone_number {
                return Err(ProxylineError::InvalidInput(format!(
                    "duplicate phone number `{}` in roster",
                    pair[0].phone_number
                )));
            }
        }

        Ok(Self { participants })
    }

    /// Participants in phone-number order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Member ids in phone-number order.
    pub fn member_ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.user_id.clone()).collect()
    }

    /// Phone numbers in sorted order.
    pub fn phone_numbers(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.phone_number.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// The phone number registered for `user_id`, if the user is a member.
    pub fn phone_of(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.phone_number.as_str())
    }
}

/// A conversation binding a participant roster to a proxy number for one
/// marketplace order/service engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub order_id: String,
    pub service_id: String,
    /// Participants in phone-number order (the persisted roster).
    pub participants: Vec<Participant>,
    /// Bound proxy number, `None` once detached from a closed conversation.
    pub proxy_number_id: Option<String>,
    pub status: ConversationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    /// The participant whose real phone number is `phone`, if any.
    pub fn participant_by_phone(&self, phone: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.phone_number == phone)
    }

    /// The participant with the given user id, if any.
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// All participants other than `user_id`.
    pub fn other_participants(&self, user_id: &str) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(move |p| p.user_id != user_id)
    }
}

/// One chat message inside a conversation. Immutable once created except
/// for the `seen` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub seen: bool,
    pub created_at: String,
}

/// Unread marker for a user. At most one row per user, last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: String,
    pub seen: bool,
    pub updated_at: String,
}

/// Compact conversation listing for the marketplace front door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub members: Vec<String>,
    pub last_chat_at: Option<String>,
}

/// A number the provider reports as currently owned and billable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedNumber {
    pub phone_number: String,
    pub provider_sid: String,
}

/// A number just purchased from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasedNumber {
    pub phone_number: String,
    pub provider_sid: String,
}
