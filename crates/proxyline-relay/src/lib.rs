// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation-proxy relay for the Proxyline SMS anonymization service.
//!
//! Builds on `proxyline-pool` (number allocation and reconciliation) and
//! `proxyline-storage` to provide conversation lifecycle, inbound webhook
//! attribution, outbound message batching, and presence-driven SMS flushing,
//! all behind the [`RelayEngine`] facade.

pub mod conversations;
pub mod engine;
pub mod presence;
pub mod relay;

pub use conversations::ConversationManager;
pub use engine::{InboundSms, RelayEngine};
pub use presence::{FlushSummary, PresenceTracker};
pub use relay::{combine_messages, Relay};
