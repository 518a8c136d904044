// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `proxyline-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use proxyline_core::types::{
    ChatMessage, Conversation, ConversationStatus, ConversationSummary, Notification,
    NumberStatus, Participant, PoolNumber,
};
