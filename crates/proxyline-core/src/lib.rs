// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Proxyline SMS relay.
//!
//! This crate provides the shared error type, the domain model (proxy
//! numbers, conversations, chat messages, notifications, rosters), and the
//! adapter traits implemented by the telephony and mail crates. All other
//! workspace crates depend on it.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ProxylineError;
pub use traits::{AlertMailer, TelephonyProvider};
pub use types::{
    ChatMessage, Conversation, ConversationStatus, ConversationSummary, Notification,
    NumberStatus, OwnedNumber, Participant, PoolNumber, PurchasedNumber, Roster,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_traits_are_object_safe() {
        // The engine holds adapters as trait objects; this fails to compile
        // if either trait loses object safety.
        fn _telephony(_: &dyn TelephonyProvider) {}
        fn _mailer(_: &dyn AlertMailer) {}
    }

    #[test]
    fn key_types_are_exported_at_crate_root() {
        let _ = NumberStatus::Available;
        let _ = ConversationStatus::Open;
        let roster = Roster::new(vec![("u-1".into(), "555-0100".into())]).unwrap();
        assert_eq!(roster.len(), 1);
    }
}
