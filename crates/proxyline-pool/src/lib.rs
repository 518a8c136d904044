// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proxy number pool management: reconciliation against the provider's
//! inventory and allocation of numbers to conversations.

pub mod allocator;
pub mod reconciler;

pub use allocator::Allocator;
pub use reconciler::{Reconciler, SyncReport};
