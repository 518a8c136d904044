// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for external collaborators.
//!
//! All adapters use `#[async_trait]` for dynamic dispatch compatibility;
//! the engine holds them as `Arc<dyn ...>` trait objects.

pub mod mailer;
pub mod telephony;

pub use mailer::AlertMailer;
pub use telephony::TelephonyProvider;
