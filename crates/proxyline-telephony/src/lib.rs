// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio-compatible telephony provider adapter for Proxyline.
//!
//! Implements [`proxyline_core::TelephonyProvider`] over the provider's REST
//! API: inventory listing, purchasable-number search, number purchase, and
//! SMS send.

pub mod client;
pub mod types;

pub use client::TwilioClient;
