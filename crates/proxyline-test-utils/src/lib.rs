// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Proxyline integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockTelephony`] - Scripted telephony provider with inventory control,
//!   purchase queue, SMS capture, failure injection, and call counters
//! - [`MockMailer`] - Alert mailer that captures instead of sending
//! - [`TestHarness`] - Temp-dir database wired to a full [`proxyline_relay::RelayEngine`]

pub mod harness;
pub mod mock_mailer;
pub mod mock_telephony;

pub use harness::TestHarness;
pub use mock_mailer::{CapturedAlert, MockMailer};
pub use mock_telephony::{MockTelephony, SentSms};
