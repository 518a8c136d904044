// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a temp-dir SQLite database, mock telephony provider,
//! and mock mailer to a fully assembled [`RelayEngine`].

use std::sync::Arc;

use tempfile::TempDir;

use proxyline_config::ProxylineConfig;
use proxyline_relay::RelayEngine;
use proxyline_storage::Database;

use crate::mock_mailer::MockMailer;
use crate::mock_telephony::MockTelephony;

/// Everything an integration test needs, torn down with the value.
pub struct TestHarness {
    pub db: Database,
    pub provider: Arc<MockTelephony>,
    pub mailer: Arc<MockMailer>,
    pub engine: RelayEngine,
    pub config: ProxylineConfig,
    _dir: TempDir,
}

impl TestHarness {
    /// Harness with test-friendly defaults: pool cap 5, one-second
    /// inactivity window.
    pub async fn new() -> Self {
        let mut config = ProxylineConfig::default();
        config.pool.max_numbers = 5;
        config.relay.inactivity_window_secs = 1;
        Self::with_config(config).await
    }

    /// Harness with an explicit configuration.
    pub async fn with_config(config: ProxylineConfig) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("harness.db");
        let db = Database::open(path.to_str().expect("utf-8 temp path"))
            .await
            .expect("open harness database");

        let provider = Arc::new(MockTelephony::new());
        let mailer = Arc::new(MockMailer::new());
        let engine = RelayEngine::new(&config, db.clone(), provider.clone(), mailer.clone());

        Self {
            db,
            provider,
            mailer,
            engine,
            config,
            _dir: dir,
        }
    }
}
