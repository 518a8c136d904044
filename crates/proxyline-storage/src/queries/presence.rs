// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inactivity deadlines for the presence sweeper.
//!
//! Each row is one user's "flush pending messages at this time" deadline.
//! New chat activity re-arms the deadline; the sweeper consumes users whose
//! deadline has passed.

use proxyline_core::ProxylineError;
use rusqlite::params;

use crate::database::Database;

/// Arm (or re-arm) the user's inactivity deadline.
pub async fn arm(db: &Database, user_id: &str, inactive_at: &str) -> Result<(), ProxylineError> {
    let user_id = user_id.to_string();
    let inactive_at = inactive_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO presence (user_id, inactive_at) VALUES (?1, ?2)
                 ON CONFLICT (user_id) DO UPDATE SET inactive_at = excluded.inactive_at",
                params![user_id, inactive_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Drop the user's deadline (after a flush).
pub async fn disarm(db: &Database, user_id: &str) -> Result<(), ProxylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM presence WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Users whose deadline is at or before `now`, oldest deadline first.
pub async fn due(db: &Database, now: &str) -> Result<Vec<String>, ProxylineError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM presence WHERE inactive_at <= ?1
                 ORDER BY inactive_at ASC",
            )?;
            let rows = stmt.query_map(params![now], |row| row.get::<_, String>(0))?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
