// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unread notification markers, one row per user.

use proxyline_core::ProxylineError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::Notification;

/// Upsert the user's notification marker. Last write wins.
pub async fn upsert_notification(
    db: &Database,
    user_id: &str,
    seen: bool,
) -> Result<(), ProxylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notifications (user_id, seen, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT (user_id) DO UPDATE SET
                     seen = excluded.seen,
                     updated_at = excluded.updated_at",
                params![user_id, seen as i64],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The user's notification marker, if one was ever written.
pub async fn get_notification(
    db: &Database,
    user_id: &str,
) -> Result<Option<Notification>, ProxylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, seen, updated_at FROM notifications WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(Notification {
                            user_id: row.get(0)?,
                            seen: row.get::<_, i64>(1)? != 0,
                            updated_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn upsert_keeps_one_row_per_user() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notifications.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        upsert_notification(&db, "alice", false).await.unwrap();
        upsert_notification(&db, "alice", true).await.unwrap();
        upsert_notification(&db, "alice", false).await.unwrap();

        let marker = get_notification(&db, "alice").await.unwrap().unwrap();
        assert!(!marker.seen, "last write wins");

        let count: i64 = db
            .connection()
            .call(|conn| {
                Ok::<_, rusqlite::Error>(
                    conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?,
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        assert!(get_notification(&db, "bob").await.unwrap().is_none());
    }
}
