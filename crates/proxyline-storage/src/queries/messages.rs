// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message CRUD operations.

use proxyline_core::ProxylineError;
use rusqlite::{params, params_from_iter};

use crate::database::Database;
use crate::models::ChatMessage;
use crate::queries::placeholders;

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        body: row.get(3)?,
        seen: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, seen, created_at";

/// Insert a new chat message.
pub async fn insert_message(db: &Database, msg: &ChatMessage) -> Result<(), ProxylineError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, body, seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.sender_id,
                    msg.body,
                    msg.seen as i64,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A page of messages in creation order.
///
/// `before` bounds the page to messages strictly older than the given
/// timestamp; the newest `limit` of those are returned, oldest first.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
    before: Option<&str>,
    limit: i64,
) -> Result<Vec<ChatMessage>, ProxylineError> {
    let conversation_id = conversation_id.to_string();
    let before = before.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut messages = match before {
                Some(before) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE conversation_id = ?1 AND created_at < ?2
                         ORDER BY created_at DESC LIMIT ?3"
                    ))?;
                    let rows =
                        stmt.query_map(params![conversation_id, before, limit], map_message_row)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY created_at DESC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![conversation_id, limit], map_message_row)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Unseen messages addressed to `receiver_id` (i.e. sent by someone else),
/// oldest first -- the batch the presence trigger flushes as one SMS.
pub async fn unseen_for_receiver(
    db: &Database,
    conversation_id: &str,
    receiver_id: &str,
) -> Result<Vec<ChatMessage>, ProxylineError> {
    let conversation_id = conversation_id.to_string();
    let receiver_id = receiver_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND seen = 0
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id, receiver_id], map_message_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip the `seen` flag on a batch of messages.
pub async fn mark_seen(db: &Database, ids: &[String]) -> Result<(), ProxylineError> {
    if ids.is_empty() {
        return Ok(());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "UPDATE messages SET seen = 1 WHERE id IN ({})",
                placeholders(1, ids.len())
            );
            conn.execute(&sql, params_from_iter(ids.iter()))?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, sender: &str, body: &str, timestamp: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            conversation_id: "c-1".to_string(),
            sender_id: sender.to_string(),
            body: body.to_string(),
            seen: false,
            created_at: timestamp.to_string(),
        }
    }

    #[tokio::test]
    async fn list_returns_creation_order() {
        let (db, _dir) = setup_db().await;
        // FK on messages.conversation_id requires the conversation row.
        crate::queries::conversations::insert_conversation(
            &db,
            &crate::queries::conversations::tests::make_conversation(
                "c-1",
                "order-1",
                vec![],
                None,
                crate::models::ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();

        for (id, ts) in [
            ("m2", "2026-01-01T00:00:02.000Z"),
            ("m1", "2026-01-01T00:00:01.000Z"),
            ("m3", "2026-01-01T00:00:03.000Z"),
        ] {
            insert_message(&db, &make_msg(id, "alice", "hi", ts)).await.unwrap();
        }

        let messages = list_messages(&db, "c-1", None, 10).await.unwrap();
        assert_eq!(
            messages.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2", "m3"]
        );

        // Paging: the two newest before m3, oldest first.
        let page = list_messages(&db, "c-1", Some("2026-01-01T00:00:03.000Z"), 2)
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
    }

    #[tokio::test]
    async fn unseen_for_receiver_excludes_own_and_seen_messages() {
        let (db, _dir) = setup_db().await;
        crate::queries::conversations::insert_conversation(
            &db,
            &crate::queries::conversations::tests::make_conversation(
                "c-1",
                "order-1",
                vec![],
                None,
                crate::models::ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();

        insert_message(&db, &make_msg("m1", "alice", "one", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        insert_message(&db, &make_msg("m2", "bob", "own", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();
        insert_message(&db, &make_msg("m3", "alice", "two", "2026-01-01T00:00:03.000Z"))
            .await
            .unwrap();

        let unseen = unseen_for_receiver(&db, "c-1", "bob").await.unwrap();
        assert_eq!(
            unseen.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m3"]
        );

        mark_seen(&db, &["m1".to_string()]).await.unwrap();
        let unseen = unseen_for_receiver(&db, "c-1", "bob").await.unwrap();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].id, "m3");
    }

    #[tokio::test]
    async fn mark_seen_with_empty_batch_is_a_noop() {
        let (db, _dir) = setup_db().await;
        mark_seen(&db, &[]).await.unwrap();
    }
}
