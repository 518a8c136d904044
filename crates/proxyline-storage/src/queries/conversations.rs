// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD, roster persistence, and binding queries.
//!
//! Rosters are stored in `conversation_members` in phone-sorted order; the
//! `position` column preserves the ordering chosen by `Roster::new`, so the
//! member/phone pairing read back is exactly the pairing written.

use std::str::FromStr;

use proxyline_core::ProxylineError;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::database::Database;
use crate::models::{Conversation, ConversationStatus, ConversationSummary, Participant};
use crate::queries::{invalid_text, placeholders};

fn load_conversation(
    conn: &Connection,
    id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    let row = conn
        .query_row(
            "SELECT id, order_id, service_id, proxy_number_id, status, created_at, updated_at
             FROM conversations WHERE id = ?1",
            params![id],
            |row| {
                let status: String = row.get(4)?;
                Ok(Conversation {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    service_id: row.get(2)?,
                    participants: Vec::new(),
                    proxy_number_id: row.get(3)?,
                    status: ConversationStatus::from_str(&status)
                        .map_err(|_| invalid_text(&status, "conversation status"))?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;

    let Some(mut conversation) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id, phone_number FROM conversation_members
         WHERE conversation_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(Participant {
            user_id: row.get(0)?,
            phone_number: row.get(1)?,
        })
    })?;
    for row in rows {
        conversation.participants.push(row?);
    }

    Ok(Some(conversation))
}

fn write_members(
    conn: &Connection,
    conversation_id: &str,
    participants: &[Participant],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM conversation_members WHERE conversation_id = ?1",
        params![conversation_id],
    )?;
    for (position, participant) in participants.iter().enumerate() {
        conn.execute(
            "INSERT INTO conversation_members (conversation_id, user_id, phone_number, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation_id,
                participant.user_id,
                participant.phone_number,
                position as i64,
            ],
        )?;
    }
    Ok(())
}

/// Insert a new conversation together with its roster.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), ProxylineError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (id, order_id, service_id, proxy_number_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    conversation.id,
                    conversation.order_id,
                    conversation.service_id,
                    conversation.proxy_number_id,
                    conversation.status.to_string(),
                    conversation.created_at,
                    conversation.updated_at,
                ],
            )?;
            write_members(&tx, &conversation.id, &conversation.participants)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load a conversation with its roster.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ProxylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| Ok(load_conversation(conn, &id)?))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the conversation for this exact `(order, service, member set)`
/// pairing, regardless of status.
///
/// Member order does not matter; the sets are compared sorted.
pub async fn find_by_exact_members(
    db: &Database,
    order_id: &str,
    service_id: &str,
    member_ids: &[String],
) -> Result<Option<Conversation>, ProxylineError> {
    let order_id = order_id.to_string();
    let service_id = service_id.to_string();
    let mut wanted: Vec<String> = member_ids.to_vec();
    wanted.sort();

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM conversations
                 WHERE order_id = ?1 AND service_id = ?2
                 ORDER BY created_at DESC",
            )?;
            let ids = stmt
                .query_map(params![order_id, service_id], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<rusqlite::Result<Vec<String>>>()?;

            for id in ids {
                if let Some(conversation) = load_conversation(conn, &id)? {
                    let mut members: Vec<String> = conversation
                        .participants
                        .iter()
                        .map(|p| p.user_id.clone())
                        .collect();
                    members.sort();
                    if members == wanted {
                        return Ok(Some(conversation));
                    }
                }
            }
            Ok(None)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Rebind an existing conversation: replace its roster and proxy number and
/// force the status back to open.
pub async fn update_binding(
    db: &Database,
    id: &str,
    participants: &[Participant],
    proxy_number_id: Option<&str>,
) -> Result<(), ProxylineError> {
    let id = id.to_string();
    let participants = participants.to_vec();
    let proxy_number_id = proxy_number_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE conversations SET proxy_number_id = ?1, status = 'open',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![proxy_number_id, id],
            )?;
            write_members(&tx, &id, &participants)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Close every open conversation for an order. Returns the number of rows
/// closed. Bound proxy numbers stay attached for lazy release.
pub async fn close_for_order(db: &Database, order_id: &str) -> Result<usize, ProxylineError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET status = 'closed',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE order_id = ?1 AND status = 'open'",
                params![order_id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The open conversation bound to a proxy number, if any. The partial unique
/// index guarantees at most one row matches.
pub async fn find_open_by_proxy(
    db: &Database,
    proxy_number_id: &str,
) -> Result<Option<Conversation>, ProxylineError> {
    let proxy_number_id = proxy_number_id.to_string();
    db.connection()
        .call(move |conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM conversations
                     WHERE proxy_number_id = ?1 AND status = 'open'",
                    params![proxy_number_id],
                    |row| row.get(0),
                )
                .optional()?;
            match id {
                Some(id) => Ok(load_conversation(conn, &id)?),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All open conversations the user participates in.
pub async fn open_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<Conversation>, ProxylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id FROM conversations c
                 JOIN conversation_members m ON m.conversation_id = c.id
                 WHERE m.user_id = ?1 AND c.status = 'open'
                 ORDER BY c.created_at ASC",
            )?;
            let ids = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;

            let mut conversations = Vec::new();
            for id in ids {
                if let Some(conversation) = load_conversation(conn, &id)? {
                    conversations.push(conversation);
                }
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A closed conversation whose bound number can be released for the given
/// phone set: its roster overlaps the request, the number is still available
/// provider-side, and it is the sole conversation still bound to the number,
/// so releasing leaves no dangling binding.
pub async fn releasable_closed_overlapping(
    db: &Database,
    member_phones: &[String],
) -> Result<Option<Conversation>, ProxylineError> {
    let member_phones = member_phones.to_vec();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT c.id FROM conversations c
                 WHERE c.status = 'closed' AND c.proxy_number_id IS NOT NULL
                   AND EXISTS (
                       SELECT 1 FROM pool_numbers p
                       WHERE p.id = c.proxy_number_id AND p.status = 'available')
                   AND EXISTS (
                       SELECT 1 FROM conversation_members m
                       WHERE m.conversation_id = c.id
                         AND m.phone_number IN ({}))
                   AND NOT EXISTS (
                       SELECT 1 FROM conversations other
                       WHERE other.proxy_number_id = c.proxy_number_id
                         AND other.id != c.id)
                 ORDER BY c.updated_at ASC
                 LIMIT 1",
                placeholders(1, member_phones.len())
            );
            let id: Option<String> = conn
                .query_row(&sql, params_from_iter(member_phones.iter()), |row| {
                    row.get(0)
                })
                .optional()?;
            match id {
                Some(id) => Ok(load_conversation(conn, &id)?),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Detach the proxy number from a conversation (release).
pub async fn release_binding(db: &Database, id: &str) -> Result<(), ProxylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET proxy_number_id = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether rebinding `number_id` to the conversation would conflict: the
/// number serves another open conversation, or another conversation whose
/// roster shares one of the given phone numbers.
pub async fn binding_conflicts(
    db: &Database,
    number_id: &str,
    exclude_conversation_id: &str,
    member_phones: &[String],
) -> Result<bool, ProxylineError> {
    let number_id = number_id.to_string();
    let exclude = exclude_conversation_id.to_string();
    let member_phones = member_phones.to_vec();
    db.connection()
        .call(move |conn| {
            let open_conflict: bool = conn.query_row(
                "SELECT EXISTS (
                     SELECT 1 FROM conversations
                     WHERE proxy_number_id = ?1 AND status = 'open' AND id != ?2)",
                params![number_id, exclude],
                |row| row.get(0),
            )?;
            if open_conflict {
                return Ok(true);
            }

            let sql = format!(
                "SELECT EXISTS (
                     SELECT 1 FROM conversations c
                     JOIN conversation_members m ON m.conversation_id = c.id
                     WHERE c.proxy_number_id = ?1 AND c.id != ?2
                       AND m.phone_number IN ({}))",
                placeholders(3, member_phones.len())
            );
            let mut values: Vec<String> = vec![number_id, exclude];
            values.extend(member_phones);
            let overlap_conflict: bool =
                conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(overlap_conflict)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Compact listings: member ids in roster order plus the latest chat timestamp.
pub async fn summaries(
    db: &Database,
    ids: &[String],
) -> Result<Vec<ConversationSummary>, ProxylineError> {
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let mut result = Vec::new();
            for id in &ids {
                let Some(conversation) = load_conversation(conn, id)? else {
                    continue;
                };
                let last_chat_at: Option<String> = conn.query_row(
                    "SELECT MAX(created_at) FROM messages WHERE conversation_id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                result.push(ConversationSummary {
                    id: conversation.id,
                    members: conversation
                        .participants
                        .iter()
                        .map(|p| p.user_id.clone())
                        .collect(),
                    last_chat_at,
                });
            }
            Ok(result)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{NumberStatus, PoolNumber};
    use crate::queries::pool;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conversations.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn participant(user: &str, phone: &str) -> Participant {
        Participant {
            user_id: user.to_string(),
            phone_number: phone.to_string(),
        }
    }

    pub(crate) fn make_conversation(
        id: &str,
        order: &str,
        participants: Vec<Participant>,
        proxy_number_id: Option<&str>,
        status: ConversationStatus,
    ) -> Conversation {
        Conversation {
            id: id.to_string(),
            order_id: order.to_string(),
            service_id: "svc-1".to_string(),
            participants,
            proxy_number_id: proxy_number_id.map(str::to_string),
            status,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    async fn seed_number(db: &Database, id: &str, phone: &str) {
        pool::insert_number(
            db,
            &PoolNumber {
                id: id.to_string(),
                phone_number: phone.to_string(),
                provider_sid: format!("PN-{id}"),
                status: NumberStatus::Available,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn roster_round_trips_in_position_order() {
        let (db, _dir) = setup_db().await;
        seed_number(&db, "n1", "+15559000").await;

        let convo = make_conversation(
            "c1",
            "order-1",
            vec![
                participant("alice", "555-0100"),
                participant("bob", "555-0200"),
            ],
            Some("n1"),
            ConversationStatus::Open,
        );
        insert_conversation(&db, &convo).await.unwrap();

        let loaded = get_conversation(&db, "c1").await.unwrap().unwrap();
        assert_eq!(loaded.participants.len(), 2);
        assert_eq!(loaded.participants[0].user_id, "alice");
        assert_eq!(loaded.participants[1].phone_number, "555-0200");
        assert_eq!(loaded.proxy_number_id.as_deref(), Some("n1"));
        assert_eq!(loaded.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn two_open_conversations_cannot_share_a_number() {
        let (db, _dir) = setup_db().await;
        seed_number(&db, "n1", "+15559000").await;

        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![participant("alice", "555-0100")],
                Some("n1"),
                ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();

        let result = insert_conversation(
            &db,
            &make_conversation(
                "c2",
                "order-2",
                vec![participant("carol", "555-0300")],
                Some("n1"),
                ConversationStatus::Open,
            ),
        )
        .await;
        assert!(result.is_err(), "partial unique index should reject");

        // A closed second binding is fine.
        insert_conversation(
            &db,
            &make_conversation(
                "c3",
                "order-3",
                vec![participant("dave", "555-0400")],
                Some("n1"),
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn find_by_exact_members_ignores_order_of_ids() {
        let (db, _dir) = setup_db().await;
        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![
                    participant("alice", "555-0100"),
                    participant("bob", "555-0200"),
                ],
                None,
                ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();

        let found = find_by_exact_members(
            &db,
            "order-1",
            "svc-1",
            &["bob".to_string(), "alice".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(found.map(|c| c.id), Some("c1".to_string()));

        // Superset of members does not match.
        let found = find_by_exact_members(
            &db,
            "order-1",
            "svc-1",
            &["alice".to_string(), "bob".to_string(), "carol".to_string()],
        )
        .await
        .unwrap();
        assert!(found.is_none());

        // Different order id does not match.
        let found =
            find_by_exact_members(&db, "order-2", "svc-1", &["alice".to_string()]).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn close_for_order_closes_only_open_rows() {
        let (db, _dir) = setup_db().await;
        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![participant("alice", "555-0100")],
                None,
                ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();
        insert_conversation(
            &db,
            &make_conversation(
                "c2",
                "order-1",
                vec![participant("bob", "555-0200")],
                None,
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();

        let closed = close_for_order(&db, "order-1").await.unwrap();
        assert_eq!(closed, 1);
        let c1 = get_conversation(&db, "c1").await.unwrap().unwrap();
        assert_eq!(c1.status, ConversationStatus::Closed);
    }

    #[tokio::test]
    async fn releasable_requires_overlap_and_sole_binding() {
        let (db, _dir) = setup_db().await;
        seed_number(&db, "n1", "+15559000").await;
        seed_number(&db, "n2", "+15559001").await;

        // Closed, bound to n1, overlapping phone 555-0100, sole binding.
        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![
                    participant("alice", "555-0100"),
                    participant("bob", "555-0200"),
                ],
                Some("n1"),
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();
        // Closed, bound to n2, but n2 is also bound to another closed row.
        insert_conversation(
            &db,
            &make_conversation(
                "c2",
                "order-2",
                vec![participant("alice", "555-0100")],
                Some("n2"),
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();
        insert_conversation(
            &db,
            &make_conversation(
                "c3",
                "order-3",
                vec![participant("dave", "555-0400")],
                Some("n2"),
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();

        let releasable = releasable_closed_overlapping(
            &db,
            &["555-0100".to_string(), "555-0300".to_string()],
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(releasable.id, "c1");
        assert_eq!(releasable.proxy_number_id.as_deref(), Some("n1"));

        // No overlap -> nothing releasable.
        let none =
            releasable_closed_overlapping(&db, &["555-0900".to_string()]).await.unwrap();
        assert!(none.is_none());

        release_binding(&db, "c1").await.unwrap();
        let c1 = get_conversation(&db, "c1").await.unwrap().unwrap();
        assert!(c1.proxy_number_id.is_none());
    }

    #[tokio::test]
    async fn binding_conflicts_detects_open_and_overlap() {
        let (db, _dir) = setup_db().await;
        seed_number(&db, "n1", "+15559000").await;

        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![participant("alice", "555-0100")],
                Some("n1"),
                ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();
        insert_conversation(
            &db,
            &make_conversation(
                "c2",
                "order-2",
                vec![participant("bob", "555-0200")],
                None,
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();

        // n1 serves open c1 -> conflicts for c2.
        assert!(
            binding_conflicts(&db, "n1", "c2", &["555-0200".to_string()]).await.unwrap()
        );
        // From c1's own perspective there is no conflict.
        assert!(
            !binding_conflicts(&db, "n1", "c1", &["555-0100".to_string()]).await.unwrap()
        );
    }

    #[tokio::test]
    async fn update_binding_replaces_roster_and_reopens() {
        let (db, _dir) = setup_db().await;
        seed_number(&db, "n1", "+15559000").await;
        seed_number(&db, "n2", "+15559001").await;

        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![participant("alice", "555-0100")],
                Some("n1"),
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();

        update_binding(
            &db,
            "c1",
            &[
                participant("alice", "555-0101"),
                participant("bob", "555-0200"),
            ],
            Some("n2"),
        )
        .await
        .unwrap();

        let c1 = get_conversation(&db, "c1").await.unwrap().unwrap();
        assert_eq!(c1.status, ConversationStatus::Open);
        assert_eq!(c1.proxy_number_id.as_deref(), Some("n2"));
        assert_eq!(c1.participants.len(), 2);
        assert_eq!(c1.participants[0].phone_number, "555-0101");
    }

    #[tokio::test]
    async fn open_for_user_lists_only_open_memberships() {
        let (db, _dir) = setup_db().await;
        insert_conversation(
            &db,
            &make_conversation(
                "c1",
                "order-1",
                vec![participant("alice", "555-0100")],
                None,
                ConversationStatus::Open,
            ),
        )
        .await
        .unwrap();
        insert_conversation(
            &db,
            &make_conversation(
                "c2",
                "order-2",
                vec![participant("alice", "555-0100")],
                None,
                ConversationStatus::Closed,
            ),
        )
        .await
        .unwrap();

        let open = open_for_user(&db, "alice").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "c1");
        assert!(open_for_user(&db, "nobody").await.unwrap().is_empty());
    }
}
