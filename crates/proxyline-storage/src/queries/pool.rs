// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pool number CRUD and allocation-candidate queries.

use std::str::FromStr;

use proxyline_core::ProxylineError;
use rusqlite::{params, params_from_iter};

use crate::database::Database;
use crate::models::{NumberStatus, PoolNumber};
use crate::queries::{invalid_text, placeholders};

fn map_pool_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PoolNumber> {
    let status: String = row.get(3)?;
    Ok(PoolNumber {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        provider_sid: row.get(2)?,
        status: NumberStatus::from_str(&status)
            .map_err(|_| invalid_text(&status, "number status"))?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const POOL_COLUMNS: &str = "id, phone_number, provider_sid, status, created_at, updated_at";

/// Insert a new pool number.
pub async fn insert_number(db: &Database, number: &PoolNumber) -> Result<(), ProxylineError> {
    let number = number.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO pool_numbers (id, phone_number, provider_sid, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    number.id,
                    number.phone_number,
                    number.provider_sid,
                    number.status.to_string(),
                    number.created_at,
                    number.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All pool numbers ordered by phone number.
pub async fn list_numbers(db: &Database) -> Result<Vec<PoolNumber>, ProxylineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POOL_COLUMNS} FROM pool_numbers ORDER BY phone_number ASC"
            ))?;
            let rows = stmt.query_map([], map_pool_row)?;
            let mut numbers = Vec::new();
            for row in rows {
                numbers.push(row?);
            }
            Ok(numbers)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a pool number by its phone number string.
pub async fn get_by_phone(
    db: &Database,
    phone_number: &str,
) -> Result<Option<PoolNumber>, ProxylineError> {
    let phone_number = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POOL_COLUMNS} FROM pool_numbers WHERE phone_number = ?1"
            ))?;
            let mut rows = stmt.query_map(params![phone_number], map_pool_row)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a pool number by id.
pub async fn get_by_id(db: &Database, id: &str) -> Result<Option<PoolNumber>, ProxylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POOL_COLUMNS} FROM pool_numbers WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_pool_row)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip a pool number's availability status.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: NumberStatus,
) -> Result<(), ProxylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE pool_numbers SET status = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![status.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Total pool size, regardless of status.
pub async fn count_numbers(db: &Database) -> Result<usize, ProxylineError> {
    db.connection()
        .call(move |conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM pool_numbers", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Allocation candidates for a conversation over the given real phone numbers.
///
/// A number qualifies when it is `available`, serves no open conversation,
/// and is not bound to any conversation -- open or closed -- whose roster
/// shares a phone number with the request. Requests overlapping a closed
/// binding go through the release path instead, so a participant never holds
/// the same proxy number against two different counterpart histories.
pub async fn available_unbound_numbers(
    db: &Database,
    member_phones: &[String],
) -> Result<Vec<PoolNumber>, ProxylineError> {
    let member_phones = member_phones.to_vec();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {POOL_COLUMNS} FROM pool_numbers p
                 WHERE p.status = 'available'
                   AND NOT EXISTS (
                       SELECT 1 FROM conversations c
                       WHERE c.proxy_number_id = p.id AND c.status = 'open')
                   AND NOT EXISTS (
                       SELECT 1 FROM conversations c
                       JOIN conversation_members m ON m.conversation_id = c.id
                       WHERE c.proxy_number_id = p.id
                         AND m.phone_number IN ({}))
                 ORDER BY p.phone_number ASC",
                placeholders(1, member_phones.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(member_phones.iter()), map_pool_row)?;
            let mut numbers = Vec::new();
            for row in rows {
                numbers.push(row?);
            }
            Ok(numbers)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn make_number(id: &str, phone: &str, status: NumberStatus) -> PoolNumber {
        PoolNumber {
            id: id.to_string(),
            phone_number: phone.to_string(),
            provider_sid: format!("PN-{id}"),
            status,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn insert_and_list_in_phone_order() {
        let (db, _dir) = setup_db().await;

        insert_number(&db, &make_number("n2", "+15550200", NumberStatus::Available))
            .await
            .unwrap();
        insert_number(&db, &make_number("n1", "+15550100", NumberStatus::Unavailable))
            .await
            .unwrap();

        let numbers = list_numbers(&db).await.unwrap();
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].phone_number, "+15550100");
        assert_eq!(numbers[0].status, NumberStatus::Unavailable);
        assert_eq!(numbers[1].phone_number, "+15550200");
    }

    #[tokio::test]
    async fn duplicate_phone_number_is_rejected() {
        let (db, _dir) = setup_db().await;

        insert_number(&db, &make_number("n1", "+15550100", NumberStatus::Available))
            .await
            .unwrap();
        let result =
            insert_number(&db, &make_number("n2", "+15550100", NumberStatus::Available)).await;
        assert!(result.is_err(), "UNIQUE(phone_number) should reject");
    }

    #[tokio::test]
    async fn get_by_phone_and_id() {
        let (db, _dir) = setup_db().await;
        insert_number(&db, &make_number("n1", "+15550100", NumberStatus::Available))
            .await
            .unwrap();

        let by_phone = get_by_phone(&db, "+15550100").await.unwrap().unwrap();
        assert_eq!(by_phone.id, "n1");
        let by_id = get_by_id(&db, "n1").await.unwrap().unwrap();
        assert_eq!(by_id.phone_number, "+15550100");

        assert!(get_by_phone(&db, "+15559999").await.unwrap().is_none());
        assert!(get_by_id(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_status_flips_and_touches_updated_at() {
        let (db, _dir) = setup_db().await;
        insert_number(&db, &make_number("n1", "+15550100", NumberStatus::Available))
            .await
            .unwrap();

        set_status(&db, "n1", NumberStatus::Unavailable).await.unwrap();
        let number = get_by_id(&db, "n1").await.unwrap().unwrap();
        assert_eq!(number.status, NumberStatus::Unavailable);
        assert_ne!(number.updated_at, "2026-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn count_includes_all_statuses() {
        let (db, _dir) = setup_db().await;
        insert_number(&db, &make_number("n1", "+15550100", NumberStatus::Available))
            .await
            .unwrap();
        insert_number(&db, &make_number("n2", "+15550200", NumberStatus::Unavailable))
            .await
            .unwrap();
        assert_eq!(count_numbers(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unavailable_numbers_are_not_allocation_candidates() {
        let (db, _dir) = setup_db().await;
        insert_number(&db, &make_number("n1", "+15550100", NumberStatus::Unavailable))
            .await
            .unwrap();
        insert_number(&db, &make_number("n2", "+15550200", NumberStatus::Available))
            .await
            .unwrap();

        let candidates =
            available_unbound_numbers(&db, &["555-0001".to_string()]).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "n2");
    }
}
