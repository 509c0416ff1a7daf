// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content pool operations: idempotent indexing, the undelivered-item
//! query, and bulk clear.

use std::str::FromStr;

use relaypost_core::RelaypostError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{ContentItem, DestinationId, IndexCandidate, MediaKind};

fn item_from_row(row: &rusqlite::Row<'_>) -> Result<ContentItem, rusqlite::Error> {
    let kind_raw: String = row.get(3)?;
    let media_kind = MediaKind::from_str(&kind_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ContentItem {
        id: row.get(0)?,
        natural_key: row.get(1)?,
        display_name: row.get(2)?,
        media_kind,
        sequence_marker: row.get(4)?,
    })
}

/// Insert a new content item.
///
/// Returns `false` without error when the natural key is already indexed
/// (duplicate-item is not a failure, just a no-op).
pub async fn insert_item(db: &Database, candidate: &IndexCandidate) -> Result<bool, RelaypostError> {
    let candidate = candidate.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO content_items (natural_key, display_name, media_kind, sequence_marker)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    candidate.natural_key,
                    candidate.display_name,
                    candidate.media_kind.to_string(),
                    candidate.sequence_marker,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The next-item query backing the distribution engine.
///
/// Returns the lowest-`sequence_marker` item with no delivery record for
/// this destination, or `None` when the pool is exhausted for it.
pub async fn next_undelivered(
    db: &Database,
    destination: DestinationId,
) -> Result<Option<ContentItem>, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, natural_key, display_name, media_kind, sequence_marker
                 FROM content_items
                 WHERE id NOT IN (SELECT item_id FROM deliveries WHERE destination_id = ?1)
                 ORDER BY sequence_marker ASC
                 LIMIT 1",
            )?;
            let result = stmt.query_row(params![destination.0], item_from_row);
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Number of items currently in the pool.
pub async fn count_items(db: &Database) -> Result<i64, RelaypostError> {
    db.connection()
        .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM content_items", [], |row| row.get(0))?))
        .await
        .map_err(map_tr_err)
}

/// Bulk clear of the content pool. Returns the number of removed items.
pub async fn clear_items(db: &Database) -> Result<u64, RelaypostError> {
    db.connection()
        .call(|conn| {
            let removed = conn.execute("DELETE FROM content_items", [])?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}
