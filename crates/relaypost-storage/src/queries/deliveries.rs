// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery history operations. Append-only.

use relaypost_core::RelaypostError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::DestinationId;

/// Record that an item was delivered to a destination.
///
/// The (destination, item) pair is the primary key; re-recording an existing
/// pair is ignored so interleaved runs cannot corrupt the history.
pub async fn record_delivery(
    db: &Database,
    destination: DestinationId,
    item_id: i64,
    now: i64,
) -> Result<(), RelaypostError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO deliveries (destination_id, item_id, delivered_at)
                 VALUES (?1, ?2, ?3)",
                params![destination.0, item_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a delivery record exists for the pair.
pub async fn has_delivery(
    db: &Database,
    destination: DestinationId,
    item_id: i64,
) -> Result<bool, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM deliveries WHERE destination_id = ?1 AND item_id = ?2",
                params![destination.0, item_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of deliveries recorded for a destination.
pub async fn count_for_destination(
    db: &Database,
    destination: DestinationId,
) -> Result<i64, RelaypostError> {
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM deliveries WHERE destination_id = ?1",
                params![destination.0],
                |row| row.get(0),
            )?)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn record_and_count() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let dest = DestinationId(-1001);

        record_delivery(&db, dest, 1, 100).await.unwrap();
        record_delivery(&db, dest, 2, 101).await.unwrap();
        // Duplicate pair is a no-op.
        record_delivery(&db, dest, 1, 102).await.unwrap();

        assert_eq!(count_for_destination(&db, dest).await.unwrap(), 2);
        assert!(has_delivery(&db, dest, 1).await.unwrap());
        assert!(!has_delivery(&db, dest, 3).await.unwrap());
        assert!(!has_delivery(&db, DestinationId(-1002), 1).await.unwrap());

        db.close().await.unwrap();
    }
}
