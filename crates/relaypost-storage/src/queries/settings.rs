// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Singleton settings row: reads, field-level patches, and the engine's
//! `last_run_at` write.

use relaypost_core::RelaypostError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{Settings, SettingsPatch};

/// Read the settings singleton. The row is seeded by the initial migration.
pub async fn get_settings(db: &Database) -> Result<Settings, RelaypostError> {
    db.connection()
        .call(|conn| {
            Ok(conn.query_row(
                "SELECT interval_hours, items_per_run, delete_after_deliver, auto_index,
                        last_run_at
                 FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(Settings {
                        interval_hours: row.get(0)?,
                        items_per_run: row.get(1)?,
                        delete_after_deliver: row.get(2)?,
                        auto_index: row.get(3)?,
                        last_run_at: row.get(4)?,
                    })
                },
            )?)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a partial update. Fields left `None` are unchanged; an empty patch
/// is a no-op. `last_run_at` is deliberately not patchable here.
pub async fn apply_patch(db: &Database, patch: &SettingsPatch) -> Result<(), RelaypostError> {
    if patch.is_empty() {
        return Ok(());
    }
    let patch = patch.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE settings SET
                   interval_hours       = COALESCE(?1, interval_hours),
                   items_per_run        = COALESCE(?2, items_per_run),
                   delete_after_deliver = COALESCE(?3, delete_after_deliver),
                   auto_index           = COALESCE(?4, auto_index)
                 WHERE id = 1",
                params![
                    patch.interval_hours,
                    patch.items_per_run,
                    patch.delete_after_deliver,
                    patch.auto_index,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record the completion time of a distribution run.
///
/// Only the distribution engine calls this, exactly once per completed run.
pub async fn set_last_run(db: &Database, now: i64) -> Result<(), RelaypostError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE settings SET last_run_at = ?1 WHERE id = 1",
                params![now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn defaults_match_migration_seed() {
        let (db, _dir) = setup_db().await;
        let settings = get_settings(&db).await.unwrap();
        assert_eq!(settings, Settings::default());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn patch_updates_only_named_fields() {
        let (db, _dir) = setup_db().await;

        apply_patch(
            &db,
            &SettingsPatch {
                interval_hours: Some(6.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = get_settings(&db).await.unwrap();
        assert_eq!(settings.interval_hours, 6.0);
        assert_eq!(settings.items_per_run, 1);
        assert!(settings.auto_index);

        apply_patch(
            &db,
            &SettingsPatch {
                items_per_run: Some(5),
                delete_after_deliver: Some(true),
                auto_index: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = get_settings(&db).await.unwrap();
        assert_eq!(settings.interval_hours, 6.0);
        assert_eq!(settings.items_per_run, 5);
        assert!(settings.delete_after_deliver);
        assert!(!settings.auto_index);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_patch_is_noop() {
        let (db, _dir) = setup_db().await;
        apply_patch(&db, &SettingsPatch::default()).await.unwrap();
        assert_eq!(get_settings(&db).await.unwrap(), Settings::default());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn last_run_is_separate_from_patches() {
        let (db, _dir) = setup_db().await;

        set_last_run(&db, 123_456).await.unwrap();
        apply_patch(
            &db,
            &SettingsPatch {
                interval_hours: Some(1.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = get_settings(&db).await.unwrap();
        assert_eq!(settings.last_run_at, 123_456);

        db.close().await.unwrap();
    }
}
