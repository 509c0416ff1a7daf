// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin accounts and the capability-based permission model.
//!
//! The owner is a configuration value, implicitly all-capable and never
//! stored; every function that answers a permission question takes `owner`
//! explicitly.

use relaypost_core::RelaypostError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{AdminAccount, Capability, CapabilitySet, UserId};

fn capability_column(cap: Capability) -> &'static str {
    match cap {
        Capability::ChangeInterval => "change_interval",
        Capability::ChangePosts => "change_posts",
        Capability::AddAdmin => "add_admin",
        Capability::ManagePayments => "manage_payments",
    }
}

fn admin_from_row(row: &rusqlite::Row<'_>) -> Result<AdminAccount, rusqlite::Error> {
    Ok(AdminAccount {
        user_id: UserId(row.get(0)?),
        added_at: row.get(1)?,
        added_by: row.get::<_, Option<i64>>(2)?.map(UserId),
        capabilities: CapabilitySet {
            change_interval: row.get(3)?,
            change_posts: row.get(4)?,
            add_admin: row.get(5)?,
            manage_payments: row.get(6)?,
        },
    })
}

/// Add an admin account with default capabilities.
///
/// Re-adding an existing admin keeps its current permissions and returns
/// `false`.
pub async fn add_admin(
    db: &Database,
    user: UserId,
    added_by: Option<UserId>,
    now: i64,
) -> Result<bool, RelaypostError> {
    let defaults = CapabilitySet::default();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO admins
                   (user_id, added_at, added_by, change_interval, change_posts,
                    add_admin, manage_payments)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.0,
                    now,
                    added_by.map(|u| u.0),
                    defaults.change_interval,
                    defaults.change_posts,
                    defaults.add_admin,
                    defaults.manage_payments,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Remove an admin account.
pub async fn remove_admin(db: &Database, user: UserId) -> Result<bool, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM admins WHERE user_id = ?1", params![user.0])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a stored admin account.
pub async fn get_admin(db: &Database, user: UserId) -> Result<Option<AdminAccount>, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, added_at, added_by, change_interval, change_posts,
                        add_admin, manage_payments
                 FROM admins WHERE user_id = ?1",
            )?;
            match stmt.query_row(params![user.0], admin_from_row) {
                Ok(admin) => Ok(Some(admin)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All stored admin user ids.
pub async fn list_admins(db: &Database) -> Result<Vec<UserId>, RelaypostError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM admins ORDER BY user_id ASC")?;
            let rows = stmt.query_map([], |row| Ok(UserId(row.get(0)?)))?;
            let mut admins = Vec::new();
            for row in rows {
                admins.push(row?);
            }
            Ok(admins)
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle a single capability on a stored admin account.
///
/// Returns `false` if the user is not a stored admin.
pub async fn set_capability(
    db: &Database,
    user: UserId,
    cap: Capability,
    value: bool,
) -> Result<bool, RelaypostError> {
    // The column name comes from a closed enum, never from input.
    let sql = format!(
        "UPDATE admins SET {} = ?1 WHERE user_id = ?2",
        capability_column(cap)
    );
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(&sql, params![value, user.0])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether `user` holds `cap`. The owner always does.
pub async fn check_capability(
    db: &Database,
    owner: UserId,
    user: UserId,
    cap: Capability,
) -> Result<bool, RelaypostError> {
    if user == owner {
        return Ok(true);
    }
    Ok(get_admin(db, user)
        .await?
        .is_some_and(|admin| admin.capabilities.get(cap)))
}

/// The owner plus every stored admin holding `cap`, owner first,
/// deduplicated.
pub async fn list_with_capability(
    db: &Database,
    owner: UserId,
    cap: Capability,
) -> Result<Vec<UserId>, RelaypostError> {
    let sql = format!(
        "SELECT user_id FROM admins WHERE {} = 1 ORDER BY user_id ASC",
        capability_column(cap)
    );
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| Ok(UserId(row.get(0)?)))?;
            let mut holders = vec![owner];
            for row in rows {
                let user = row?;
                if user != owner {
                    holders.push(user);
                }
            }
            Ok(holders)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether `user` is the owner or a stored admin.
pub async fn is_admin(db: &Database, owner: UserId, user: UserId) -> Result<bool, RelaypostError> {
    if user == owner {
        return Ok(true);
    }
    Ok(get_admin(db, user).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const OWNER: UserId = UserId(1);

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn new_admin_gets_default_capabilities() {
        let (db, _dir) = setup_db().await;
        let admin = UserId(42);

        assert!(add_admin(&db, admin, Some(OWNER), 100).await.unwrap());

        assert!(check_capability(&db, OWNER, admin, Capability::ManagePayments)
            .await
            .unwrap());
        assert!(!check_capability(&db, OWNER, admin, Capability::ChangeInterval)
            .await
            .unwrap());
        assert!(!check_capability(&db, OWNER, admin, Capability::ChangePosts)
            .await
            .unwrap());
        assert!(!check_capability(&db, OWNER, admin, Capability::AddAdmin)
            .await
            .unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn readd_keeps_existing_permissions() {
        let (db, _dir) = setup_db().await;
        let admin = UserId(42);

        add_admin(&db, admin, None, 100).await.unwrap();
        set_capability(&db, admin, Capability::ChangeInterval, true)
            .await
            .unwrap();

        // Second add is a no-op, not a reset.
        assert!(!add_admin(&db, admin, None, 200).await.unwrap());
        assert!(check_capability(&db, OWNER, admin, Capability::ChangeInterval)
            .await
            .unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn owner_is_always_capable_without_a_record() {
        let (db, _dir) = setup_db().await;
        for cap in Capability::ALL {
            assert!(check_capability(&db, OWNER, OWNER, cap).await.unwrap());
        }
        assert!(is_admin(&db, OWNER, OWNER).await.unwrap());
        assert!(get_admin(&db, OWNER).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_admin_has_no_capabilities() {
        let (db, _dir) = setup_db().await;
        let stranger = UserId(99);
        for cap in Capability::ALL {
            assert!(!check_capability(&db, OWNER, stranger, cap).await.unwrap());
        }
        assert!(!is_admin(&db, OWNER, stranger).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_with_capability_includes_owner_once() {
        let (db, _dir) = setup_db().await;
        add_admin(&db, UserId(42), None, 100).await.unwrap();
        add_admin(&db, UserId(43), None, 100).await.unwrap();
        set_capability(&db, UserId(43), Capability::ManagePayments, false)
            .await
            .unwrap();

        let holders = list_with_capability(&db, OWNER, Capability::ManagePayments)
            .await
            .unwrap();
        assert_eq!(holders, vec![OWNER, UserId(42)]);

        // Owner listed exactly once even if a stray row for the owner exists.
        add_admin(&db, OWNER, None, 100).await.unwrap();
        let holders = list_with_capability(&db, OWNER, Capability::ManagePayments)
            .await
            .unwrap();
        assert_eq!(holders.iter().filter(|u| **u == OWNER).count(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_admin_revokes_everything() {
        let (db, _dir) = setup_db().await;
        let admin = UserId(42);
        add_admin(&db, admin, None, 100).await.unwrap();

        assert!(remove_admin(&db, admin).await.unwrap());
        assert!(!is_admin(&db, OWNER, admin).await.unwrap());
        assert!(!check_capability(&db, OWNER, admin, Capability::ManagePayments)
            .await
            .unwrap());
        assert!(!remove_admin(&db, admin).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_capability_on_unknown_user_is_rejected() {
        let (db, _dir) = setup_db().await;
        assert!(!set_capability(&db, UserId(1234), Capability::AddAdmin, true)
            .await
            .unwrap());
        db.close().await.unwrap();
    }
}
