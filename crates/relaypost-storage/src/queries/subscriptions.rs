// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription lifecycle operations.
//!
//! State machine: pending --approve--> active, pending --reject--> deleted,
//! active --expiry sweep--> expired. Activation always resets the expiry
//! window from approval time.

use std::str::FromStr;

use relaypost_core::RelaypostError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{DestinationId, PlanKind, Subscription, SubscriptionStatus, UserId};

const COLUMNS: &str = "id, owner_user_id, destination_id, plan_kind, payment_method, \
                       payment_details, status, created_at, expires_at";

fn sub_from_row(row: &rusqlite::Row<'_>) -> Result<Subscription, rusqlite::Error> {
    let plan_raw: String = row.get(3)?;
    let status_raw: String = row.get(6)?;
    let plan_kind = PlanKind::from_str(&plan_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status = SubscriptionStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Subscription {
        id: row.get(0)?,
        owner_user_id: UserId(row.get(1)?),
        destination_id: DestinationId(row.get(2)?),
        plan_kind,
        payment_method: row.get(4)?,
        payment_details: row.get(5)?,
        status,
        created_at: row.get(7)?,
        expires_at: row.get(8)?,
    })
}

/// Create a pending subscription from a completed onboarding flow.
///
/// Returns the new subscription id.
#[allow(clippy::too_many_arguments)]
pub async fn create_pending(
    db: &Database,
    owner: UserId,
    destination: DestinationId,
    plan: PlanKind,
    payment_method: Option<String>,
    payment_details: Option<String>,
    now: i64,
) -> Result<i64, RelaypostError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO subscriptions
                   (owner_user_id, destination_id, plan_kind, payment_method,
                    payment_details, status, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, NULL)",
                params![
                    owner.0,
                    destination.0,
                    plan.to_string(),
                    payment_method,
                    payment_details,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a subscription by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<Subscription>, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM subscriptions WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], sub_from_row) {
                Ok(sub) => Ok(Some(sub)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Approve a subscription.
///
/// Sets status to active and resets the expiry window to `now +
/// duration_days`, even if the subscription was already active. Returns
/// `false` if no such subscription exists.
pub async fn activate(
    db: &Database,
    id: i64,
    duration_days: i64,
    now: i64,
) -> Result<bool, RelaypostError> {
    let expires_at = now + duration_days * 86_400;
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscriptions
                 SET status = 'active', created_at = ?1, expires_at = ?2
                 WHERE id = ?3",
                params![now, expires_at, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Reject a subscription: the record is deleted entirely.
pub async fn reject(db: &Database, id: i64) -> Result<bool, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All active subscriptions, in creation order.
pub async fn list_active(db: &Database) -> Result<Vec<Subscription>, RelaypostError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM subscriptions WHERE status = 'active' ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], sub_from_row)?;
            let mut subs = Vec::new();
            for row in rows {
                subs.push(row?);
            }
            Ok(subs)
        })
        .await
        .map_err(map_tr_err)
}

/// All subscriptions owned by a user, in creation order.
pub async fn list_for_owner(
    db: &Database,
    owner: UserId,
) -> Result<Vec<Subscription>, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM subscriptions WHERE owner_user_id = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![owner.0], sub_from_row)?;
            let mut subs = Vec::new();
            for row in rows {
                subs.push(row?);
            }
            Ok(subs)
        })
        .await
        .map_err(map_tr_err)
}

/// Set-based expiry sweep: every active subscription whose window has
/// elapsed becomes expired. Idempotent; safe to run arbitrarily often.
/// Returns the number of rows transitioned.
pub async fn expire_due(db: &Database, now: i64) -> Result<u64, RelaypostError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscriptions SET status = 'expired'
                 WHERE status = 'active' AND expires_at < ?1",
                params![now],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}
