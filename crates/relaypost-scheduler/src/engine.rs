// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The distribution engine.
//!
//! A periodic timer polls [`Engine::tick`]; the gate decides whether a run
//! happens. Within a run, destinations are processed in listing order and
//! items in ascending sequence order. Every per-destination and per-item
//! failure is contained inside the run: the pass always completes and
//! `last_run_at` is always written exactly once at the end.

use std::sync::Arc;
use std::time::Duration;

use relaypost_core::{DispatchError, RelaypostError, Settings, Subscription, Transport};
use relaypost_storage::queries::{content, deliveries, settings, subscriptions};
use relaypost_storage::Database;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Courtesy delay between consecutive dispatches to one destination.
const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_secs(2);

/// Outcome of a single engine poll.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The configured interval has not elapsed. No side effects.
    GateMiss,
    /// A prior run is still in flight. No side effects.
    Busy,
    /// A full pass completed and `last_run_at` was advanced.
    Completed(RunReport),
}

/// Per-run delivery accounting.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Active subscriptions processed.
    pub destinations: usize,
    /// Delivery records created.
    pub delivered: u64,
    /// Destinations that ran out of undelivered items.
    pub exhausted: usize,
    /// Destinations aborted by an authorization denial.
    pub denied: usize,
    /// Destinations aborted by any other dispatch or storage failure.
    pub failed: usize,
}

/// How one destination's batch ended.
enum BatchEnd {
    Drained,
    Exhausted,
    Denied,
    Failed,
}

/// The interval-gated batch distribution job.
pub struct Engine {
    db: Arc<Database>,
    transport: Arc<dyn Transport>,
    /// Serializes whole runs; a poll that finds it held is a no-op.
    run_lock: Mutex<()>,
    dispatch_delay: Duration,
}

impl Engine {
    pub fn new(db: Arc<Database>, transport: Arc<dyn Transport>) -> Self {
        Self::with_dispatch_delay(db, transport, DEFAULT_DISPATCH_DELAY)
    }

    pub fn with_dispatch_delay(
        db: Arc<Database>,
        transport: Arc<dyn Transport>,
        dispatch_delay: Duration,
    ) -> Self {
        Self {
            db,
            transport,
            run_lock: Mutex::new(()),
            dispatch_delay,
        }
    }

    /// One poll: gate check, then a full distribution pass if due.
    ///
    /// Invocations are serialized; overlapping polls return
    /// [`TickOutcome::Busy`] without touching any state.
    pub async fn tick(&self, now: i64) -> Result<TickOutcome, RelaypostError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            debug!("distribution run already in flight, skipping poll");
            return Ok(TickOutcome::Busy);
        };

        let current = settings::get_settings(&self.db).await?;
        if !crate::gate::is_due(&current, now) {
            return Ok(TickOutcome::GateMiss);
        }

        info!(
            items_per_run = current.items_per_run,
            interval_hours = current.interval_hours,
            "starting distribution run"
        );
        let report = self.run(&current, now).await?;

        // Written exactly once, regardless of per-destination outcomes.
        settings::set_last_run(&self.db, now).await?;

        info!(
            destinations = report.destinations,
            delivered = report.delivered,
            denied = report.denied,
            failed = report.failed,
            "distribution run completed"
        );
        Ok(TickOutcome::Completed(report))
    }

    async fn run(&self, current: &Settings, now: i64) -> Result<RunReport, RelaypostError> {
        let subs = subscriptions::list_active(&self.db).await?;
        debug!(count = subs.len(), "active subscriptions");

        let mut report = RunReport {
            destinations: subs.len(),
            ..RunReport::default()
        };

        for sub in &subs {
            match self.deliver_batch(sub, current, now).await {
                (delivered, BatchEnd::Drained) => report.delivered += delivered,
                (delivered, BatchEnd::Exhausted) => {
                    report.delivered += delivered;
                    report.exhausted += 1;
                }
                (delivered, BatchEnd::Denied) => {
                    report.delivered += delivered;
                    report.denied += 1;
                }
                (delivered, BatchEnd::Failed) => {
                    report.delivered += delivered;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Deliver up to `items_per_run` items to one destination.
    ///
    /// Failure isolation boundary: nothing returned here is an error, so a
    /// broken destination can never abort the run.
    async fn deliver_batch(
        &self,
        sub: &Subscription,
        current: &Settings,
        now: i64,
    ) -> (u64, BatchEnd) {
        let dest = sub.destination_id;
        let mut delivered = 0u64;

        for attempt in 0..current.items_per_run {
            let item = match content::next_undelivered(&self.db, dest).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    debug!(%dest, "no undelivered items, stopping batch");
                    return (delivered, BatchEnd::Exhausted);
                }
                Err(e) => {
                    warn!(%dest, error = %e, "next-item query failed, aborting destination");
                    return (delivered, BatchEnd::Failed);
                }
            };

            debug!(
                %dest,
                item_id = item.id,
                attempt = attempt + 1,
                limit = current.items_per_run,
                "dispatching item"
            );

            match self
                .transport
                .dispatch_media(dest, &item.media_ref(), &item.display_name)
                .await
            {
                Ok(()) => {}
                Err(DispatchError::AuthorizationDenied) => {
                    warn!(%dest, "posting rights denied, aborting destination");
                    let alert = format!(
                        "I cannot post in your channel {dest}. Please make sure I am an \
                         admin with posting permissions. Auto-posting will resume once fixed."
                    );
                    if let Err(e) = self.transport.notify_user(sub.owner_user_id, &alert).await {
                        warn!(owner = %sub.owner_user_id, error = %e, "owner alert failed");
                    }
                    return (delivered, BatchEnd::Denied);
                }
                Err(DispatchError::Failed { message, .. }) => {
                    warn!(%dest, error = %message, "dispatch failed, aborting destination");
                    return (delivered, BatchEnd::Failed);
                }
            }

            // Record before anything else; an unrecorded success would be
            // re-sent next run.
            if let Err(e) = deliveries::record_delivery(&self.db, dest, item.id, now).await {
                warn!(%dest, item_id = item.id, error = %e, "failed to record delivery");
                return (delivered, BatchEnd::Failed);
            }
            delivered += 1;

            if current.delete_after_deliver
                && let Err(e) = self
                    .transport
                    .delete_source_message(item.sequence_marker)
                    .await
            {
                warn!(
                    source_message_id = item.sequence_marker,
                    error = %e,
                    "source message cleanup failed"
                );
            }

            if attempt + 1 < current.items_per_run && !self.dispatch_delay.is_zero() {
                tokio::time::sleep(self.dispatch_delay).await;
            }
        }

        (delivered, BatchEnd::Drained)
    }

    /// Expiry sweep: transitions every overdue active subscription to
    /// expired. Idempotent; driven by its own timer.
    pub async fn sweep_expired(&self, now: i64) -> Result<u64, RelaypostError> {
        let expired = subscriptions::expire_due(&self.db, now).await?;
        if expired > 0 {
            info!(expired, "subscriptions expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaypost_core::{
        DestinationId, IndexCandidate, MediaKind, MediaRef, PlanKind, SettingsPatch, UserId,
    };
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MockTransport {
        deny: HashSet<i64>,
        fail: HashSet<i64>,
        dispatched: StdMutex<Vec<(i64, String)>>,
        notified: StdMutex<Vec<(i64, String)>>,
        deleted: StdMutex<Vec<i64>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn dispatch_media(
            &self,
            destination: DestinationId,
            media: &MediaRef,
            _caption: &str,
        ) -> Result<(), DispatchError> {
            if self.deny.contains(&destination.0) {
                return Err(DispatchError::AuthorizationDenied);
            }
            if self.fail.contains(&destination.0) {
                return Err(DispatchError::Failed {
                    message: "flood wait".into(),
                    source: None,
                });
            }
            self.dispatched
                .lock()
                .unwrap()
                .push((destination.0, media.file_ref.clone()));
            Ok(())
        }

        async fn notify_user(&self, user: UserId, text: &str) -> Result<(), RelaypostError> {
            self.notified.lock().unwrap().push((user.0, text.to_string()));
            Ok(())
        }

        async fn notify_destination(
            &self,
            _destination: DestinationId,
            _text: &str,
        ) -> Result<(), RelaypostError> {
            Ok(())
        }

        async fn delete_source_message(
            &self,
            source_message_id: i64,
        ) -> Result<(), RelaypostError> {
            self.deleted.lock().unwrap().push(source_message_id);
            Ok(())
        }
    }

    struct Fixture {
        engine: Engine,
        db: Arc<Database>,
        transport: Arc<MockTransport>,
        _dir: tempfile::TempDir,
    }

    async fn setup(transport: MockTransport) -> Fixture {
        let dir = tempdir().unwrap();
        let db = Arc::new(
            Database::open(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let transport = Arc::new(transport);
        let engine = Engine::with_dispatch_delay(
            Arc::clone(&db),
            transport.clone() as Arc<dyn Transport>,
            Duration::ZERO,
        );
        Fixture {
            engine,
            db,
            transport,
            _dir: dir,
        }
    }

    async fn seed_items(db: &Database, count: i64) {
        for n in 1..=count {
            content::insert_item(
                db,
                &IndexCandidate {
                    natural_key: format!("file-{n}"),
                    display_name: format!("clip-{n}.mp4"),
                    media_kind: MediaKind::Video,
                    sequence_marker: n,
                },
            )
            .await
            .unwrap();
        }
    }

    async fn seed_active_sub(db: &Database, owner: i64, dest: i64) {
        let id = subscriptions::create_pending(
            db,
            UserId(owner),
            DestinationId(dest),
            PlanKind::Monthly,
            None,
            None,
            0,
        )
        .await
        .unwrap();
        subscriptions::activate(db, id, 30, 0).await.unwrap();
    }

    #[tokio::test]
    async fn gate_miss_has_no_side_effects() {
        let fx = setup(MockTransport::default()).await;
        seed_items(&fx.db, 3).await;
        seed_active_sub(&fx.db, 10, -100).await;
        settings::set_last_run(&fx.db, 1_000_000).await.unwrap();

        // One hour into a 24-hour interval.
        let outcome = fx.engine.tick(1_000_000 + 3_600).await.unwrap();
        assert_eq!(outcome, TickOutcome::GateMiss);

        assert!(fx.transport.dispatched.lock().unwrap().is_empty());
        let current = settings::get_settings(&fx.db).await.unwrap();
        assert_eq!(current.last_run_at, 1_000_000);
    }

    #[tokio::test]
    async fn gate_pass_delivers_and_advances_last_run() {
        let fx = setup(MockTransport::default()).await;
        seed_items(&fx.db, 3).await;
        seed_active_sub(&fx.db, 10, -100).await;
        settings::set_last_run(&fx.db, 1_000_000).await.unwrap();

        let now = 1_000_000 + 86_401;
        let outcome = fx.engine.tick(now).await.unwrap();
        let TickOutcome::Completed(report) = outcome else {
            panic!("expected completed run, got {outcome:?}");
        };
        assert_eq!(report.delivered, 1);
        assert_eq!(report.destinations, 1);

        let current = settings::get_settings(&fx.db).await.unwrap();
        assert_eq!(current.last_run_at, now);
    }

    #[tokio::test]
    async fn batch_cap_limits_deliveries_per_run() {
        let fx = setup(MockTransport::default()).await;
        seed_items(&fx.db, 5).await;
        seed_active_sub(&fx.db, 10, -100).await;
        settings::apply_patch(
            &fx.db,
            &SettingsPatch {
                items_per_run: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let TickOutcome::Completed(report) = fx.engine.tick(86_500).await.unwrap() else {
            panic!("expected completed run");
        };
        assert_eq!(report.delivered, 2);
        assert_eq!(
            deliveries::count_for_destination(&fx.db, DestinationId(-100))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn items_are_never_repeated_across_runs() {
        let fx = setup(MockTransport::default()).await;
        seed_items(&fx.db, 2).await;
        seed_active_sub(&fx.db, 10, -100).await;

        fx.engine.tick(100_000).await.unwrap();
        fx.engine.tick(100_000 + 86_400).await.unwrap();
        // Third run: pool exhausted for this destination.
        let TickOutcome::Completed(report) =
            fx.engine.tick(100_000 + 2 * 86_400).await.unwrap()
        else {
            panic!("expected completed run");
        };
        assert_eq!(report.delivered, 0);
        assert_eq!(report.exhausted, 1);

        let sent = fx.transport.dispatched.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "file-1");
        assert_eq!(sent[1].1, "file-2");
    }

    #[tokio::test]
    async fn denial_is_isolated_to_one_destination() {
        let transport = MockTransport {
            deny: HashSet::from([-100]),
            ..Default::default()
        };
        let fx = setup(transport).await;
        seed_items(&fx.db, 3).await;
        seed_active_sub(&fx.db, 10, -100).await; // denied, listed first
        seed_active_sub(&fx.db, 20, -200).await;

        let TickOutcome::Completed(report) = fx.engine.tick(86_500).await.unwrap() else {
            panic!("expected completed run");
        };
        assert_eq!(report.denied, 1);
        assert_eq!(report.delivered, 1);

        let sent = fx.transport.dispatched.lock().unwrap().clone();
        assert_eq!(sent, vec![(-200, "file-1".to_string())]);

        // Owner of the denied destination was alerted exactly once.
        let notes = fx.transport.notified.lock().unwrap().clone();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, 10);

        // The run still completed and advanced last_run_at.
        let current = settings::get_settings(&fx.db).await.unwrap();
        assert_eq!(current.last_run_at, 86_500);
    }

    #[tokio::test]
    async fn transient_failure_aborts_destination_without_alert() {
        let transport = MockTransport {
            fail: HashSet::from([-100]),
            ..Default::default()
        };
        let fx = setup(transport).await;
        seed_items(&fx.db, 2).await;
        seed_active_sub(&fx.db, 10, -100).await;
        seed_active_sub(&fx.db, 20, -200).await;

        let TickOutcome::Completed(report) = fx.engine.tick(86_500).await.unwrap() else {
            panic!("expected completed run");
        };
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert!(fx.transport.notified.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_after_deliver_cleans_source_messages() {
        let fx = setup(MockTransport::default()).await;
        seed_items(&fx.db, 2).await;
        seed_active_sub(&fx.db, 10, -100).await;
        settings::apply_patch(
            &fx.db,
            &SettingsPatch {
                items_per_run: Some(2),
                delete_after_deliver: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        fx.engine.tick(86_500).await.unwrap();
        assert_eq!(*fx.transport.deleted.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn sweep_expires_overdue_subscriptions() {
        let fx = setup(MockTransport::default()).await;
        seed_active_sub(&fx.db, 10, -100).await; // expires at 30 days

        assert_eq!(fx.engine.sweep_expired(86_400).await.unwrap(), 0);
        assert_eq!(
            fx.engine.sweep_expired(30 * 86_400 + 1).await.unwrap(),
            1
        );
        // Idempotent.
        assert_eq!(fx.engine.sweep_expired(30 * 86_400 + 2).await.unwrap(), 0);

        // An expired destination no longer receives deliveries.
        seed_items(&fx.db, 1).await;
        let TickOutcome::Completed(report) =
            fx.engine.tick(31 * 86_400).await.unwrap()
        else {
            panic!("expected completed run");
        };
        assert_eq!(report.destinations, 0);
        assert_eq!(report.delivered, 0);
    }
}
