// Nightly Reset Scheduler
// Empties every queue once a day and tells watchers about it

mod schedule;

pub use schedule::DailySchedule;

use crate::application::constants::RESET_RETRY_DELAY;
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{QueueMaintenance, QueueNotifier, ResetReport};
use chrono::Local;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Daily queue reset
pub struct ResetScheduler {
    maintenance: Arc<dyn QueueMaintenance>,
    notifier: Arc<dyn QueueNotifier>,
    schedule: DailySchedule,
}

impl ResetScheduler {
    pub fn new(
        maintenance: Arc<dyn QueueMaintenance>,
        notifier: Arc<dyn QueueNotifier>,
        schedule: DailySchedule,
    ) -> Self {
        Self {
            maintenance,
            notifier,
            schedule,
        }
    }

    /// Run reset loop (background task)
    ///
    /// Sleeps until the next local firing time, resets, repeats. A failed
    /// reset is retried after a short delay instead of waiting a full day.
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownToken) {
        info!(reset_at = %self.schedule, "Reset scheduler started");

        loop {
            let now = Local::now();
            let Some(next) = self.schedule.next_after(&now) else {
                error!(reset_at = %self.schedule, "No valid reset time found, scheduler stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_reset = %next, "Next queue reset scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.wait() => {
                    info!("Reset scheduler stopped");
                    return;
                }
            }

            while let Err(e) = self.run_once().await {
                error!(error = %e, "Scheduled queue reset failed");
                tokio::select! {
                    _ = tokio::time::sleep(RESET_RETRY_DELAY) => {}
                    _ = shutdown.wait() => {
                        info!("Reset scheduler stopped");
                        return;
                    }
                }
            }
        }
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// Reset now (scheduled firing or manual trigger)
    pub async fn run_once(&self) -> Result<ResetReport> {
        let report = self.maintenance.reset_all_queues().await?;

        // Best effort; walk-ins the reset already removed are not counted twice
        let orphans = match self.maintenance.purge_orphaned_walk_ins().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Orphaned walk-in sweep failed");
                0
            }
        };

        for provider_id in &report.providers {
            self.notifier.queue_changed(provider_id);
        }

        info!(
            providers = report.providers.len(),
            entries_cleared = report.entries_cleared,
            walk_ins_deleted = report.walk_ins_deleted,
            orphans_purged = orphans,
            "Queues reset"
        );

        Ok(ResetReport {
            walk_ins_deleted: report.walk_ins_deleted + orphans,
            ..report
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::queue::QueueService;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{Customer, Provider, ProviderProfile};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::notifier::mocks::RecordingNotifier;
    use crate::port::queue_store::mocks::InMemoryQueueStore;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::{NoopNotifier, QueueStore};
    use std::time::Duration;

    async fn populated() -> (InMemoryQueueStore, QueueService) {
        let store = InMemoryQueueStore::new();
        for id in ["P1", "P2"] {
            let profile = ProviderProfile {
                name: id.to_string(),
                address: "addr".to_string(),
                phone: None,
                opening_hour: None,
            };
            store
                .insert_provider(&Provider::new(id, 0, profile))
                .await
                .unwrap();
        }
        let regular = Customer::registered("reg", 0, "Reg", "reg@example.com");
        store.insert_customer(&regular).await.unwrap();

        let service = QueueService::new(
            Arc::new(store.clone()),
            Arc::new(SequentialIdProvider::new("walkin")),
            Arc::new(SystemTimeProvider),
            Arc::new(NoopNotifier),
        );
        service.join("P1", "reg").await.unwrap();
        service.admit_walk_in("P2").await.unwrap();
        (store, service)
    }

    #[tokio::test]
    async fn test_run_once_empties_queues_and_walk_ins() {
        let (store, _) = populated().await;
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = ResetScheduler::new(
            Arc::new(store.clone()),
            notifier.clone(),
            DailySchedule::midnight(),
        );

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.entries_cleared, 2);
        assert_eq!(report.walk_ins_deleted, 1);

        for id in ["P1", "P2"] {
            let snapshot = store.snapshot(id).await.unwrap().unwrap();
            assert!(snapshot.queue.is_empty());
            assert_eq!(notifier.count_for(id), 1);
        }
        assert!(store.find_customer("reg").await.unwrap().is_some());
        assert_eq!(store.customer_count().await, 1);
    }

    #[tokio::test]
    async fn test_reset_then_rejoin_elsewhere() {
        let (store, service) = populated().await;
        let scheduler = ResetScheduler::new(
            Arc::new(store.clone()),
            Arc::new(NoopNotifier),
            DailySchedule::midnight(),
        );
        scheduler.run_once().await.unwrap();

        let snapshot = service.join("P2", "reg").await.unwrap();
        assert_eq!(snapshot.customer_ids(), vec!["reg"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = InMemoryQueueStore::new();
        let scheduler = Arc::new(ResetScheduler::new(
            Arc::new(store),
            Arc::new(NoopNotifier),
            DailySchedule::midnight(),
        ));
        let (sender, token) = shutdown_channel();

        let handle = tokio::spawn(scheduler.run(token));
        sender.shutdown();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler must stop promptly")
            .unwrap();
    }
}
