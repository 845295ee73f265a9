// Real-time Fan-out
//
// Watchers of a provider share a room. After any committed change the room
// receives the provider's full, freshly read snapshot. Rooms exist only while
// someone is watching.

mod room;

pub use room::RoomSubscription;

use crate::domain::id::ensure_well_formed;
use crate::domain::{ProviderId, QueueSnapshot};
use crate::error::{AppError, Result};
use crate::port::{QueueNotifier, QueueStore};
use room::Room;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

struct FanOutInner {
    store: Arc<dyn QueueStore>,
    rooms: Mutex<HashMap<ProviderId, Room>>,
    capacity: usize,
}

/// Per-provider broadcast rooms
#[derive(Clone)]
pub struct FanOut {
    inner: Arc<FanOutInner>,
}

impl FanOut {
    /// # Arguments
    /// * `store` - Source of truth every broadcast is read from
    /// * `capacity` - Snapshots retained per room for slow watchers
    pub fn new(store: Arc<dyn QueueStore>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(FanOutInner {
                store,
                rooms: Mutex::new(HashMap::new()),
                capacity,
            }),
        }
    }

    /// Join a provider's room and get its current snapshot
    ///
    /// The room is joined before the read, so a change committed in between
    /// is delivered rather than lost.
    pub async fn subscribe(&self, provider_id: &str) -> Result<(RoomSubscription, QueueSnapshot)> {
        ensure_well_formed(provider_id)?;

        let mut subscription = self.join(provider_id);
        let snapshot = self
            .inner
            .store
            .snapshot(provider_id)
            .await?
            .ok_or_else(|| AppError::provider_not_found(provider_id))?;

        subscription.last_seen = Some(snapshot.revision);
        debug!(provider_id = %provider_id, revision = snapshot.revision, "Watcher subscribed");
        Ok((subscription, snapshot))
    }

    /// Re-read a provider's state and broadcast it to its room
    ///
    /// Providers nobody watches are skipped without a read.
    pub async fn notify(&self, provider_id: &str) -> Result<()> {
        if !self.rooms().contains_key(provider_id) {
            return Ok(());
        }

        match self.inner.store.snapshot(provider_id).await? {
            Some(snapshot) => {
                self.publish(snapshot);
            }
            None => {
                debug!(provider_id = %provider_id, "Provider vanished before broadcast");
            }
        }
        Ok(())
    }

    /// Broadcast a snapshot already read from the store
    ///
    /// # Returns
    /// `true` if the room existed and the snapshot was newer than the last one sent
    pub fn publish(&self, snapshot: QueueSnapshot) -> bool {
        let mut rooms = self.rooms();
        match rooms.get_mut(&snapshot.provider_id) {
            Some(room) => {
                let revision = snapshot.revision;
                let sent = room.offer(Arc::new(snapshot));
                if !sent {
                    debug!(revision, "Dropped stale snapshot");
                }
                sent
            }
            None => false,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }

    pub fn subscriber_count(&self, provider_id: &str) -> usize {
        self.rooms()
            .get(provider_id)
            .map_or(0, |room| room.subscribers)
    }

    pub fn total_subscribers(&self) -> usize {
        self.rooms().values().map(|room| room.subscribers).sum()
    }

    fn join(&self, provider_id: &str) -> RoomSubscription {
        let receiver = {
            let mut rooms = self.rooms();
            let room = rooms
                .entry(provider_id.to_string())
                .or_insert_with(|| Room::new(self.inner.capacity));
            room.subscribers += 1;
            room.sender.subscribe()
        };

        RoomSubscription {
            fanout: self.clone(),
            provider_id: provider_id.to_string(),
            receiver,
            last_seen: None,
        }
    }

    fn leave(&self, provider_id: &str) {
        let mut rooms = self.rooms();
        if let Some(room) = rooms.get_mut(provider_id) {
            room.subscribers = room.subscribers.saturating_sub(1);
            if room.subscribers == 0 {
                rooms.remove(provider_id);
                debug!(provider_id = %provider_id, "Room closed");
            }
        }
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<ProviderId, Room>> {
        self.inner
            .rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueueNotifier for FanOut {
    /// Broadcast on a background task so the mutation caller never waits
    fn queue_changed(&self, provider_id: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(provider_id = %provider_id, "No runtime for broadcast, change not pushed");
            return;
        };

        let fanout = self.clone();
        let provider_id = provider_id.to_string();
        handle.spawn(async move {
            if let Err(e) = fanout.notify(&provider_id).await {
                warn!(provider_id = %provider_id, error = %e, "Broadcast read failed");
            }
        });
    }
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("rooms", &self.room_count())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::queue::QueueService;
    use crate::domain::{Customer, Provider, ProviderProfile};
    use crate::error::ErrorKind;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::queue_store::mocks::InMemoryQueueStore;
    use crate::port::time_provider::SystemTimeProvider;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    async fn seeded_store() -> InMemoryQueueStore {
        let store = InMemoryQueueStore::new();
        for id in ["P1", "P2"] {
            let provider = Provider::new(
                id,
                0,
                ProviderProfile {
                    name: id.to_string(),
                    address: "addr".to_string(),
                    phone: None,
                    opening_hour: None,
                },
            );
            store.insert_provider(&provider).await.unwrap();
        }
        for id in ["A", "B"] {
            let customer = Customer::registered(id, 0, id, format!("{}@example.com", id));
            store.insert_customer(&customer).await.unwrap();
        }
        store
    }

    fn wired(store: &InMemoryQueueStore) -> (FanOut, QueueService) {
        let fanout = FanOut::new(Arc::new(store.clone()), 16);
        let service = QueueService::new(
            Arc::new(store.clone()),
            Arc::new(SequentialIdProvider::new("w")),
            Arc::new(SystemTimeProvider),
            Arc::new(fanout.clone()),
        );
        (fanout, service)
    }

    #[tokio::test]
    async fn test_subscribe_returns_current_snapshot() {
        let store = seeded_store().await;
        let (fanout, service) = wired(&store);
        service.join("P1", "A").await.unwrap();

        let (sub, snapshot) = fanout.subscribe("P1").await.unwrap();
        assert_eq!(snapshot.customer_ids(), vec!["A"]);
        assert_eq!(fanout.subscriber_count("P1"), 1);
        assert!(format!("{:?}", sub).contains("P1"));
    }

    #[tokio::test]
    async fn test_subscribe_unknown_provider() {
        let store = seeded_store().await;
        let (fanout, _) = wired(&store);

        let err = fanout.subscribe("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fanout.room_count(), 0, "failed subscribe leaves no room behind");
    }

    #[tokio::test]
    async fn test_watchers_receive_full_state_after_mutation() {
        let store = seeded_store().await;
        let (fanout, service) = wired(&store);
        let (mut first, _) = fanout.subscribe("P1").await.unwrap();
        let (mut second, _) = fanout.subscribe("P1").await.unwrap();

        service.join("P1", "A").await.unwrap();

        for sub in [&mut first, &mut second] {
            let snapshot = timeout(WAIT, sub.next()).await.unwrap().unwrap();
            assert_eq!(snapshot.customer_ids(), vec!["A"]);
            assert_eq!(snapshot.revision, 1);
        }
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let store = seeded_store().await;
        let (fanout, service) = wired(&store);
        let (mut p2_watcher, _) = fanout.subscribe("P2").await.unwrap();

        service.join("P1", "A").await.unwrap();
        service.join("P2", "B").await.unwrap();

        let snapshot = timeout(WAIT, p2_watcher.next()).await.unwrap().unwrap();
        assert_eq!(snapshot.provider_id, "P2");
        assert_eq!(snapshot.customer_ids(), vec!["B"]);
    }

    #[tokio::test]
    async fn test_stale_snapshots_are_dropped() {
        let store = seeded_store().await;
        let (fanout, _) = wired(&store);
        let (mut sub, current) = fanout.subscribe("P1").await.unwrap();

        let mut newer = current.clone();
        newer.revision = 5;
        let mut older = current.clone();
        older.revision = 3;

        assert!(fanout.publish(newer.clone()));
        assert!(!fanout.publish(older), "older revision must not be broadcast");
        assert!(fanout.publish(newer), "a re-read of the same revision still goes out");

        for _ in 0..2 {
            let received = timeout(WAIT, sub.next()).await.unwrap().unwrap();
            assert_eq!(received.revision, 5);
        }
        assert!(timeout(Duration::from_millis(100), sub.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_notify_rebroadcasts_unchanged_state() {
        let store = seeded_store().await;
        let (fanout, service) = wired(&store);
        service.join("P1", "A").await.unwrap();

        let (mut sub, current) = fanout.subscribe("P1").await.unwrap();
        fanout.notify("P1").await.unwrap();
        fanout.notify("P1").await.unwrap();

        for _ in 0..2 {
            let pushed = timeout(WAIT, sub.next()).await.unwrap().unwrap();
            assert_eq!(pushed.as_ref(), &current);
        }
    }

    #[tokio::test]
    async fn test_room_removed_after_last_watcher_leaves() {
        let store = seeded_store().await;
        let (fanout, _) = wired(&store);

        let (a, _) = fanout.subscribe("P1").await.unwrap();
        let (b, _) = fanout.subscribe("P1").await.unwrap();
        assert_eq!(fanout.room_count(), 1);
        assert_eq!(fanout.total_subscribers(), 2);

        drop(a);
        assert_eq!(fanout.subscriber_count("P1"), 1);
        drop(b);
        assert_eq!(fanout.room_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_without_watchers_is_noop() {
        let store = seeded_store().await;
        let (fanout, _) = wired(&store);
        fanout.notify("P1").await.unwrap();
        fanout.notify("missing").await.unwrap();
        assert_eq!(fanout.room_count(), 0);
    }
}
