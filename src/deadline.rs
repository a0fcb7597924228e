use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};
use uuid::Uuid;

use crate::hub::{Hub, LobbyEvent, RoomEvent};
use crate::store::{RoomStore, StoreError};

/// Flips rooms from open to closed once their deadline passes, independent
/// of vote traffic, and announces the transition to subscribers.
pub struct DeadlineMonitor {
    store: Arc<dyn RoomStore>,
    hub: Arc<Hub>,
}

impl DeadlineMonitor {
    pub fn new(store: Arc<dyn RoomStore>, hub: Arc<Hub>) -> Self {
        DeadlineMonitor { store, hub }
    }

    /// Runs the periodic sweep. Sweep failures are logged and the loop
    /// continues; the next tick retries.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                match self.sweep_once(Utc::now()).await {
                    Ok(closed) if !closed.is_empty() => {
                        info!("deadline sweep closed {} room(s)", closed.len());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("deadline sweep failed: {}", e);
                    }
                }
            }
        })
    }

    /// A single sweep. The store's guarded update makes the transition
    /// idempotent, so overlapping sweeps from several instances are safe.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        let closed = self.store.close_expired(now).await?;
        for room_id in &closed {
            info!("room {} closed at deadline", room_id);
            self.hub.publish(*room_id, RoomEvent::RoomClosed);
            self.hub.publish_lobby(LobbyEvent::RoomClosed(*room_id));
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewRoom, RoomState, memory::MemoryRoomStore};
    use chrono::Duration as ChronoDuration;

    fn new_room(deadline: DateTime<Utc>) -> NewRoom {
        NewRoom {
            title: "Standup time".to_string(),
            description: None,
            deadline,
            options: vec!["9am".to_string(), "10am".to_string()],
        }
    }

    #[tokio::test]
    async fn sweep_closes_expired_rooms_and_notifies() {
        let store = Arc::new(MemoryRoomStore::new());
        let hub = Arc::new(Hub::new(16));
        let monitor = DeadlineMonitor::new(store.clone(), hub.clone());

        let expired = store
            .create_room(new_room(Utc::now() - ChronoDuration::minutes(1)))
            .await
            .unwrap();
        let open = store
            .create_room(new_room(Utc::now() + ChronoDuration::hours(1)))
            .await
            .unwrap();

        let mut rx = hub.subscribe(expired.id);
        let mut lobby = hub.subscribe_lobby();

        let closed = monitor.sweep_once(Utc::now()).await.unwrap();
        assert_eq!(closed, vec![expired.id]);
        assert!(matches!(rx.recv().await.unwrap(), RoomEvent::RoomClosed));
        assert_eq!(
            lobby.recv().await.unwrap(),
            LobbyEvent::RoomClosed(expired.id)
        );

        assert_eq!(
            store.room_by_id(expired.id).await.unwrap().state,
            RoomState::Closed
        );
        assert_eq!(
            store.room_by_id(open.id).await.unwrap().state,
            RoomState::Open
        );
    }

    #[tokio::test]
    async fn repeated_sweeps_are_idempotent() {
        let store = Arc::new(MemoryRoomStore::new());
        let hub = Arc::new(Hub::new(16));
        let monitor = DeadlineMonitor::new(store.clone(), hub.clone());

        let expired = store
            .create_room(new_room(Utc::now() - ChronoDuration::minutes(1)))
            .await
            .unwrap();
        let mut rx = hub.subscribe(expired.id);

        assert_eq!(monitor.sweep_once(Utc::now()).await.unwrap().len(), 1);
        assert!(monitor.sweep_once(Utc::now()).await.unwrap().is_empty());
        assert!(monitor.sweep_once(Utc::now()).await.unwrap().is_empty());

        // exactly one close event despite three sweeps
        assert!(matches!(rx.recv().await.unwrap(), RoomEvent::RoomClosed));
        assert!(rx.try_recv().is_err());
    }
}
