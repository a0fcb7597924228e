use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::tally::Tally;

/// Event pushed to subscribers of a single room. Tally events carry the full
/// snapshot, not a delta, so clients replace rather than merge.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    TallyUpdated(Tally),
    RoomClosed,
}

/// Event pushed to subscribers of the room list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEvent {
    RoomCreated(Uuid),
    RoomChanged(Uuid),
    RoomClosed(Uuid),
}

/// Keyed registry of per-room broadcast channels plus a lobby channel for
/// the room list. Channels are bounded: a subscriber that falls behind
/// observes a lag error and resynchronises from a snapshot instead of
/// stalling delivery to anyone else.
pub struct Hub {
    rooms: DashMap<Uuid, broadcast::Sender<RoomEvent>>,
    lobby: broadcast::Sender<LobbyEvent>,
    capacity: usize,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (lobby, _) = broadcast::channel(capacity);
        Hub {
            rooms: DashMap::new(),
            lobby,
            capacity,
        }
    }

    /// Receives every event published to the room after this call, in
    /// publish order. Past events are not replayed; callers fetch a snapshot
    /// right after subscribing.
    pub fn subscribe(&self, room_id: Uuid) -> broadcast::Receiver<RoomEvent> {
        self.rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn publish(&self, room_id: Uuid, event: RoomEvent) {
        let delivered = match self.rooms.get(&room_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => return,
        };
        if !delivered {
            // last receiver is gone; drop the channel
            self.rooms
                .remove_if(&room_id, |_, tx| tx.receiver_count() == 0);
        }
    }

    pub fn subscribe_lobby(&self) -> broadcast::Receiver<LobbyEvent> {
        self.lobby.subscribe()
    }

    pub fn publish_lobby(&self, event: LobbyEvent) {
        let _ = self.lobby.send(event);
    }

    pub fn room_subscribers(&self, room_id: Uuid) -> usize {
        self.rooms
            .get(&room_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub fn tracked_rooms(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn tally(total_votes: i64) -> Tally {
        Tally {
            options: Vec::new(),
            total_votes,
        }
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = Hub::new(16);
        let room_id = Uuid::new_v4();
        let mut rx = hub.subscribe(room_id);

        for total in 1..=3 {
            hub.publish(room_id, RoomEvent::TallyUpdated(tally(total)));
        }
        hub.publish(room_id, RoomEvent::RoomClosed);

        for total in 1..=3 {
            match rx.recv().await.unwrap() {
                RoomEvent::TallyUpdated(t) => assert_eq!(t.total_votes, total),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(matches!(rx.recv().await.unwrap(), RoomEvent::RoomClosed));
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_past_events() {
        let hub = Hub::new(16);
        let room_id = Uuid::new_v4();

        let mut early = hub.subscribe(room_id);
        hub.publish(room_id, RoomEvent::TallyUpdated(tally(1)));
        let mut late = hub.subscribe(room_id);

        assert!(early.recv().await.is_ok());
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_without_stalling_others() {
        let hub = Hub::new(2);
        let room_id = Uuid::new_v4();
        let mut slow = hub.subscribe(room_id);
        let mut fast = hub.subscribe(room_id);

        for total in 1..=4 {
            hub.publish(room_id, RoomEvent::TallyUpdated(tally(total)));
            match fast.recv().await.unwrap() {
                RoomEvent::TallyUpdated(t) => assert_eq!(t.total_votes, total),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        // the stalled receiver lost the two oldest events and is told so
        match slow.recv().await {
            Err(RecvError::Lagged(skipped)) => assert_eq!(skipped, 2),
            other => panic!("expected lag, got {other:?}"),
        }
        match slow.recv().await.unwrap() {
            RoomEvent::TallyUpdated(t) => assert_eq!(t.total_votes, 3),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publishing_to_a_room_without_subscribers_is_a_no_op() {
        let hub = Hub::new(16);
        hub.publish(Uuid::new_v4(), RoomEvent::RoomClosed);
        assert_eq!(hub.tracked_rooms(), 0);
    }

    #[tokio::test]
    async fn dead_subscriptions_are_pruned() {
        let hub = Hub::new(16);
        let room_id = Uuid::new_v4();

        let rx = hub.subscribe(room_id);
        assert_eq!(hub.room_subscribers(room_id), 1);
        drop(rx);

        hub.publish(room_id, RoomEvent::RoomClosed);
        assert_eq!(hub.tracked_rooms(), 0);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = Hub::new(16);
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let mut rx_a = hub.subscribe(room_a);
        let mut rx_b = hub.subscribe(room_b);

        hub.publish(room_a, RoomEvent::TallyUpdated(tally(1)));

        assert!(rx_a.recv().await.is_ok());
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }
}
