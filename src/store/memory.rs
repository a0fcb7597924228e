use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NewRoom, RecordOutcome, Room, RoomOption, RoomState, RoomStore, StoreError};
use crate::identity::VoterKey;

/// In-memory `RoomStore` with the same contract as the Postgres store.
/// A single mutex makes the duplicate check and the vote insert one atomic
/// step. Backs the test suite.
#[derive(Default)]
pub struct MemoryRoomStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<Uuid, Room>,
    by_unique_id: HashMap<String, Uuid>,
    // room id -> voter key -> chosen option
    votes: HashMap<Uuid, HashMap<String, Uuid>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create_room(&self, new_room: NewRoom) -> Result<Room, StoreError> {
        let room_id = Uuid::new_v4();
        let unique_id = Uuid::new_v4().simple().to_string();
        let options = new_room
            .options
            .iter()
            .enumerate()
            .map(|(position, text)| RoomOption {
                id: Uuid::new_v4(),
                room_id,
                text: text.clone(),
                position: position as i32,
            })
            .collect();
        let room = Room {
            id: room_id,
            unique_id: unique_id.clone(),
            title: new_room.title,
            description: new_room.description,
            deadline: new_room.deadline,
            state: RoomState::Open,
            created_at: Utc::now(),
            options,
        };

        let mut inner = self.inner.lock().await;
        inner.by_unique_id.insert(unique_id, room_id);
        inner.rooms.insert(room_id, room.clone());
        inner.votes.insert(room_id, HashMap::new());
        Ok(room)
    }

    async fn room_by_unique_id(&self, unique_id: &str) -> Result<Room, StoreError> {
        let inner = self.inner.lock().await;
        let room_id = inner
            .by_unique_id
            .get(unique_id)
            .ok_or(StoreError::RoomNotFound)?;
        inner
            .rooms
            .get(room_id)
            .cloned()
            .ok_or(StoreError::RoomNotFound)
    }

    async fn room_by_id(&self, id: Uuid) -> Result<Room, StoreError> {
        let inner = self.inner.lock().await;
        inner.rooms.get(&id).cloned().ok_or(StoreError::RoomNotFound)
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let inner = self.inner.lock().await;
        let mut rooms: Vec<Room> = inner.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    async fn record_vote(
        &self,
        room_id: Uuid,
        voter: &VoterKey,
        option_id: Uuid,
    ) -> Result<RecordOutcome, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;

        {
            let room = inner.rooms.get(&room_id).ok_or(StoreError::RoomNotFound)?;
            if room.effective_state(now) == RoomState::Closed {
                return Err(StoreError::RoomClosed);
            }
            if !room.options.iter().any(|option| option.id == option_id) {
                return Err(StoreError::OptionNotFound);
            }
        }

        let votes = inner.votes.entry(room_id).or_default();
        let key = voter.to_string();
        match votes.get(&key) {
            Some(existing) => Ok(RecordOutcome::Duplicate {
                option_id: *existing,
            }),
            None => {
                votes.insert(key, option_id);
                Ok(RecordOutcome::Accepted)
            }
        }
    }

    async fn vote_counts(&self, room_id: Uuid) -> Result<Vec<(Uuid, i64)>, StoreError> {
        let inner = self.inner.lock().await;
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        if let Some(votes) = inner.votes.get(&room_id) {
            for option_id in votes.values() {
                *counts.entry(*option_id).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn close_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut closed = Vec::new();
        for room in inner.rooms.values_mut() {
            if room.state == RoomState::Open && room.deadline <= now {
                room.state = RoomState::Closed;
                closed.push(room.id);
            }
        }
        Ok(closed)
    }
}
