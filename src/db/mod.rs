pub mod connection;
pub mod models;
pub mod repositories;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::identity::VoterKey;
use crate::store::{NewRoom, RecordOutcome, Room, RoomStore, StoreError};
use self::connection::DbPool;
use self::models::RoomRow;
use self::repositories::{room_repository, vote_repository};

/// PostgreSQL-backed `RoomStore`. The `(room_id, voter_key)` uniqueness
/// constraint is the serialization point for concurrent vote submissions.
pub struct PgRoomStore {
    pool: DbPool,
}

impl PgRoomStore {
    pub fn new(pool: DbPool) -> Self {
        PgRoomStore { pool }
    }

    async fn hydrate(&self, row: RoomRow) -> Result<Room, StoreError> {
        let options = room_repository::options_for_room(&self.pool, row.id).await?;
        Ok(row.into_room(options))
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn create_room(&self, new_room: NewRoom) -> Result<Room, StoreError> {
        let room_id = room_repository::create_room(&self.pool, &new_room).await?;
        let row = room_repository::room_by_id(&self.pool, room_id)
            .await?
            .ok_or(StoreError::RoomNotFound)?;
        self.hydrate(row).await
    }

    async fn room_by_unique_id(&self, unique_id: &str) -> Result<Room, StoreError> {
        let row = room_repository::room_by_unique_id(&self.pool, unique_id)
            .await?
            .ok_or(StoreError::RoomNotFound)?;
        self.hydrate(row).await
    }

    async fn room_by_id(&self, id: Uuid) -> Result<Room, StoreError> {
        let row = room_repository::room_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::RoomNotFound)?;
        self.hydrate(row).await
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rows = room_repository::all_rooms(&self.pool).await?;
        let mut rooms = Vec::with_capacity(rows.len());
        for row in rows {
            rooms.push(self.hydrate(row).await?);
        }
        Ok(rooms)
    }

    async fn record_vote(
        &self,
        room_id: Uuid,
        voter: &VoterKey,
        option_id: Uuid,
    ) -> Result<RecordOutcome, StoreError> {
        vote_repository::record_vote(&self.pool, room_id, &voter.to_string(), option_id, Utc::now())
            .await
    }

    async fn vote_counts(&self, room_id: Uuid) -> Result<Vec<(Uuid, i64)>, StoreError> {
        vote_repository::vote_counts(&self.pool, room_id).await
    }

    async fn close_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        room_repository::close_expired(&self.pool, now).await
    }
}
