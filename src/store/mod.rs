pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::VoterKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Open,
    Closed,
}

impl RoomState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomState::Open => "open",
            RoomState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: Uuid,
    pub unique_id: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub state: RoomState,
    pub created_at: DateTime<Utc>,
    pub options: Vec<RoomOption>,
}

impl Room {
    /// State against the authoritative deadline: a room past its deadline is
    /// closed even before the sweep has recorded the transition.
    pub fn effective_state(&self, now: DateTime<Utc>) -> RoomState {
        if self.state == RoomState::Closed || now >= self.deadline {
            RoomState::Closed
        } else {
            RoomState::Open
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomOption {
    pub id: Uuid,
    pub room_id: Uuid,
    pub text: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub options: Vec<String>,
}

/// Result of an atomic vote write. A duplicate reports the option the voter
/// is already recorded as having chosen; it is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted,
    Duplicate { option_id: Uuid },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room not found")]
    RoomNotFound,
    #[error("option does not belong to room")]
    OptionNotFound,
    #[error("room is closed")]
    RoomClosed,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

/// Durable record of rooms, options and cast votes. `record_vote` is the
/// single shared-mutation point of the vote path and must make the
/// duplicate check and the insert one atomic step.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(&self, new_room: NewRoom) -> Result<Room, StoreError>;

    async fn room_by_unique_id(&self, unique_id: &str) -> Result<Room, StoreError>;

    async fn room_by_id(&self, id: Uuid) -> Result<Room, StoreError>;

    /// Summary view, newest first. Safe to call repeatedly.
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    /// Concurrent calls for the same `(room, voter)` yield exactly one
    /// `Accepted`; every other call observes `Duplicate`. The open check
    /// runs against the stored state and the deadline, not a cached flag.
    async fn record_vote(
        &self,
        room_id: Uuid,
        voter: &VoterKey,
        option_id: Uuid,
    ) -> Result<RecordOutcome, StoreError>;

    /// Committed vote counts grouped by option. Options without votes are
    /// absent; the tally engine zero-fills them.
    async fn vote_counts(&self, room_id: Uuid) -> Result<Vec<(Uuid, i64)>, StoreError>;

    /// Closes every open room whose deadline has passed and returns the ids
    /// actually transitioned. Idempotent; concurrent sweeps are harmless.
    async fn close_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError>;
}
