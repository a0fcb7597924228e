use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::{Room, RoomOption, RoomState};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    pub id: Uuid,
    pub unique_id: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

impl RoomRow {
    pub fn into_room(self, options: Vec<RoomOption>) -> Room {
        let state = if self.state == RoomState::Closed.as_str() {
            RoomState::Closed
        } else {
            RoomState::Open
        };
        Room {
            id: self.id,
            unique_id: self.unique_id,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            state,
            created_at: self.created_at,
            options,
        }
    }
}
