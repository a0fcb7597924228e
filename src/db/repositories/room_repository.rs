use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::db::connection::DbPool;
use crate::db::models::RoomRow;
use crate::store::{NewRoom, RoomOption, StoreError};

/// Inserts the room and its options in one transaction.
pub async fn create_room(pool: &DbPool, new_room: &NewRoom) -> Result<Uuid, StoreError> {
    let room_id = Uuid::new_v4();
    let unique_id = Uuid::new_v4().simple().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO rooms (id, unique_id, title, description, deadline) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(room_id)
    .bind(&unique_id)
    .bind(&new_room.title)
    .bind(new_room.description.as_deref())
    .bind(new_room.deadline)
    .execute(&mut *tx)
    .await?;

    for (position, text) in new_room.options.iter().enumerate() {
        sqlx::query(
            "INSERT INTO room_options (id, room_id, option_text, position) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(room_id)
        .bind(text)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(room_id)
}

pub async fn room_by_unique_id(
    pool: &DbPool,
    unique_id: &str,
) -> Result<Option<RoomRow>, StoreError> {
    let row = sqlx::query_as::<_, RoomRow>(
        "SELECT id, unique_id, title, description, deadline, state, created_at FROM rooms WHERE unique_id = $1",
    )
    .bind(unique_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn room_by_id(pool: &DbPool, room_id: Uuid) -> Result<Option<RoomRow>, StoreError> {
    let row = sqlx::query_as::<_, RoomRow>(
        "SELECT id, unique_id, title, description, deadline, state, created_at FROM rooms WHERE id = $1",
    )
    .bind(room_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn all_rooms(pool: &DbPool) -> Result<Vec<RoomRow>, StoreError> {
    let rows = sqlx::query_as::<_, RoomRow>(
        "SELECT id, unique_id, title, description, deadline, state, created_at FROM rooms ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn options_for_room(pool: &DbPool, room_id: Uuid) -> Result<Vec<RoomOption>, StoreError> {
    let rows = sqlx::query(
        "SELECT id, room_id, option_text, position FROM room_options WHERE room_id = $1 ORDER BY position",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| RoomOption {
            id: r.get("id"),
            room_id: r.get("room_id"),
            text: r.get("option_text"),
            position: r.get("position"),
        })
        .collect())
}

/// Guarded update: only open rooms past their deadline transition, so
/// concurrent sweeps each claim a disjoint set and re-closing is a no-op.
pub async fn close_expired(pool: &DbPool, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
    let rows = sqlx::query(
        "UPDATE rooms SET state = 'closed' WHERE state = 'open' AND deadline <= $1 RETURNING id",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.get("id")).collect())
}
