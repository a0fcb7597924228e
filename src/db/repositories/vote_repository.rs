use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::db::connection::DbPool;
use crate::store::{RecordOutcome, RoomState, StoreError};

/// Records a vote atomically. The duplicate check is the `UNIQUE(room_id,
/// voter_key)` constraint, not a read-then-write pair: concurrent
/// submissions from the same voter insert at most one row, and the losers
/// read back the committed choice.
pub async fn record_vote(
    pool: &DbPool,
    room_id: Uuid,
    voter_key: &str,
    option_id: Uuid,
    now: DateTime<Utc>,
) -> Result<RecordOutcome, StoreError> {
    let mut tx = pool.begin().await?;

    let room = sqlx::query("SELECT state, deadline FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(room) = room else {
        tx.rollback().await?;
        return Err(StoreError::RoomNotFound);
    };

    let state: String = room.get("state");
    let deadline: DateTime<Utc> = room.get("deadline");
    if state == RoomState::Closed.as_str() || now >= deadline {
        tx.rollback().await?;
        return Err(StoreError::RoomClosed);
    }

    let option = sqlx::query("SELECT id FROM room_options WHERE id = $1 AND room_id = $2")
        .bind(option_id)
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;
    if option.is_none() {
        tx.rollback().await?;
        return Err(StoreError::OptionNotFound);
    }

    let inserted = sqlx::query(
        "INSERT INTO votes (id, room_id, option_id, voter_key, cast_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (room_id, voter_key) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(option_id)
    .bind(voter_key)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        let existing = sqlx::query("SELECT option_id FROM votes WHERE room_id = $1 AND voter_key = $2")
            .bind(room_id)
            .bind(voter_key)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        return Ok(RecordOutcome::Duplicate {
            option_id: existing.get("option_id"),
        });
    }

    tx.commit().await?;
    Ok(RecordOutcome::Accepted)
}

pub async fn vote_counts(pool: &DbPool, room_id: Uuid) -> Result<Vec<(Uuid, i64)>, StoreError> {
    let rows = sqlx::query(
        "SELECT option_id, COUNT(*) AS votes FROM votes WHERE room_id = $1 GROUP BY option_id",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.get("option_id"), r.get::<i64, _>("votes")))
        .collect())
}
