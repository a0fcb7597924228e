use axum::{
    extract::{Extension, Json, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::VoteError;
use crate::hub::LobbyEvent;
use crate::identity::bearer_token;
use crate::intake;
use crate::startup::AppState;
use crate::store::{NewRoom, Room, RoomState, StoreError};
use crate::tally::{Tally, tally_for_room};

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_id: Uuid,
    pub guest_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionWithVotes {
    pub id: Uuid,
    pub text: String,
    pub vote_count: i64,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: Uuid,
    pub unique_id: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: String,
    pub created_at: String,
    pub state: RoomState,
    pub options: Vec<OptionWithVotes>,
    pub total_votes: i64,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub option_id: Uuid,
    pub already_voted: bool,
    pub message: String,
    pub options: Vec<OptionWithVotes>,
    pub total_votes: i64,
}

impl RoomResponse {
    /// The reported state follows the authoritative deadline, so an expired
    /// room reads as closed even before the sweep has recorded it.
    pub fn build(room: &Room, tally: &Tally, now: DateTime<Utc>) -> Self {
        RoomResponse {
            id: room.id,
            unique_id: room.unique_id.clone(),
            title: room.title.clone(),
            description: room.description.clone(),
            deadline: room.deadline.to_rfc3339(),
            created_at: room.created_at.to_rfc3339(),
            state: room.effective_state(now),
            options: option_rows(tally),
            total_votes: tally.total_votes,
        }
    }
}

fn option_rows(tally: &Tally) -> Vec<OptionWithVotes> {
    tally
        .options
        .iter()
        .map(|t| OptionWithVotes {
            id: t.option_id,
            text: t.text.clone(),
            vote_count: t.votes,
        })
        .collect()
}

pub(crate) async fn room_summaries(app_state: &AppState) -> Result<Vec<RoomResponse>, StoreError> {
    let rooms = app_state.store.list_rooms().await?;
    let now = Utc::now();
    let mut summaries = Vec::with_capacity(rooms.len());
    for room in rooms {
        let tally = tally_for_room(app_state.store.as_ref(), &room).await?;
        summaries.push(RoomResponse::build(&room, &tally, now));
    }
    Ok(summaries)
}

pub(crate) async fn summary_for(app_state: &AppState, room_id: Uuid) -> Option<RoomResponse> {
    let room = app_state.store.room_by_id(room_id).await.ok()?;
    let tally = tally_for_room(app_state.store.as_ref(), &room).await.ok()?;
    Some(RoomResponse::build(&room, &tally, Utc::now()))
}

/// Create a new room (authenticated users only)
pub async fn create_room(
    Extension(app_state): Extension<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, VoteError> {
    let creator = app_state.identity.resolve(bearer_token(&headers), None)?;

    if payload.title.trim().is_empty() {
        return Err(VoteError::InvalidRequest("title must not be empty"));
    }
    let options: Vec<String> = payload
        .options
        .iter()
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect();
    if options.len() < 2 || options.len() > 5 {
        return Err(VoteError::InvalidRequest(
            "a room needs between two and five options",
        ));
    }
    if payload.deadline <= Utc::now() {
        return Err(VoteError::InvalidRequest("deadline must be in the future"));
    }

    let room = app_state
        .store
        .create_room(NewRoom {
            title: payload.title.trim().to_string(),
            description: payload.description,
            deadline: payload.deadline,
            options,
        })
        .await?;

    info!("room {} created by {}", room.unique_id, creator);
    app_state.hub.publish_lobby(LobbyEvent::RoomCreated(room.id));

    let tally = tally_for_room(app_state.store.as_ref(), &room).await?;
    Ok((
        StatusCode::CREATED,
        Json(RoomResponse::build(&room, &tally, Utc::now())),
    ))
}

/// Get all rooms with their current tallies
pub async fn list_rooms(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, VoteError> {
    let summaries = room_summaries(&app_state).await?;
    Ok((StatusCode::OK, Json(summaries)))
}

/// Snapshot of a single room: metadata, options, state and tally. Clients
/// fetch this right after subscribing to the event stream.
pub async fn get_room(
    Extension(app_state): Extension<AppState>,
    Path(unique_id): Path<String>,
) -> Result<impl IntoResponse, VoteError> {
    let room = app_state.store.room_by_unique_id(&unique_id).await?;
    let tally = tally_for_room(app_state.store.as_ref(), &room).await?;
    Ok((
        StatusCode::OK,
        Json(RoomResponse::build(&room, &tally, Utc::now())),
    ))
}

/// Cast a vote. A repeat submission from the same voter is answered like a
/// fresh success, with `already_voted` set and the tally unchanged.
pub async fn submit_vote(
    Extension(app_state): Extension<AppState>,
    headers: HeaderMap,
    Path(unique_id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<impl IntoResponse, VoteError> {
    let outcome = intake::submit_vote(
        app_state.store.as_ref(),
        &app_state.hub,
        &app_state.identity,
        &unique_id,
        payload.option_id,
        bearer_token(&headers),
        payload.guest_id.as_deref(),
    )
    .await?;

    let message = if outcome.already_voted {
        "Vote already recorded for this room"
    } else {
        "Vote recorded successfully"
    };

    Ok((
        StatusCode::OK,
        Json(VoteResponse {
            option_id: outcome.option_id,
            already_voted: outcome.already_voted,
            message: message.to_string(),
            options: option_rows(&outcome.tally),
            total_votes: outcome.tally.total_votes,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RoomOption;
    use chrono::Duration;

    fn room_with_deadline(deadline: DateTime<Utc>) -> Room {
        let id = Uuid::new_v4();
        Room {
            id,
            unique_id: "abc123".to_string(),
            title: "Team lunch".to_string(),
            description: None,
            deadline,
            state: RoomState::Open,
            created_at: Utc::now(),
            options: vec![RoomOption {
                id: Uuid::new_v4(),
                room_id: id,
                text: "Tacos".to_string(),
                position: 0,
            }],
        }
    }

    #[test]
    fn expired_room_reads_as_closed_before_sweep() {
        let room = room_with_deadline(Utc::now() - Duration::minutes(1));
        let tally = Tally::compute(&room.options, &[]);
        let response = RoomResponse::build(&room, &tally, Utc::now());

        assert_eq!(response.state, RoomState::Closed);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["state"], "closed");
    }

    #[test]
    fn open_room_serializes_with_zero_filled_options() {
        let room = room_with_deadline(Utc::now() + Duration::hours(1));
        let tally = Tally::compute(&room.options, &[]);
        let response = RoomResponse::build(&room, &tally, Utc::now());

        assert_eq!(response.state, RoomState::Open);
        assert_eq!(response.total_votes, 0);
        assert_eq!(response.options[0].vote_count, 0);
    }
}
