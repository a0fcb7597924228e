use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::hub::RoomEvent;
use crate::rooms::RoomResponse;
use crate::startup::AppState;
use crate::store::RoomState;
use crate::tally::tally_for_room;

/// Long-lived event stream for one room: an `init` snapshot first, then a
/// `tally_update` per accepted vote and a `room_closed` when the deadline
/// sweep fires. Reconnecting clients get a fresh snapshot, never a replay.
pub async fn room_events(
    Extension(app_state): Extension<AppState>,
    Path(unique_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let room = match app_state.store.room_by_unique_id(&unique_id).await {
            Ok(room) => room,
            Err(e) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": e.to_string()}).to_string()));
                return;
            }
        };

        // subscribe before the snapshot read so no event falls in the gap
        let mut rx = app_state.hub.subscribe(room.id);

        match tally_for_room(app_state.store.as_ref(), &room).await {
            Ok(tally) => {
                yield Ok(Event::default()
                    .event("init")
                    .data(json!({
                        "room": RoomResponse::build(&room, &tally, Utc::now()),
                    }).to_string()));
            }
            Err(e) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": e.to_string()}).to_string()));
                return;
            }
        }

        loop {
            match rx.recv().await {
                Ok(RoomEvent::TallyUpdated(tally)) => {
                    yield Ok(Event::default()
                        .event("tally_update")
                        .data(json!({
                            "options": tally.options,
                            "total_votes": tally.total_votes,
                        }).to_string()));
                }
                Ok(RoomEvent::RoomClosed) => {
                    yield Ok(Event::default()
                        .event("room_closed")
                        .data(json!({"room_id": room.id}).to_string()));
                }
                Err(RecvError::Lagged(skipped)) => {
                    // fell behind the ring buffer: resynchronise from a snapshot
                    warn!(
                        "subscriber of room {} lagged by {} events, resyncing",
                        room.unique_id, skipped
                    );
                    if let Ok(current) = app_state.store.room_by_id(room.id).await {
                        if let Ok(tally) = tally_for_room(app_state.store.as_ref(), &current).await {
                            yield Ok(Event::default()
                                .event("tally_update")
                                .data(json!({
                                    "options": tally.options,
                                    "total_votes": tally.total_votes,
                                }).to_string()));
                            if current.effective_state(Utc::now()) == RoomState::Closed {
                                yield Ok(Event::default()
                                    .event("room_closed")
                                    .data(json!({"room_id": room.id}).to_string()));
                            }
                        }
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
