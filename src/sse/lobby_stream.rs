use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;

use crate::hub::LobbyEvent;
use crate::rooms::{room_summaries, summary_for};
use crate::startup::AppState;

/// Event stream for the room list: `init` with every room's summary, then a
/// refreshed summary whenever a room is created, receives a vote, or closes.
pub async fn lobby_events(
    Extension(app_state): Extension<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let mut rx = app_state.hub.subscribe_lobby();

        match room_summaries(&app_state).await {
            Ok(rooms) => {
                yield Ok(Event::default()
                    .event("init")
                    .data(json!({"rooms": rooms}).to_string()));
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
                Ok(LobbyEvent::RoomCreated(room_id)) => {
                    if let Some(room) = summary_for(&app_state, room_id).await {
                        yield Ok(Event::default()
                            .event("room_created")
                            .data(json!({"room": room}).to_string()));
                    }
                }
                Ok(LobbyEvent::RoomChanged(room_id)) => {
                    if let Some(room) = summary_for(&app_state, room_id).await {
                        yield Ok(Event::default()
                            .event("room_updated")
                            .data(json!({"room": room}).to_string()));
                    }
                }
                Ok(LobbyEvent::RoomClosed(room_id)) => {
                    yield Ok(Event::default()
                        .event("room_closed")
                        .data(json!({"room_id": room_id}).to_string()));
                }
                Err(RecvError::Lagged(_)) => {
                    if let Ok(rooms) = room_summaries(&app_state).await {
                        yield Ok(Event::default()
                            .event("init")
                            .data(json!({"rooms": rooms}).to_string()));
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
