use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("No resolvable voter identity")]
    InvalidIdentity,
    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room option not found")]
    OptionNotFound,
    #[error("Room is closed")]
    RoomClosed,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl IntoResponse for VoteError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            VoteError::InvalidIdentity => (StatusCode::UNAUTHORIZED, "No resolvable voter identity"),
            VoteError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, *msg),
            VoteError::RoomNotFound => (StatusCode::NOT_FOUND, "Room not found"),
            VoteError::OptionNotFound => (StatusCode::NOT_FOUND, "Room option not found"),
            VoteError::RoomClosed => (StatusCode::FORBIDDEN, "Room is closed"),
            VoteError::StorageUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.as_str()),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for VoteError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RoomNotFound => VoteError::RoomNotFound,
            StoreError::OptionNotFound => VoteError::OptionNotFound,
            StoreError::RoomClosed => VoteError::RoomClosed,
            StoreError::Unavailable(msg) => VoteError::StorageUnavailable(msg),
        }
    }
}
