use tracing::{info, warn};
use uuid::Uuid;

use crate::error::VoteError;
use crate::hub::{Hub, LobbyEvent, RoomEvent};
use crate::identity::IdentityResolver;
use crate::store::{RecordOutcome, RoomStore};
use crate::tally::{Tally, tally_for_room};

#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub room_id: Uuid,
    /// The option the voter is recorded as having chosen. On a duplicate
    /// submission this is the original choice, not the retried one.
    pub option_id: Uuid,
    pub tally: Tally,
    pub already_voted: bool,
}

/// Orchestrates a vote submission: resolve the voter, look up the room,
/// record atomically, then recompute and broadcast the tally.
///
/// The vote is the durable fact. Once `record_vote` has accepted, nothing
/// here rolls it back: broadcast is best-effort notification and a failed
/// tally read surfaces as a retryable error while the vote stays committed
/// (the retry resolves to `already_voted`).
pub async fn submit_vote(
    store: &dyn RoomStore,
    hub: &Hub,
    identity: &IdentityResolver,
    room_unique_id: &str,
    option_id: Uuid,
    bearer: Option<&str>,
    guest_id: Option<&str>,
) -> Result<VoteOutcome, VoteError> {
    let voter = identity.resolve(bearer, guest_id)?;
    let room = store.room_by_unique_id(room_unique_id).await?;

    match store.record_vote(room.id, &voter, option_id).await? {
        RecordOutcome::Accepted => {
            let tally = match tally_for_room(store, &room).await {
                Ok(tally) => tally,
                Err(e) => {
                    warn!(
                        "tally recompute failed after accepted vote in room {}: {}",
                        room.unique_id, e
                    );
                    return Err(e.into());
                }
            };
            info!("vote recorded in room {} by {}", room.unique_id, voter);
            hub.publish(room.id, RoomEvent::TallyUpdated(tally.clone()));
            hub.publish_lobby(LobbyEvent::RoomChanged(room.id));
            Ok(VoteOutcome {
                room_id: room.id,
                option_id,
                tally,
                already_voted: false,
            })
        }
        RecordOutcome::Duplicate {
            option_id: existing,
        } => {
            let tally = tally_for_room(store, &room).await?;
            Ok(VoteOutcome {
                room_id: room.id,
                option_id: existing,
                tally,
                already_voted: true,
            })
        }
    }
}
