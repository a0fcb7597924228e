use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::store::{Room, RoomOption, RoomStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option_id: Uuid,
    pub text: String,
    pub votes: i64,
}

/// Derived per-option counts plus total. Never persisted as authoritative;
/// recomputed from the committed vote set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub options: Vec<OptionTally>,
    pub total_votes: i64,
}

impl Tally {
    /// Counts follow the room's option order; options nobody picked appear
    /// with zero votes.
    pub fn compute(options: &[RoomOption], counts: &[(Uuid, i64)]) -> Self {
        let by_option: HashMap<Uuid, i64> = counts.iter().copied().collect();
        let options: Vec<OptionTally> = options
            .iter()
            .map(|option| OptionTally {
                option_id: option.id,
                text: option.text.clone(),
                votes: by_option.get(&option.id).copied().unwrap_or(0),
            })
            .collect();
        let total_votes = options.iter().map(|tally| tally.votes).sum();
        Tally {
            options,
            total_votes,
        }
    }

    pub fn count_for(&self, option_id: Uuid) -> Option<i64> {
        self.options
            .iter()
            .find(|tally| tally.option_id == option_id)
            .map(|tally| tally.votes)
    }
}

pub async fn tally_for_room(store: &dyn RoomStore, room: &Room) -> Result<Tally, StoreError> {
    let counts = store.vote_counts(room.id).await?;
    Ok(Tally::compute(&room.options, &counts))
}
