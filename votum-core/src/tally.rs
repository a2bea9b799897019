//! Per-booth aggregate counters

use serde::{Deserialize, Serialize};

use crate::submission::Gender;

/// Running totals for one booth, mutated only inside the store's
/// serializable read-modify-write. Invariant:
/// `total_male + total_female <= total_votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub booth_id: String,

    #[serde(default)]
    pub total_votes: u64,

    #[serde(default)]
    pub total_male: u64,

    #[serde(default)]
    pub total_female: u64,
}

impl Tally {
    pub fn empty(booth_id: &str) -> Self {
        Self {
            booth_id: booth_id.to_owned(),
            total_votes: 0,
            total_male: 0,
            total_female: 0,
        }
    }

    /// One transactional step: absent counters start from zero, then
    /// the vote and its gender counter are incremented
    pub fn apply_vote(current: Option<Tally>, booth_id: &str, gender: Gender) -> Tally {
        let mut next = current.unwrap_or_else(|| Self::empty(booth_id));

        next.total_votes += 1;

        match gender {
            Gender::Male => next.total_male += 1,
            Gender::Female => next.total_female += 1,
            Gender::Other => (),
        }

        next
    }

    /// Document id in the analytics collection
    pub fn doc_id(booth_id: &str) -> String {
        format!("booth_{booth_id}")
    }
}
