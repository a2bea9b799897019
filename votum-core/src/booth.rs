//! Polling-location reference data

use serde::{Deserialize, Serialize};

pub const DEFAULT_VOTING_START_HOUR: u32 = 9;
pub const DEFAULT_VOTING_END_HOUR: u32 = 17;
pub const DEFAULT_ACCEPTABLE_RADIUS_KM: f64 = 1.0;

/// A polling location as stored in the `booths` collection. Owned and
/// mutated by an external administrative process; this crate only
/// reads it. Defaults apply when a field is absent from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingLocation {
    #[serde(default = "default_start_hour")]
    pub voting_start_hour: u32,

    #[serde(default = "default_end_hour")]
    pub voting_end_hour: u32,

    pub latitude: f64,

    pub longitude: f64,

    #[serde(default = "default_radius_km")]
    pub acceptable_radius_km: f64,
}

impl PollingLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            voting_start_hour: DEFAULT_VOTING_START_HOUR,
            voting_end_hour: DEFAULT_VOTING_END_HOUR,
            latitude,
            longitude,
            acceptable_radius_km: DEFAULT_ACCEPTABLE_RADIUS_KM,
        }
    }
}

fn default_start_hour() -> u32 {
    DEFAULT_VOTING_START_HOUR
}

fn default_end_hour() -> u32 {
    DEFAULT_VOTING_END_HOUR
}

fn default_radius_km() -> f64 {
    DEFAULT_ACCEPTABLE_RADIUS_KM
}
