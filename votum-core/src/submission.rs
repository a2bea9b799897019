//! Wire-level submissions and their validation into well-typed votes

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid latitude value, must be a number between -90 and 90")]
    LatitudeOutOfRange,

    #[error("invalid longitude value, must be a number between -180 and 180")]
    LongitudeOutOfRange,

    #[error("invalid timestamp value, must be ISO-8601 or an epoch integer")]
    UnparsableTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Unconstrained strings are accepted; anything that is not an
    /// exact match maps to `Other`
    pub fn parse(value: &str) -> Self {
        match value {
            "male" => Self::Male,
            "female" => Self::Female,
            _ => Self::Other,
        }
    }
}

/// A submission as it arrives on the wire, before any validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubmission {
    pub candidate_id: Option<String>,
    pub booth_id: Option<String>,
    pub timestamp: Option<String>,
    pub gender: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub voter_identifier: Option<String>,
}

/// A fully validated submission. All fields are present and
/// range-checked before any side effect occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSubmission {
    pub candidate_id: String,
    pub booth_id: String,
    pub timestamp: DateTime<FixedOffset>,
    /// The timestamp exactly as submitted, echoed into anomaly records
    pub raw_timestamp: String,
    pub gender: Gender,
    pub latitude: f64,
    pub longitude: f64,
    /// Sensitive: keys anomaly records, never persisted in vote records
    pub voter_id: String,
}

impl VoteSubmission {
    /// Hour of day in the offset the client submitted, used by the
    /// voting-window rule
    pub fn vote_hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

impl RawSubmission {
    /// Fails fast on the first violated constraint. Presence checks run
    /// in field order, then latitude range, longitude range and
    /// timestamp parseability.
    pub fn validate(self) -> Result<VoteSubmission, ValidationError> {
        let candidate_id = required("candidateId", &self.candidate_id)?.to_owned();
        let booth_id = required("boothId", &self.booth_id)?.to_owned();
        let raw_timestamp = required("timestamp", &self.timestamp)?.to_owned();
        let gender = Gender::parse(required("gender", &self.gender)?);

        let latitude = self
            .latitude
            .ok_or(ValidationError::MissingField("latitude"))?;

        let longitude = self
            .longitude
            .ok_or(ValidationError::MissingField("longitude"))?;

        let voter_id = required("voterIdentifier", &self.voter_identifier)?.to_owned();

        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange);
        }

        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange);
        }

        let timestamp =
            parse_timestamp(&raw_timestamp).ok_or(ValidationError::UnparsableTimestamp)?;

        Ok(VoteSubmission {
            candidate_id,
            booth_id,
            timestamp,
            raw_timestamp,
            gender,
            latitude,
            longitude,
            voter_id,
        })
    }
}

fn required<'a>(
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ValidationError> {
    match value.as_deref() {
        Some(inner) if !inner.is_empty() => Ok(inner),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Integer magnitudes past this point are epoch milliseconds (1e11
/// seconds lands in year 5138, so the ranges never overlap)
const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    let epoch: i64 = value.parse().ok()?;

    let parsed: Option<DateTime<Utc>> = if epoch.unsigned_abs() >= EPOCH_MILLIS_CUTOFF as u64 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };

    parsed.map(|utc| utc.fixed_offset())
}
