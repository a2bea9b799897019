//! Detection and recording of out-of-window and out-of-geofence votes
//!
//! Anomalies are advisory: they are persisted for audit and surfaced
//! through logging, but they never block the vote that triggered them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booth::PollingLocation;
use crate::geo;
use crate::submission::VoteSubmission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    VotingHours,
    Location,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::VotingHours => "voting_hours",
            AnomalyKind::Location => "location",
        }
    }
}

/// Measured values specific to each anomaly kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnomalyDetails {
    #[serde(rename_all = "camelCase")]
    VotingHours {
        vote_hour: u32,
        expected_start_hour: u32,
        expected_end_hour: u32,
    },

    #[serde(rename_all = "camelCase")]
    Location {
        voter_latitude: f64,
        voter_longitude: f64,
        booth_latitude: f64,
        booth_longitude: f64,
        distance_km: f64,
        acceptable_radius_km: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRecord {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub booth_id: String,
    pub voter_identifier: String,
    /// The submission timestamp exactly as the client sent it
    pub timestamp: String,
    #[serde(flatten)]
    pub details: AnomalyDetails,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AnomalyRecord {
    /// Document id in the anomalies collection: one record per voter
    /// per kind, last write wins
    pub fn doc_id(&self) -> String {
        format!("{}:{}", self.voter_identifier, self.kind.as_str())
    }
}

/// Flags a voting-hours anomaly when the vote hour falls outside the
/// booth's window. The window is inclusive-start, exclusive-end: a
/// vote at exactly `votingEndHour:00` is out of window.
pub fn check_voting_hours(
    submission: &VoteSubmission,
    booth: &PollingLocation,
) -> Option<AnomalyRecord> {
    let vote_hour = submission.vote_hour();

    if vote_hour >= booth.voting_start_hour && vote_hour < booth.voting_end_hour {
        return None;
    }

    Some(AnomalyRecord {
        kind: AnomalyKind::VotingHours,
        booth_id: submission.booth_id.clone(),
        voter_identifier: submission.voter_id.clone(),
        timestamp: submission.raw_timestamp.clone(),
        details: AnomalyDetails::VotingHours {
            vote_hour,
            expected_start_hour: booth.voting_start_hour,
            expected_end_hour: booth.voting_end_hour,
        },
        message: format!(
            "Vote recorded outside expected hours (expected: {}:00 - {}:00, actual: {}:00)",
            booth.voting_start_hour, booth.voting_end_hour, vote_hour
        ),
        created_at: Utc::now(),
    })
}

/// Flags a location anomaly when the haversine distance to the booth
/// exceeds its acceptable radius. The comparison uses the unrounded
/// distance; rounding to 2 decimals applies to the message only.
pub fn check_geofence(
    submission: &VoteSubmission,
    booth: &PollingLocation,
) -> Option<AnomalyRecord> {
    let distance_km = geo::haversine_km(
        submission.latitude,
        submission.longitude,
        booth.latitude,
        booth.longitude,
    );

    if distance_km <= booth.acceptable_radius_km {
        return None;
    }

    Some(AnomalyRecord {
        kind: AnomalyKind::Location,
        booth_id: submission.booth_id.clone(),
        voter_identifier: submission.voter_id.clone(),
        timestamp: submission.raw_timestamp.clone(),
        details: AnomalyDetails::Location {
            voter_latitude: submission.latitude,
            voter_longitude: submission.longitude,
            booth_latitude: booth.latitude,
            booth_longitude: booth.longitude,
            distance_km,
            acceptable_radius_km: booth.acceptable_radius_km,
        },
        message: format!(
            "Vote recorded from a location {distance_km:.2} km away from the booth (acceptable radius: {} km)",
            booth.acceptable_radius_km
        ),
        created_at: Utc::now(),
    })
}

/// Evaluates both rules independently; a single submission may trigger
/// zero, one or both kinds
pub fn detect(submission: &VoteSubmission, booth: &PollingLocation) -> Vec<AnomalyRecord> {
    [
        check_voting_hours(submission, booth),
        check_geofence(submission, booth),
    ]
    .into_iter()
    .flatten()
    .collect()
}
