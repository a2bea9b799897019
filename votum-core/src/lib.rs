//! Ballot ingestion core: validation, anomaly detection, vote
//! encryption orchestration and aggregate tallies

pub mod anomaly;
pub mod booth;
pub mod geo;
pub mod ingest;
pub mod kms;
pub mod store;
pub mod submission;
pub mod tally;
