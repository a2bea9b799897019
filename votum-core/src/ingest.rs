//! The per-request ingestion pipeline
//!
//! One submission runs validate → detect anomalies → encrypt + write
//! marker → tally update, strictly in that order. Anomaly detection
//! has side effects but never blocks the vote; validation and booth
//! lookup reject before any side effect occurs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::anomaly::{self, AnomalyKind};
use crate::booth::PollingLocation;
use crate::kms::{KeyService, KeyServiceError};
use crate::store::{self, DocumentStore, StoreError};
use crate::submission::{RawSubmission, ValidationError};
use crate::tally::Tally;

/// Fixed identifiers handed to the pipeline at startup instead of
/// being embedded as constants
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Resource name of the vote encryption key, passed verbatim to
    /// the key service on every encrypt call
    pub key_name: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("booth with id {0} does not exist")]
    UnknownBooth(String),

    #[error("vote encryption failed")]
    Encryption(#[source] KeyServiceError),

    #[error("document store failure")]
    Store(#[source] StoreError),
}

impl IngestError {
    /// Rejections are the caller's fault and occur before any side
    /// effect; everything else is a dependency failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            IngestError::Validation(_) | IngestError::UnknownBooth(_)
        )
    }
}

/// Successful acknowledgment, listing the anomaly kinds that were
/// flagged (and already persisted) along the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub booth_id: String,
    pub anomalies: Vec<AnomalyKind>,
}

/// Ingestion pipeline wired to its two external capabilities. It holds
/// no per-request state: concurrency safety across submissions is
/// delegated entirely to the store's read-modify-write primitive.
pub struct Ingest<S, K> {
    store: S,
    keys: K,
    config: IngestConfig,
}

impl<S, K> Ingest<S, K>
where
    S: DocumentStore + Sync,
    K: KeyService + Sync,
{
    pub fn new(store: S, keys: K, config: IngestConfig) -> Self {
        Self {
            store,
            keys,
            config,
        }
    }

    pub async fn submit(&self, raw: RawSubmission) -> Result<Receipt, IngestError> {
        let submission = raw.validate()?;

        debug!(booth = %submission.booth_id, "submission validated");

        let booth = self.lookup_booth(&submission.booth_id).await?;

        let anomalies = anomaly::detect(&submission, &booth);

        for record in &anomalies {
            warn!(
                kind = record.kind.as_str(),
                booth = %record.booth_id,
                "anomaly detected"
            );

            let fields = serde_json::to_value(record).unwrap();

            self.store
                .upsert_merge(store::ANOMALIES, &record.doc_id(), fields)
                .await
                .map_err(IngestError::Store)?;
        }

        let ciphertext = self
            .keys
            .encrypt(&self.config.key_name, submission.candidate_id.as_bytes())
            .await
            .map_err(IngestError::Encryption)?;

        let marker_id = BASE64.encode(&ciphertext);

        self.store
            .set_nested(
                store::VOTES,
                &submission.booth_id,
                store::VOTES_SUBCOLLECTION,
                &marker_id,
                json!({}),
            )
            .await
            .map_err(IngestError::Store)?;

        debug!(booth = %submission.booth_id, "vote marker written");

        let doc_id = Tally::doc_id(&submission.booth_id);
        let booth_id = submission.booth_id.clone();
        let gender = submission.gender;
        let codec_id = doc_id.clone();

        let updated = self
            .store
            .read_modify_write(store::ANALYTICS, &doc_id, move |current| {
                let current = current
                    .map(|doc| {
                        serde_json::from_value::<Tally>(doc).map_err(|_| StoreError::Codec {
                            collection: store::ANALYTICS.to_owned(),
                            id: codec_id,
                        })
                    })
                    .transpose()?;

                Ok(serde_json::to_value(Tally::apply_vote(current, &booth_id, gender)).unwrap())
            })
            .await;

        if let Err(reason) = &updated {
            // the marker is already durable at this point; the
            // resulting divergence between marker count and counters
            // is left for operators to reconcile
            error!(
                booth = %submission.booth_id,
                %reason,
                "tally update failed after vote write"
            );
        }

        updated.map_err(IngestError::Store)?;

        debug!(booth = %submission.booth_id, "aggregates updated");

        Ok(Receipt {
            booth_id: submission.booth_id,
            anomalies: anomalies.iter().map(|record| record.kind).collect(),
        })
    }

    async fn lookup_booth(&self, booth_id: &str) -> Result<PollingLocation, IngestError> {
        let doc = self
            .store
            .get(store::BOOTHS, booth_id)
            .await
            .map_err(IngestError::Store)?
            .ok_or_else(|| IngestError::UnknownBooth(booth_id.to_owned()))?;

        serde_json::from_value(doc).map_err(|_| {
            IngestError::Store(StoreError::Codec {
                collection: store::BOOTHS.to_owned(),
                id: booth_id.to_owned(),
            })
        })
    }
}
