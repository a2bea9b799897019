use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;

use votum_core::anomaly::AnomalyKind;
use votum_core::ingest::{Ingest, IngestConfig, IngestError};
use votum_core::store::{DocumentStore, ANALYTICS, ANOMALIES, BOOTHS};
use votum_core::submission::RawSubmission;
use votum_crypto::LocalKeyService;
use votum_store::{nested_path, MemoryStore};

const KEY_NAME: &str = "vote-encryption-key";
const KEY_MATERIAL: [u8; 32] = [7u8; 32];
const CANDIDATE: &str = "candidate-alpha-42";

async fn pipeline() -> (Arc<MemoryStore>, Ingest<Arc<MemoryStore>, LocalKeyService>) {
    let store = Arc::new(MemoryStore::new());

    store
        .seed(
            BOOTHS,
            "B1",
            json!({
                "votingStartHour": 9,
                "votingEndHour": 17,
                "latitude": 10.0,
                "longitude": 20.0,
                "acceptableRadiusKm": 1.0,
            }),
        )
        .await;

    let keys = LocalKeyService::new().with_key(KEY_NAME, KEY_MATERIAL);

    let ingest = Ingest::new(
        store.clone(),
        keys,
        IngestConfig {
            key_name: KEY_NAME.into(),
        },
    );

    (store, ingest)
}

fn submission() -> RawSubmission {
    RawSubmission {
        candidate_id: Some(CANDIDATE.into()),
        booth_id: Some("B1".into()),
        timestamp: Some("2026-08-23T10:30:00+00:00".into()),
        gender: Some("male".into()),
        latitude: Some(10.0),
        longitude: Some(20.0),
        voter_identifier: Some("V1".into()),
    }
}

async fn side_effect_count(store: &MemoryStore) -> usize {
    store.count(ANOMALIES).await
        + store.count(&nested_path("votes", "B1", "booth")).await
        + store.count(ANALYTICS).await
}

#[tokio::test]
async fn happy_path_records_vote_and_counters() {
    let (store, ingest) = pipeline().await;

    let receipt = ingest.submit(submission()).await.unwrap();

    assert_eq!(receipt.booth_id, "B1");
    assert!(receipt.anomalies.is_empty());
    assert_eq!(store.count(ANOMALIES).await, 0);

    assert_eq!(store.count(&nested_path("votes", "B1", "booth")).await, 1);

    let tally = store.get(ANALYTICS, "booth_B1").await.unwrap().unwrap();
    assert_eq!(tally["boothId"], "B1");
    assert_eq!(tally["totalVotes"], 1);
    assert_eq!(tally["totalMale"], 1);
    assert_eq!(tally["totalFemale"], 0);
}

#[tokio::test]
async fn validation_failure_leaves_no_side_effects() {
    let (store, ingest) = pipeline().await;

    let raw = RawSubmission {
        candidate_id: None,
        ..submission()
    };

    let reason = ingest.submit(raw).await.unwrap_err();

    assert!(matches!(reason, IngestError::Validation(_)));
    assert!(reason.is_rejection());
    assert_eq!(side_effect_count(&store).await, 0);
}

#[tokio::test]
async fn out_of_range_coordinates_leave_no_side_effects() {
    let (store, ingest) = pipeline().await;

    let raw = RawSubmission {
        latitude: Some(95.0),
        ..submission()
    };

    assert!(ingest.submit(raw).await.is_err());
    assert_eq!(side_effect_count(&store).await, 0);
}

#[tokio::test]
async fn unknown_booth_is_rejected_without_side_effects() {
    let (store, ingest) = pipeline().await;

    let raw = RawSubmission {
        booth_id: Some("B9".into()),
        ..submission()
    };

    let result = ingest.submit(raw).await;

    match result {
        Err(IngestError::UnknownBooth(id)) => assert_eq!(id, "B9"),
        other => panic!("expected unknown booth, got {other:?}"),
    }

    assert_eq!(side_effect_count(&store).await, 0);
}

#[tokio::test]
async fn anomalous_submission_is_flagged_but_still_counted() {
    let (store, ingest) = pipeline().await;

    // hour 7 and ~4.4 km off the geofence
    let raw = RawSubmission {
        timestamp: Some("2026-08-23T07:00:00+00:00".into()),
        latitude: Some(10.04),
        ..submission()
    };

    let receipt = ingest.submit(raw).await.unwrap();

    assert_eq!(
        receipt.anomalies,
        vec![AnomalyKind::VotingHours, AnomalyKind::Location]
    );

    assert_eq!(store.count(ANOMALIES).await, 2);

    let hours = store.get(ANOMALIES, "V1:voting_hours").await.unwrap().unwrap();
    assert_eq!(hours["voteHour"], 7);
    assert_eq!(hours["expectedStartHour"], 9);
    assert_eq!(hours["expectedEndHour"], 17);

    let location = store.get(ANOMALIES, "V1:location").await.unwrap().unwrap();
    assert_eq!(location["boothId"], "B1");
    assert!(location["distanceKm"].as_f64().unwrap() > 1.0);

    // the vote still lands
    let tally = store.get(ANALYTICS, "booth_B1").await.unwrap().unwrap();
    assert_eq!(tally["totalVotes"], 1);
}

#[tokio::test]
async fn duplicate_anomaly_overwrites_instead_of_accumulating() {
    let (store, ingest) = pipeline().await;

    let early = RawSubmission {
        timestamp: Some("2026-08-23T08:00:00+00:00".into()),
        ..submission()
    };
    ingest.submit(early).await.unwrap();

    let late = RawSubmission {
        timestamp: Some("2026-08-23T18:00:00+00:00".into()),
        ..submission()
    };
    ingest.submit(late).await.unwrap();

    assert_eq!(store.count(ANOMALIES).await, 1);

    let record = store.get(ANOMALIES, "V1:voting_hours").await.unwrap().unwrap();
    assert_eq!(record["voteHour"], 18);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_do_not_lose_updates() {
    let (store, ingest) = pipeline().await;
    let ingest = Arc::new(ingest);

    let male = submission();
    let female = RawSubmission {
        gender: Some("female".into()),
        voter_identifier: Some("V2".into()),
        ..submission()
    };

    let first = tokio::spawn({
        let ingest = ingest.clone();
        async move { ingest.submit(male).await }
    });
    let second = tokio::spawn({
        let ingest = ingest.clone();
        async move { ingest.submit(female).await }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let tally = store.get(ANALYTICS, "booth_B1").await.unwrap().unwrap();
    assert_eq!(tally["totalVotes"], 2);
    assert_eq!(tally["totalMale"], 1);
    assert_eq!(tally["totalFemale"], 1);
}

#[tokio::test]
async fn corrupt_tally_document_fails_instead_of_resetting_counters() {
    let (store, ingest) = pipeline().await;

    store
        .seed(ANALYTICS, "booth_B1", json!({ "boothId": "B1", "totalVotes": "many" }))
        .await;

    let result = ingest.submit(submission()).await;

    match result {
        Err(IngestError::Store(_)) => (),
        other => panic!("expected store failure, got {other:?}"),
    }

    // the corrupt document survives for operators to inspect
    let doc = store.get(ANALYTICS, "booth_B1").await.unwrap().unwrap();
    assert_eq!(doc["totalVotes"], "many");
}

#[tokio::test]
async fn plaintext_candidate_never_reaches_the_store() {
    let (store, ingest) = pipeline().await;

    ingest.submit(submission()).await.unwrap();

    assert!(!store.contains_text(CANDIDATE).await);

    // the marker id is the base64 ciphertext and opens back to the
    // candidate under the same key
    let markers = store.ids(&nested_path("votes", "B1", "booth")).await;
    assert_eq!(markers.len(), 1);

    let sealed = BASE64.decode(&markers[0]).unwrap();
    let audit = LocalKeyService::new().with_key(KEY_NAME, KEY_MATERIAL);
    let opened = audit.open(KEY_NAME, &sealed).unwrap();

    assert_eq!(opened, CANDIDATE.as_bytes());
}

#[tokio::test]
async fn encryption_failure_aborts_before_any_vote_record() {
    let (store, _) = pipeline().await;

    // key service configured with a name the pipeline will not find
    let keys = LocalKeyService::new();
    let ingest = Ingest::new(
        store.clone(),
        keys,
        IngestConfig {
            key_name: KEY_NAME.into(),
        },
    );

    let result = ingest.submit(submission()).await;

    match result {
        Err(IngestError::Encryption(_)) => (),
        other => panic!("expected encryption failure, got {other:?}"),
    }

    assert_eq!(store.count(&nested_path("votes", "B1", "booth")).await, 0);
    assert_eq!(store.count(ANALYTICS).await, 0);
}
