use dumpsync::state::{AppliedRecord, ApplyOutcome, StateStore};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

fn temp_state_url(tag: &str) -> String {
    let tmp_dir = std::env::temp_dir();
    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    tag.hash(&mut hasher);
    let db_path = tmp_dir.join(format!("test_dumpsync_state_{}_{}.sqlite", tag, hasher.finish()));
    format!("sqlite:{}", db_path.to_str().unwrap())
}

fn sample_record() -> AppliedRecord {
    AppliedRecord {
        artifact_fingerprint: "ab".repeat(32),
        applied_db_name: "seed".to_string(),
        applied_db_user: "owner".to_string(),
        applied_at: chrono::Utc::now(),
        outcome: ApplyOutcome::Success,
    }
}

#[tokio::test]
async fn fresh_store_loads_empty() {
    let store = StateStore::open(&temp_state_url("fresh")).await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn save_then_load_round_trips_every_field() {
    let store = StateStore::open(&temp_state_url("roundtrip")).await.unwrap();

    let record = sample_record();
    store.save(&record).await.unwrap();

    let loaded = store.load().await.unwrap().expect("record present");
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn save_overwrites_the_single_record() {
    let store = StateStore::open(&temp_state_url("overwrite")).await.unwrap();

    store.save(&sample_record()).await.unwrap();

    let second = AppliedRecord {
        artifact_fingerprint: "cd".repeat(32),
        applied_db_name: "other".to_string(),
        applied_db_user: "other_owner".to_string(),
        applied_at: chrono::Utc::now(),
        outcome: ApplyOutcome::Failed,
    };
    store.save(&second).await.unwrap();

    let loaded = store.load().await.unwrap().expect("record present");
    assert_eq!(loaded, second);
}

#[tokio::test]
async fn record_survives_reopening_the_store() {
    let url = temp_state_url("reopen");
    let record = sample_record();

    {
        let store = StateStore::open(&url).await.unwrap();
        store.save(&record).await.unwrap();
    }

    let reopened = StateStore::open(&url).await.unwrap();
    assert_eq!(reopened.load().await.unwrap(), Some(record));
}

#[test]
fn matches_gates_on_fingerprint_target_and_outcome() {
    let record = sample_record();
    let fp = record.artifact_fingerprint.clone();

    assert!(record.matches(&fp, "seed", "owner"));
    assert!(!record.matches("deadbeef", "seed", "owner"));
    assert!(!record.matches(&fp, "other", "owner"));
    assert!(!record.matches(&fp, "seed", "other"));

    let failed = AppliedRecord {
        outcome: ApplyOutcome::Failed,
        ..record
    };
    assert!(!failed.matches(&fp, "seed", "owner"));
}
