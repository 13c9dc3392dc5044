use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tempfile::tempdir;

use customer_etl::app::ports::ObjectStorePort;
use customer_etl::app::transform_use_case::TransformUseCase;
use customer_etl::config::PipelineConfig;
use customer_etl::infra::fs_object_store::FsObjectStore;
use customer_etl::infra::memory_object_store::InMemoryObjectStore;
use customer_etl::trigger::{ObjectLocation, TriggerEvent};

const SOURCE_BUCKET: &str = "raw-exports";

fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
}

/// Rows shaped like the relational export: users joined with bank_accounts.
const EXPORT: &str = r#"[
  {"user_id": 1, "name": "Abhinav", "email": "abhinav@example.com", "age": 8, "signup_date": "2024-07-15",
   "account_number": "ACC1234567890", "balance": 1500.0, "debt": 200.0, "address": "123 Elm St"},
  {"user_id": 2, "name": "Bob Smith", "email": "bob.smith@example.com", "age": 35, "signup_date": "2022-11-23",
   "account_number": "ACC1234567891", "balance": 3500.0, "debt": 100.0, "address": "456 Oak St"},
  {"user_id": 4, "name": "Diana Prince", "email": "diana.prince@example.net", "age": null, "signup_date": "2024-01-05",
   "account_number": "ACC1234567893", "balance": null, "debt": 300.0, "address": "101 Maple St"},
  {"user_id": 11, "name": "Kelly Fox", "email": "kelly.fox@com", "age": 30, "signup_date": "2024-03-01",
   "account_number": "ACC123456789A", "balance": "1000.00", "debt": "50.00", "address": "808 Oak St"},
  {"user_id": 13, "name": "Mia Lee", "email": "mia.lee@example", "age": 40, "signup_date": "2024-06-01",
   "account_number": "ACC123456789C", "balance": -800.0, "debt": 100.0, "address": "1010 Birch St"},
  {"user_id": 19, "name": "Samuel Black", "email": "samuel.black@example.com", "age": 103, "signup_date": "2024-02-15",
   "account_number": "ACC1234567805", "balance": 200000.0, "debt": 300.0, "address": "1616 Willow St"}
]"#;

fn seeded_store(key: &str, body: &str) -> Arc<InMemoryObjectStore> {
    let store = Arc::new(InMemoryObjectStore::new());
    store
        .insert(ObjectLocation::new(SOURCE_BUCKET, key), body.as_bytes())
        .unwrap();
    store
}

fn rows(store: &InMemoryObjectStore, key: &str) -> Vec<Value> {
    let stored = store
        .object(&ObjectLocation::new("transformeds3sql", key))
        .unwrap()
        .expect("destination object written");
    serde_json::from_slice(&stored.body).unwrap()
}

#[tokio::test]
async fn test_export_is_transformed_and_emitted() -> Result<()> {
    let store = seeded_store("data.json", EXPORT);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());

    let result = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "data.json"), reference_time())
        .await;
    assert!(result.is_success(), "{:?}", result);
    assert_eq!(
        result.message().as_deref(),
        Some("Data transformed and uploaded to transformeds3sql/transformed_data.json successfully")
    );

    let stored = store
        .object(&ObjectLocation::new("transformeds3sql", "transformed_data.json"))?
        .expect("destination object written");
    assert_eq!(stored.content_type.as_deref(), Some("application/json"));

    let out = rows(&store, "transformed_data.json");
    let ids: Vec<i64> = out.iter().map(|r| r["user_id"].as_i64().unwrap()).collect();
    // 2 signed up too long ago, 13 has a negative balance
    assert_eq!(ids, vec![1, 4, 11, 19]);

    // Diana: age imputed from the batch mean (8+35+30+40+103)/5, balance filled with 0
    let diana = &out[1];
    assert_eq!(diana["age"], 43.2);
    assert_eq!(diana["age_group"], "40-44");
    assert_eq!(diana["balance"], 0.0);
    assert_eq!(diana["balance_inr"], 0.0);
    assert_eq!(diana["balance_group"], "0K-50K");
    assert_eq!(diana["signup_date"], "2024-01-05");

    // Kelly: malformed-looking email is kept, only flagged
    let kelly = &out[2];
    assert_eq!(kelly["valid_email"], false);
    assert_eq!(kelly["balance"], 1000.0);
    assert_eq!(kelly["balance_inr"], 85000.0);
    assert_eq!(kelly["balance_group"], "50K-100K");

    // Abhinav: under 18, advisory only; a whole age stays an integer
    assert_eq!(out[0]["age"], 8);
    assert_eq!(out[0]["age_constraints"], false);
    assert_eq!(out[0]["age_group"], "5-9");

    // Samuel: both groups out of range -> null, row retained
    let samuel = &out[3];
    assert!(samuel["age_group"].is_null());
    assert!(samuel["balance_group"].is_null());
    assert_eq!(samuel["age_constraints"], false);
    assert_eq!(samuel["valid_email"], true);

    for row in &out {
        assert!(row["balance"].as_f64().unwrap() >= 0.0);
        assert!(row["debt"].as_f64().unwrap() >= 0.0);
    }
    Ok(())
}

#[tokio::test]
async fn test_report_aggregates_match_output() -> Result<()> {
    let store = seeded_store("data.json", EXPORT);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());

    let report = use_case
        .run(&ObjectLocation::new(SOURCE_BUCKET, "data.json"), reference_time())
        .await?;
    assert_eq!(report.rows_ingested, 6);
    assert_eq!(report.rows_after_recency, 5);
    assert_eq!(report.rows_emitted, 4);

    let summary = &report.summary;
    assert_eq!(summary.dropped_negative_balance, 1);
    assert_eq!(summary.invalid_email_count, 1);
    assert_eq!(summary.under_18_count, 1);

    let out = rows(&store, "transformed_data.json");
    let with_age_group = out.iter().filter(|r| !r["age_group"].is_null()).count();
    let with_balance_group = out.iter().filter(|r| !r["balance_group"].is_null()).count();
    assert_eq!(summary.age_group_counts.total(), with_age_group);
    assert_eq!(summary.balance_group_counts.total(), with_balance_group);
    Ok(())
}

#[tokio::test]
async fn test_same_input_and_reference_time_is_byte_identical() -> Result<()> {
    let store = seeded_store("data.json", EXPORT);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());
    let source = ObjectLocation::new(SOURCE_BUCKET, "data.json");

    let first = use_case.run(&source, reference_time()).await?;
    let first_body = store.get(&first.destination).await?;
    let second = use_case.run(&source, reference_time()).await?;
    let second_body = store.get(&second.destination).await?;

    assert_eq!(first.output_sha256, second.output_sha256);
    assert_eq!(first_body, second_body);
    Ok(())
}

#[tokio::test]
async fn test_recency_window_moves_with_reference_time() -> Result<()> {
    // Same input, later "now": fewer signups fall inside the window
    let store = seeded_store("data.json", EXPORT);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());
    let later = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

    let report = use_case
        .run(&ObjectLocation::new(SOURCE_BUCKET, "data.json"), later)
        .await?;
    let out = rows(&store, "transformed_data.json");
    let ids: Vec<i64> = out.iter().map(|r| r["user_id"].as_i64().unwrap()).collect();
    // 11 signed up exactly at the cutoff and is excluded; 13 passes the window but is dropped
    assert_eq!(ids, vec![1]);
    assert_eq!(report.rows_after_recency, 2);
    Ok(())
}

#[tokio::test]
async fn test_unparseable_date_writes_nothing() {
    let body = r#"[{"user_id": 1, "age": 30, "balance": 10, "debt": 0, "email": "a@b.com", "signup_date": "not-a-date"}]"#;
    let store = seeded_store("bad.json", body);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());

    let result = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "bad.json"), reference_time())
        .await;
    assert_eq!(result.status_code, 500);
    assert!(result.message().unwrap().starts_with("Error processing file:"));
    let destination = ObjectLocation::new("transformeds3sql", "transformed_bad.json");
    assert!(!store.contains(&destination).unwrap());
    assert_eq!(store.object_count().unwrap(), 1);
}

#[tokio::test]
async fn test_missing_source_and_invalid_json_fail() {
    let store = seeded_store("broken.json", "{not json");
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());

    let missing = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "absent.json"), reference_time())
        .await;
    assert_eq!(missing.status_code, 500);
    assert!(missing.message().unwrap().contains("Object not found: raw-exports/absent.json"));

    let broken = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "broken.json"), reference_time())
        .await;
    assert_eq!(broken.status_code, 500);
    assert!(broken.message().unwrap().contains("JSON deserialization failed"));
    assert_eq!(store.object_count().unwrap(), 1);
}

#[tokio::test]
async fn test_batch_without_any_age_fails() {
    let body = r#"[{"user_id": 1, "age": null, "signup_date": "2024-06-01"}]"#;
    let store = seeded_store("no_ages.json", body);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());
    let result = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "no_ages.json"), reference_time())
        .await;
    assert_eq!(result.status_code, 500);
    assert!(result.message().unwrap().contains("no ages present"));
}

#[tokio::test]
async fn test_empty_export_writes_nothing() {
    let store = seeded_store("empty.json", "[]");
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());
    let result = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "empty.json"), reference_time())
        .await;
    assert_eq!(result.status_code, 500);
    assert!(result.message().unwrap().contains("no ages present"));
    let destination = ObjectLocation::new("transformeds3sql", "transformed_empty.json");
    assert!(!store.contains(&destination).unwrap());
    assert_eq!(store.object_count().unwrap(), 1);
}

#[tokio::test]
async fn test_balance_too_large_to_convert_fails() {
    let body = r#"[{"user_id": 7, "age": 30, "balance": 1e307, "debt": 0,
        "email": "big@example.com", "signup_date": "2024-06-01"}]"#;
    let store = seeded_store("huge.json", body);
    let use_case = TransformUseCase::new(store.clone(), &PipelineConfig::default());
    let result = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "huge.json"), reference_time())
        .await;
    assert_eq!(result.status_code, 500);
    assert!(result.message().unwrap().contains("Malformed balance"));
    assert_eq!(store.object_count().unwrap(), 1);
}

#[tokio::test]
async fn test_filesystem_store_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let source_dir = dir.path().join(SOURCE_BUCKET).join("exports");
    std::fs::create_dir_all(&source_dir)?;
    std::fs::write(source_dir.join("data.json"), EXPORT)?;

    let store = Arc::new(FsObjectStore::new(dir.path()));
    let use_case = TransformUseCase::new(store, &PipelineConfig::default());
    let result = use_case
        .handle(&TriggerEvent::for_object(SOURCE_BUCKET, "exports/data.json"), reference_time())
        .await;
    assert!(result.is_success(), "{:?}", result);

    let written = dir.path().join("transformeds3sql/transformed_exports/data.json");
    let out: Vec<Value> = serde_json::from_slice(&std::fs::read(written)?)?;
    assert_eq!(out.len(), 4);

    // Source untouched
    assert_eq!(std::fs::read_to_string(source_dir.join("data.json"))?, EXPORT);
    Ok(())
}
