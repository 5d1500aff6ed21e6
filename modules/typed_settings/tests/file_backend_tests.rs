//! Settings store over the JSON file backend

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use typed_settings::keys::{
    bool_key_or, double_key_or, float_key_or, int_key_or, long_key_or, string_key_or,
    string_set_key_or,
};
use typed_settings::{BackendError, Config, SettingsError, SettingsStore};

mod common;
use common::*;

fn file_config(path: PathBuf) -> Config {
    Config {
        file_path: Some(path),
        pretty: true,
        grace_period: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path().join("settings.json"));

    print_test_header(
        "test_values_survive_reopen",
        &["Values written through one store are read back by a store opened later on the same file."],
    );

    println!("\n📝 Stage 1: Write through the first store");
    {
        let store = SettingsStore::open(&config).await.unwrap();
        store.set(&counter_key(), 5).await.unwrap();
        store.set(&status_key(), Status::Active).await.unwrap();
        store.set(&nickname_key(), "ferris".to_string()).await.unwrap();
        store.remove(&nickname_key()).await.unwrap();
    }

    println!("\n📝 Stage 2: Reopen and read");
    let store = SettingsStore::open(&config).await.unwrap();
    assert_eq!(store.read(&counter_key()).await.unwrap(), 5);
    assert_eq!(store.read(&status_key()).await.unwrap(), Some(Status::Active));
    assert_eq!(store.read(&nickname_key()).await.unwrap(), None);
}

#[tokio::test]
async fn test_file_holds_primitives_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let store = SettingsStore::open(&file_config(path.clone())).await.unwrap();

    store.set(&status_key(), Status::Inactive).await.unwrap();

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        document,
        serde_json::json!({"status": {"type": "string", "value": "I"}})
    );
}

#[tokio::test]
async fn test_corrupt_file_reads_defaults_and_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, b"[1, 2,").unwrap();

    let store = SettingsStore::open(&file_config(path.clone())).await.unwrap();

    // Reads degrade to defaults
    assert_eq!(store.read(&counter_key()).await.unwrap(), 0);
    assert_eq!(store.read(&status_key()).await.unwrap(), None);

    // Writes refuse to clobber what could not be read
    let result = store.set(&counter_key(), 1).await;
    assert!(matches!(result, Err(SettingsError::Backend(_))));
    assert_eq!(std::fs::read(&path).unwrap(), b"[1, 2,");
}

#[tokio::test]
async fn test_in_memory_when_no_file_configured() {
    let store = SettingsStore::open(&Config::default()).await.unwrap();

    store.set(&counter_key(), 3).await.unwrap();
    assert_eq!(store.read(&counter_key()).await.unwrap(), 3);

    let other = SettingsStore::open(&Config::default()).await.unwrap();
    assert_eq!(other.read(&counter_key()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_configured_sharing_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path().join("settings.json"));
    let store = SettingsStore::open(&config).await.unwrap();

    let shared = store.materialize(&counter_key(), config.sharing_policy(), -1);
    let subscription = shared.subscribe();

    store.set(&counter_key(), 9).await.unwrap();
    within(async {
        while shared.value() != 9 {
            tokio::task::yield_now().await;
        }
    })
    .await;

    drop(subscription);
    // Still inside the grace period
    assert!(shared.is_active());
}

#[tokio::test]
async fn test_every_kind_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path().join("settings.json"));

    print_test_header(
        "test_every_kind_survives_reopen",
        &["Edge values of every primitive kind are read back unchanged after a reopen."],
    );

    let flag = bool_key_or("flag", false);
    let small = int_key_or("small", 0);
    let large = int_key_or("large", 0);
    let long_min = long_key_or("long_min", 0);
    let long_max = long_key_or("long_max", 0);
    let float_max = float_key_or("float_max", 0.0);
    let float_tiny = float_key_or("float_tiny", 0.0);
    let double_min = double_key_or("double_min", 0.0);
    let double_tiny = double_key_or("double_tiny", 0.0);
    let text = string_key_or("text", "default".to_string());
    let tags = string_set_key_or("tags", BTreeSet::from(["default".to_string()]));

    let unicode = "\"quoted\" \\ naïve 🦀\n".to_string();
    let tag_values = BTreeSet::from(["".to_string(), "b".to_string(), "ä".to_string()]);

    println!("\n📝 Stage 1: Write edge values");
    {
        let store = SettingsStore::open(&config).await.unwrap();
        store
            .edit(|batch| {
                batch
                    .set(&flag, true)
                    .set(&small, i32::MIN)
                    .set(&large, i32::MAX)
                    .set(&long_min, i64::MIN)
                    .set(&long_max, i64::MAX)
                    .set(&float_max, f32::MAX)
                    .set(&float_tiny, f32::MIN_POSITIVE)
                    .set(&double_min, f64::MIN)
                    .set(&double_tiny, f64::EPSILON)
                    .set(&text, unicode.clone())
                    .set(&tags, tag_values.clone());
            })
            .await
            .unwrap();
    }

    println!("\n📝 Stage 2: Reopen and compare");
    let store = SettingsStore::open(&config).await.unwrap();
    assert!(store.read(&flag).await.unwrap());
    assert_eq!(store.read(&small).await.unwrap(), i32::MIN);
    assert_eq!(store.read(&large).await.unwrap(), i32::MAX);
    assert_eq!(store.read(&long_min).await.unwrap(), i64::MIN);
    assert_eq!(store.read(&long_max).await.unwrap(), i64::MAX);
    assert_eq!(store.read(&float_max).await.unwrap(), f32::MAX);
    assert_eq!(store.read(&float_tiny).await.unwrap(), f32::MIN_POSITIVE);
    assert_eq!(store.read(&double_min).await.unwrap(), f64::MIN);
    assert_eq!(store.read(&double_tiny).await.unwrap(), f64::EPSILON);
    assert_eq!(store.read(&text).await.unwrap(), unicode);
    assert_eq!(store.read(&tags).await.unwrap(), tag_values);

    println!("\n📝 Stage 3: An empty set is stored, not treated as absent");
    store.set(&tags, BTreeSet::new()).await.unwrap();
    let store = SettingsStore::open(&config).await.unwrap();
    assert!(store.read(&tags).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_finite_float_write_fails_without_damage() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path().join("settings.json"));
    let ratio = double_key_or("ratio", 1.0);
    let scale = float_key_or("scale", 1.0);

    print_test_header(
        "test_non_finite_float_write_fails_without_damage",
        &["NaN and infinity cannot be stored as JSON: the write fails and the file keeps working."],
    );

    let store = SettingsStore::open(&config).await.unwrap();
    store.set(&counter_key(), 5).await.unwrap();

    let result = store.set(&ratio, f64::NAN).await;
    assert!(matches!(
        result,
        Err(SettingsError::Backend(BackendError::Serialization(_)))
    ));
    let result = store.set(&scale, f32::NEG_INFINITY).await;
    assert!(matches!(
        result,
        Err(SettingsError::Backend(BackendError::Serialization(_)))
    ));
    assert_eq!(store.read(&ratio).await.unwrap(), 1.0);

    let store = SettingsStore::open(&config).await.unwrap();
    assert_eq!(store.read(&counter_key()).await.unwrap(), 5);
    assert_eq!(store.read(&ratio).await.unwrap(), 1.0);

    store.set(&counter_key(), 6).await.unwrap();
    assert_eq!(store.read(&counter_key()).await.unwrap(), 6);
}
