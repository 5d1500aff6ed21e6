//! Common test fixtures: keys, converters and a store over an in-memory backend

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use typed_settings::keys::{int_key, int_key_or, string_key, string_key_with, string_key_with_or};
use typed_settings::{
    converter, ConversionError, Converter, DefaultKey, InMemoryBackend, Key, SettingsStore,
};

/// Logical type stored through a string converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Inactive,
}

/// "A" <-> Active, "I" <-> Inactive, anything else is rejected
pub fn status_converter() -> impl Converter<Status, String> {
    converter(
        |status: &Status| match status {
            Status::Active => "A".to_string(),
            Status::Inactive => "I".to_string(),
        },
        |raw: String| match raw.as_str() {
            "A" => Ok(Status::Active),
            "I" => Ok(Status::Inactive),
            _ => Err(ConversionError::unrecognized(raw)),
        },
    )
}

pub fn counter_key() -> DefaultKey<i32> {
    int_key_or("counter", 0)
}

pub fn nickname_key() -> Key<String> {
    string_key("nickname")
}

pub fn status_key() -> Key<Status, String> {
    string_key_with("status", status_converter())
}

pub fn status_key_or_inactive() -> DefaultKey<Status, String> {
    string_key_with_or("status", status_converter(), Status::Inactive)
}

/// Raw view of the status slot, used to plant values the converter rejects
pub fn raw_status_key() -> Key<String> {
    string_key("status")
}

pub fn raw_counter_key() -> Key<i32> {
    int_key("counter")
}

/// Store over a fresh in-memory backend; the backend handle is returned for
/// failure injection
pub fn create_test_store() -> (SettingsStore, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let store = SettingsStore::new(backend.clone());
    (store, backend)
}

/// Await `future`, failing the test if it takes longer than a few seconds
pub async fn within<F: Future>(future: F) -> F::Output {
    match tokio::time::timeout(Duration::from_secs(5), future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out waiting for settings to settle"),
    }
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}
