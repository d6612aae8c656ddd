//! The cache slot: one serialized entry in a key-value store, with a TTL.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use super::traits::CacheEntry;

/// Manages a single cache slot on top of a key-value storage backend.
///
/// The slot is overwritten wholesale on every store; there is no partial
/// update and no per-query partitioning.
pub struct CacheLayer<S: KeyValueStore> {
  storage: Arc<S>,
  key: String,
  /// How long before cached data is considered expired
  ttl: Duration,
}

impl<S: KeyValueStore> CacheLayer<S> {
  /// Create a cache layer storing its entry under `key`.
  pub fn new(storage: Arc<S>, key: impl Into<String>) -> Self {
    Self {
      storage,
      key: key.into(),
      ttl: Duration::hours(24),
    }
  }

  /// Set the time-to-live for cached data.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Check if an entry written at `timestamp` is past its TTL.
  pub fn is_expired(&self, timestamp: DateTime<Utc>) -> bool {
    Utc::now() - timestamp > self.ttl
  }

  /// Read the cached entry.
  ///
  /// A stored value that no longer parses is treated as a miss.
  pub fn load<T: DeserializeOwned>(&self) -> Result<Option<CacheEntry<T>>> {
    let raw = match self.storage.get(&self.key)? {
      Some(raw) => raw,
      None => return Ok(None),
    };

    match serde_json::from_str(&raw) {
      Ok(entry) => Ok(Some(entry)),
      Err(e) => {
        warn!(key = %self.key, error = %e, "Failed to parse cached data, ignoring cache");
        Ok(None)
      }
    }
  }

  /// Overwrite the slot with `payload`, stamped with the current time.
  pub fn store<T: Serialize>(&self, payload: T) -> Result<CacheEntry<T>> {
    let entry = CacheEntry {
      timestamp: Utc::now(),
      payload,
    };
    self.write(&entry)?;
    debug!(key = %self.key, timestamp = %entry.timestamp, "Data cached");
    Ok(entry)
  }

  /// Write an entry as-is, keeping its timestamp.
  pub fn write<T: Serialize>(&self, entry: &CacheEntry<T>) -> Result<()> {
    let raw =
      serde_json::to_string(entry).map_err(|e| eyre!("Failed to serialize cache entry: {}", e))?;
    self.storage.set(&self.key, &raw)
  }
}

impl<S: KeyValueStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      key: self.key.clone(),
      ttl: self.ttl,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Payload {
    items: Vec<u32>,
  }

  fn layer() -> (Arc<MemoryStorage>, CacheLayer<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let layer = CacheLayer::new(Arc::clone(&storage), "slot");
    (storage, layer)
  }

  #[test]
  fn test_missing_slot_is_none() {
    let (_, layer) = layer();
    assert!(layer.load::<Payload>().unwrap().is_none());
  }

  #[test]
  fn test_store_overwrites_wholesale() {
    let (_, layer) = layer();
    layer.store(Payload { items: vec![1, 2] }).unwrap();
    layer.store(Payload { items: vec![3] }).unwrap();

    let entry = layer.load::<Payload>().unwrap().unwrap();
    assert_eq!(entry.payload.items, vec![3]);
    assert!(!layer.is_expired(entry.timestamp));
  }

  #[test]
  fn test_corrupt_slot_is_treated_as_miss() {
    let (storage, layer) = layer();
    storage.set("slot", "{not json").unwrap();
    assert!(layer.load::<Payload>().unwrap().is_none());
  }

  #[test]
  fn test_entry_serializes_flat_with_millisecond_timestamp() {
    let (storage, layer) = layer();
    let entry = CacheEntry {
      timestamp: DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
      payload: Payload { items: vec![7] },
    };
    layer.write(&entry).unwrap();

    let raw = storage.get("slot").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["timestamp"], 1_700_000_000_123i64);
    assert_eq!(value["items"][0], 7);
    assert_eq!(layer.load::<Payload>().unwrap().unwrap(), entry);
  }

  #[test]
  fn test_expiry_is_a_hard_threshold() {
    let (_, layer) = layer();
    let layer = layer.with_ttl(Duration::hours(24));
    assert!(!layer.is_expired(Utc::now() - Duration::hours(23)));
    assert!(layer.is_expired(Utc::now() - Duration::hours(25)));
  }
}
