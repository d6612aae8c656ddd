//! Core types for the caching system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single persisted cache slot: a payload plus the time it was written.
///
/// The payload is flattened, so a record set serializes as
/// `{"timestamp": <epoch ms>, "records": [...], "fields": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub timestamp: DateTime<Utc>,
  #[serde(flatten)]
  pub payload: T,
}

/// Result from a cache-aware read, including data and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data that is still within its TTL.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Create a new cache result for offline mode (expired cache, no network).
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheOffline,
      cached_at: Some(cached_at),
    }
  }

  /// Create a new cache result served because the network read failed.
  pub fn fallback(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFallback,
      cached_at: Some(cached_at),
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      cached_at: self.cached_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within TTL
  Cache,
  /// Offline mode - cache expired but network unavailable
  CacheOffline,
  /// Network read failed, serving whatever the cache holds
  CacheFallback,
}

impl CacheSource {
  pub fn describe(self) -> &'static str {
    match self {
      CacheSource::Network => "fresh from server",
      CacheSource::Cache => "from cache",
      CacheSource::CacheOffline => "from expired cache (offline)",
      CacheSource::CacheFallback => "from cache (server unreachable)",
    }
  }
}
