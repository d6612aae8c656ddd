//! Sync layer between the datasheet and the local cache slot.
//!
//! Reads are cache-first with a TTL and fall back to whatever is cached when
//! the network read fails. Writes go straight to the datasheet and are
//! followed by a full refetch that replaces the cache; the cache is never
//! patched locally.

mod error;
pub mod payload;

pub use error::SyncError;

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::{CacheEntry, CacheLayer, CacheResult, KeyValueStore};
use crate::network::Connectivity;
use crate::table::{ExpenseFields, RecordSet, RecordStore, WriteRecord, WriteResponse};

/// Storage key of the record cache slot.
pub const CACHE_KEY_RECORDS: &str = "expenses_app_cache_records";

pub struct SyncLayer<S: KeyValueStore, R: RecordStore, C: Connectivity> {
  store: R,
  cache: CacheLayer<S>,
  network: Arc<C>,
}

impl<S, R, C> SyncLayer<S, R, C>
where
  S: KeyValueStore,
  R: RecordStore,
  C: Connectivity,
{
  pub fn new(store: R, cache: CacheLayer<S>, network: Arc<C>) -> Self {
    Self {
      store,
      cache,
      network,
    }
  }

  /// Load all records, normalized, with their provenance.
  ///
  /// 1. Forcing while offline silently downgrades to a normal read
  /// 2. Fresh cache is returned without a network call; expired cache is
  ///    returned when offline
  /// 3. Otherwise fetch, overwrite the cache, return fresh data
  /// 4. On any failure, return the cache regardless of age, if it exists
  pub async fn get_records(&self, force_refresh: bool) -> Result<CacheResult<RecordSet>, SyncError> {
    let online = self.network.is_online();
    let force_refresh = if force_refresh && !online {
      warn!("Force refresh requested but device is offline, using cache");
      false
    } else {
      force_refresh
    };

    match self.read(force_refresh, online).await {
      Ok(result) => Ok(result.map(RecordSet::normalized)),
      Err(err) => {
        error!(error = %err, "Failed to load records");
        match self.load_cache() {
          Some(entry) => {
            info!(cached_at = %entry.timestamp, "Using cached data as fallback");
            Ok(CacheResult::fallback(entry.payload.normalized(), entry.timestamp))
          }
          None => Err(err),
        }
      }
    }
  }

  async fn read(&self, force_refresh: bool, online: bool) -> Result<CacheResult<RecordSet>, SyncError> {
    if !force_refresh {
      if let Some(entry) = self.load_cache() {
        if !self.cache.is_expired(entry.timestamp) {
          info!(cached_at = %entry.timestamp, "Using cached data");
          return Ok(CacheResult::from_cache(entry.payload, entry.timestamp));
        }

        if !online {
          info!(cached_at = %entry.timestamp, "Offline mode: using expired cache data");
          return Ok(CacheResult::offline(entry.payload, entry.timestamp));
        }
      }
    }

    if !online {
      return Err(SyncError::NoData);
    }

    info!(force_refresh, "Fetching fresh data from datasheet");
    let fresh = self.store.list_records().await?;
    self.save_cache(&fresh);
    Ok(CacheResult::from_network(fresh))
  }

  /// Create a record, then resync the cache.
  pub async fn add_record(&self, fields: ExpenseFields) -> Result<WriteResponse, SyncError> {
    self.ensure_online("add record")?;

    let record = WriteRecord {
      record_id: None,
      fields: payload::prepare_fields(fields),
    };
    let response = self.store.create_records(vec![record]).await?;
    info!("Create successful, fetching fresh data to update cache");
    self.resync().await?;

    Ok(response)
  }

  /// Update a record's fields, then resync the cache.
  pub async fn update_record(
    &self,
    record_id: &str,
    fields: ExpenseFields,
  ) -> Result<WriteResponse, SyncError> {
    self.ensure_online("update record")?;

    let record = WriteRecord {
      record_id: Some(record_id.to_string()),
      fields: payload::prepare_fields(fields),
    };
    let response = self.store.update_records(vec![record]).await?;
    info!(record_id, "Update successful, fetching fresh data to update cache");
    self.resync().await?;

    Ok(response)
  }

  /// Delete a record, then resync the cache.
  pub async fn delete_record(&self, record_id: &str) -> Result<WriteResponse, SyncError> {
    self.ensure_online("delete record")?;

    let response = self
      .store
      .delete_records(&[record_id.to_string()])
      .await?;
    info!(record_id, "Delete successful, fetching fresh data to update cache");
    self.resync().await?;

    Ok(response)
  }

  fn ensure_online(&self, action: &'static str) -> Result<(), SyncError> {
    if self.network.is_online() {
      Ok(())
    } else {
      Err(SyncError::Offline(action))
    }
  }

  /// Replace the cache with the full remote record set.
  ///
  /// A failed refetch is reported to the caller even though the write itself
  /// already landed; the cache is left untouched.
  async fn resync(&self) -> Result<(), SyncError> {
    let fresh = self.store.list_records().await.map_err(|e| {
      error!(error = %e, "Failed to refresh cache after write");
      e
    })?;
    self.save_cache(&fresh);
    Ok(())
  }

  /// Read the cache slot; storage failures count as a miss.
  fn load_cache(&self) -> Option<CacheEntry<RecordSet>> {
    self.cache.load().unwrap_or_else(|e| {
      warn!(error = %e, "Failed to read cache");
      None
    })
  }

  fn save_cache(&self, set: &RecordSet) {
    if let Err(e) = self.cache.store(set) {
      warn!(error = %e, "Failed to save data to cache");
    }
  }
}
