use thiserror::Error;

/// Failures surfaced by the sync layer and the remote stores it talks to.
#[derive(Debug, Error)]
pub enum SyncError {
  /// A mandatory network operation was attempted while offline.
  #[error("No internet connection. Cannot {0} while offline.")]
  Offline(&'static str),
  /// Offline with nothing cached to fall back on.
  #[error("No internet connection and no cached data available")]
  NoData,
  #[error("network error: {0}")]
  Network(String),
  #[error("API error ({status}): {message}")]
  Api { status: i64, message: String },
  #[error("parse error: {0}")]
  Parse(String),
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl SyncError {
  /// Connectivity errors, as opposed to failures reported by a server.
  pub fn is_connectivity(&self) -> bool {
    matches!(
      self,
      SyncError::Offline(_) | SyncError::NoData | SyncError::Network(_)
    )
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, SyncError::Api { status: 404, .. })
  }
}
