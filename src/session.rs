//! Phone-number sign-in against a static allow-list.
//!
//! Any well-formed phone number gets in; only allow-listed numbers may
//! change records. The session is the bare phone number in local storage.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::KeyValueStore;
use crate::config::AuthorizedUser;
use crate::table::ExpenseRecord;

/// Storage key of the persisted session.
pub const STORAGE_KEY_PHONE: &str = "expenses_app_phone";

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("Enter a valid phone number: 10 digits starting with 05")]
  InvalidPhone,
  #[error("Not signed in")]
  NotSignedIn,
  #[error("Read-only access: changes are not allowed for this number")]
  ReadOnly,
  #[error("Records from year {0} cannot be changed")]
  LockedYear(String),
  #[error("session storage error: {0}")]
  Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
  pub phone: String,
  /// Display name, when the number is allow-listed
  pub name: Option<String>,
  pub read_only: bool,
}

pub struct Session<S: KeyValueStore> {
  storage: Arc<S>,
  users: Vec<AuthorizedUser>,
  locked_years: Vec<String>,
}

impl<S: KeyValueStore> Session<S> {
  pub fn new(storage: Arc<S>, users: Vec<AuthorizedUser>, locked_years: Vec<String>) -> Self {
    Self {
      storage,
      users,
      locked_years,
    }
  }

  /// Validate and persist a phone number.
  pub fn login(&self, phone: &str) -> Result<AuthenticatedUser, SessionError> {
    let phone = phone.trim();
    if !is_valid_phone(phone) {
      return Err(SessionError::InvalidPhone);
    }

    self
      .storage
      .set(STORAGE_KEY_PHONE, phone)
      .map_err(|e| SessionError::Storage(e.to_string()))?;

    let user = self.resolve(phone);
    info!(read_only = user.read_only, "Signed in");
    Ok(user)
  }

  /// Re-evaluate a persisted session against the current allow-list.
  pub fn restore(&self) -> Result<Option<AuthenticatedUser>, SessionError> {
    let phone = self
      .storage
      .get(STORAGE_KEY_PHONE)
      .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(phone.filter(|p| !p.is_empty()).map(|p| self.resolve(&p)))
  }

  /// The restored session, or `NotSignedIn`.
  pub fn current(&self) -> Result<AuthenticatedUser, SessionError> {
    self.restore()?.ok_or(SessionError::NotSignedIn)
  }

  pub fn logout(&self) -> Result<(), SessionError> {
    self
      .storage
      .remove(STORAGE_KEY_PHONE)
      .map_err(|e| SessionError::Storage(e.to_string()))?;
    info!("Signed out");
    Ok(())
  }

  /// Check that `user` may create records, or change `record` when given.
  pub fn ensure_can_write(
    &self,
    user: &AuthenticatedUser,
    record: Option<&ExpenseRecord>,
  ) -> Result<(), SessionError> {
    if user.read_only {
      return Err(SessionError::ReadOnly);
    }

    if let Some(year) = record.and_then(|r| r.fields.eid_year.as_deref()) {
      if self.locked_years.iter().any(|y| y == year) {
        warn!(year, "Refusing to change a record from a locked year");
        return Err(SessionError::LockedYear(year.to_string()));
      }
    }

    Ok(())
  }

  fn resolve(&self, phone: &str) -> AuthenticatedUser {
    match self.users.iter().find(|u| u.phone == phone) {
      Some(user) => AuthenticatedUser {
        phone: phone.to_string(),
        name: Some(user.name.clone()),
        read_only: false,
      },
      None => AuthenticatedUser {
        phone: phone.to_string(),
        name: None,
        read_only: true,
      },
    }
  }
}

/// `05` followed by eight digits.
fn is_valid_phone(phone: &str) -> bool {
  phone.len() == 10 && phone.starts_with("05") && phone.chars().all(|c| c.is_ascii_digit())
}
