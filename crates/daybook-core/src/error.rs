//! Error types for `daybook-core`.
//!
//! Validation and not-found errors never leave a manager half-mutated: when
//! one is returned the operation was a no-op and callers are free to ignore
//! it.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Input failed a structural check; the named field is the culprit.
  #[error("rejected: {0} must not be empty")]
  ValidationRejected(&'static str),

  /// A count that must be at least one was zero.
  #[error("rejected: {0} must be at least 1")]
  NotPositive(&'static str),

  #[error("habit not found: {0}")]
  HabitNotFound(Uuid),

  #[error("note not found: {0}")]
  NoteNotFound(Uuid),

  #[error("task not found: {0}")]
  TaskNotFound(Uuid),

  #[error("no active session")]
  NoSession,

  #[error("remote call failed: {0}")]
  RemoteCallFailed(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// `true` for the failures that leave state untouched and are safe to
  /// swallow at the presentation layer.
  pub fn is_noop(&self) -> bool {
    matches!(
      self,
      Self::ValidationRejected(_)
        | Self::NotPositive(_)
        | Self::HabitNotFound(_)
        | Self::NoteNotFound(_)
        | Self::TaskNotFound(_)
        | Self::NoSession
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
