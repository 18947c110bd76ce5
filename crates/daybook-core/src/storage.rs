//! The `KeyValueStore` trait and the in-memory backend.
//!
//! The session is the only state that survives a restart. It is written as a
//! pair of string entries, see [`TOKEN_KEY`] and [`SUBJECT_KEY`]. Durable
//! backends (e.g. `daybook-store-sqlite`) implement the trait; higher layers
//! depend on this abstraction only.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex, MutexGuard},
};

/// Opaque credential token; present iff a session is authenticated.
pub const TOKEN_KEY: &str = "credential-token";
/// JSON-encoded [`Subject`](crate::session::Subject); present iff a session
/// is authenticated.
pub const SUBJECT_KEY: &str = "session-subject";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over durable string key-value storage.
///
/// Batch writes and removals must be applied together: a backend that can
/// fail midway should use a transaction.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read a single entry. Returns `None` if the key is absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Insert or overwrite every entry in `entries` as one unit.
  fn put_all(
    &self,
    entries: Vec<(String, String)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove every key in `keys` as one unit. Missing keys are ignored.
  fn remove_all(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A process-local store. Nothing survives the process; used for tests and
/// for running without a database file.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
    // A poisoned map still holds plain strings; keep using it.
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Number of stored entries.
  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.lock().is_empty() }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.lock().get(key).cloned())
  }

  async fn put_all(
    &self,
    entries: Vec<(String, String)>,
  ) -> Result<(), Infallible> {
    self.lock().extend(entries);
    Ok(())
  }

  async fn remove_all(&self, keys: Vec<String>) -> Result<(), Infallible> {
    let mut map = self.lock();
    for key in keys {
      map.remove(&key);
    }
    Ok(())
  }
}

/// Shared handles forward to the inner store, so one backend can serve a
/// store and an inspector (or two successive session stores) at once.
impl<T: KeyValueStore> KeyValueStore for Arc<T> {
  type Error = T::Error;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a {
    (**self).get(key)
  }

  fn put_all(
    &self,
    entries: Vec<(String, String)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    (**self).put_all(entries)
  }

  fn remove_all(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    (**self).remove_all(keys)
  }
}
