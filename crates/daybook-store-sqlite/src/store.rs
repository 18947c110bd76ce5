//! [`SqliteStore`] — the SQLite implementation of [`KeyValueStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use daybook_core::storage::KeyValueStore;

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Daybook key-value store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of stored entries.
  pub async fn len(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM kv", [], |r| r.get(0))?)
      })
      .await?;
    Ok(usize::try_from(count).unwrap_or_default())
  }
}

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM kv WHERE key = ?1",
              rusqlite::params![key],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn put_all(&self, entries: Vec<(String, String)>) -> Result<()> {
    let count = entries.len();
    let at_str = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value      = excluded.value,
               updated_at = excluded.updated_at",
          )?;
          for (key, value) in &entries {
            stmt.execute(rusqlite::params![key, value, at_str])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::trace!(count, "kv entries written");
    Ok(())
  }

  async fn remove_all(&self, keys: Vec<String>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare("DELETE FROM kv WHERE key = ?1")?;
          for key in &keys {
            stmt.execute(rusqlite::params![key])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
