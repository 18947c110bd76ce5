//! [`SessionStore`] — the single source of truth for "who is logged in".
//!
//! The store is constructed explicitly with its storage and auth backend and
//! has a `restore` → (`login` | `register`) → `logout` lifecycle. State
//! transitions are published on a [`watch`] channel so a presentation layer
//! can react without polling.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tokio::sync::watch;

use crate::{
  Error, Result,
  auth::{AuthBackend, Credentials, Registration, RemotePolicy},
  storage::{KeyValueStore, SUBJECT_KEY, TOKEN_KEY},
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// The authenticated identity. Serialised as-is under
/// [`SUBJECT_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:    String,
  pub name:  String,
  pub email: String,
}

impl Subject {
  /// Build a subject whose id is derived from `email`.
  ///
  /// The id is the first 16 hex digits of the SHA-256 of the lower-cased
  /// address, so logging in twice with the same email yields the same id.
  pub fn for_email(name: impl Into<String>, email: &str) -> Self {
    let email = email.trim();
    let digest = Sha256::digest(email.to_lowercase().as_bytes());
    Self {
      id:    hex::encode(&digest[..8]),
      name:  name.into(),
      email: email.to_owned(),
    }
  }
}

/// A subject together with its opaque credential token. There is never a
/// token without a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub subject: Subject,
  pub token:   String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
  #[default]
  Unauthenticated,
  Loading,
  Authenticated(Session),
}

impl SessionState {
  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::Authenticated(session) => Some(session),
      _ => None,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

pub struct SessionStore<S, A> {
  storage: S,
  backend: A,
  policy:  RemotePolicy,
  state:   watch::Sender<SessionState>,
}

impl<S, A> SessionStore<S, A>
where
  S: KeyValueStore,
  A: AuthBackend,
{
  /// Create an unauthenticated store. Call [`restore`](Self::restore) once
  /// at startup to pick up a persisted session.
  pub fn new(storage: S, backend: A) -> Self {
    let (state, _) = watch::channel(SessionState::Unauthenticated);
    Self { storage, backend, policy: RemotePolicy::default(), state }
  }

  pub fn with_policy(mut self, policy: RemotePolicy) -> Self {
    self.policy = policy;
    self
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// Snapshot of the current state.
  pub fn state(&self) -> SessionState { self.state.borrow().clone() }

  pub fn subject(&self) -> Option<Subject> {
    self.state.borrow().session().map(|s| s.subject.clone())
  }

  pub fn token(&self) -> Option<String> {
    self.state.borrow().session().map(|s| s.token.clone())
  }

  pub fn is_authenticated(&self) -> bool {
    self.state.borrow().session().is_some()
  }

  /// Receive every subsequent state transition.
  pub fn subscribe(&self) -> watch::Receiver<SessionState> {
    self.state.subscribe()
  }

  // ── Lifecycle ───────────────────────────────────────────────────────────

  /// Load a persisted session, if any.
  ///
  /// Both entries must be present and the subject must decode; anything
  /// less leaves the store unauthenticated without raising an error.
  pub async fn restore(&self) -> Result<()> {
    self.state.send_replace(SessionState::Loading);

    let loaded = self.read_persisted().await;
    let next = match loaded {
      Ok(Some(session)) => {
        tracing::debug!(subject_id = %session.subject.id, "restored session");
        SessionState::Authenticated(session)
      }
      Ok(None) => SessionState::Unauthenticated,
      Err(e) => {
        self.state.send_replace(SessionState::Unauthenticated);
        return Err(e);
      }
    };
    self.state.send_replace(next);
    Ok(())
  }

  /// Log in with `email` and `password`.
  ///
  /// Only structural validation happens locally. The backend call is
  /// consulted according to the configured [`RemotePolicy`].
  pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
    let email = non_empty(email, "email")?;
    non_empty(password, "password")?;

    let previous = self.state.send_replace(SessionState::Loading);
    let credentials = Credentials {
      email:    email.to_owned(),
      password: password.to_owned(),
    };
    if let Err(e) = self.backend.login(&credentials).await {
      self.remote_failed("login", &e, &previous)?;
    }

    let subject = Subject::for_email(display_name(email), email);
    self.establish(subject, previous).await
  }

  /// Register a new account. Persists exactly like [`login`](Self::login)
  /// but uses `name` as the display name.
  pub async fn register(
    &self,
    name: &str,
    email: &str,
    password: &str,
  ) -> Result<Session> {
    let name = non_empty(name, "name")?;
    let email = non_empty(email, "email")?;
    non_empty(password, "password")?;

    let previous = self.state.send_replace(SessionState::Loading);
    let registration = Registration {
      name:     name.to_owned(),
      email:    email.to_owned(),
      password: password.to_owned(),
    };
    if let Err(e) = self.backend.register(&registration).await {
      self.remote_failed("register", &e, &previous)?;
    }

    let subject = Subject::for_email(name, email);
    self.establish(subject, previous).await
  }

  /// Forget the session, in storage and then in memory. Calling this while
  /// logged out is a no-op.
  ///
  /// The in-memory state only changes once both entries are gone, so a
  /// failed removal leaves the store as it was.
  pub async fn logout(&self) -> Result<()> {
    self
      .storage
      .remove_all(vec![TOKEN_KEY.to_owned(), SUBJECT_KEY.to_owned()])
      .await
      .map_err(storage_err)?;

    let previous = self.state.send_replace(SessionState::Unauthenticated);
    if let Some(session) = previous.session() {
      tracing::info!(subject_id = %session.subject.id, "logged out");
    }
    Ok(())
  }

  // ── Helpers ─────────────────────────────────────────────────────────────

  async fn read_persisted(&self) -> Result<Option<Session>> {
    let token = self.storage.get(TOKEN_KEY).await.map_err(storage_err)?;
    let raw_subject = self.storage.get(SUBJECT_KEY).await.map_err(storage_err)?;

    let (token, raw_subject) = match (token, raw_subject) {
      (Some(t), Some(s)) => (t, s),
      (None, None) => return Ok(None),
      _ => {
        tracing::warn!("persisted session is incomplete; ignoring it");
        return Ok(None);
      }
    };

    match serde_json::from_str::<Subject>(&raw_subject) {
      Ok(subject) => Ok(Some(Session { subject, token })),
      Err(e) => {
        tracing::warn!(error = %e, "persisted subject is unreadable; ignoring it");
        Ok(None)
      }
    }
  }

  /// Mint a token, persist the pair, then publish the new state. On storage
  /// failure the state reverts to `previous`.
  async fn establish(
    &self,
    subject: Subject,
    previous: SessionState,
  ) -> Result<Session> {
    let session = Session { token: synthesize_token(), subject };

    let encoded = match serde_json::to_string(&session.subject) {
      Ok(s) => s,
      Err(e) => {
        self.state.send_replace(previous);
        return Err(e.into());
      }
    };

    let written = self
      .storage
      .put_all(vec![
        (TOKEN_KEY.to_owned(), session.token.clone()),
        (SUBJECT_KEY.to_owned(), encoded),
      ])
      .await;
    if let Err(e) = written {
      self.state.send_replace(previous);
      return Err(storage_err(e));
    }

    tracing::info!(subject_id = %session.subject.id, "session established");
    self.state.send_replace(SessionState::Authenticated(session.clone()));
    Ok(session)
  }

  fn remote_failed(
    &self,
    operation: &'static str,
    error: &A::Error,
    previous: &SessionState,
  ) -> Result<()> {
    match self.policy {
      RemotePolicy::BestEffort => {
        tracing::warn!(
          %error,
          operation,
          "remote auth call failed; continuing with a local session"
        );
        Ok(())
      }
      RemotePolicy::Required => {
        tracing::warn!(%error, operation, "remote auth call failed");
        self.state.send_replace(previous.clone());
        Err(Error::RemoteCallFailed(error.to_string()))
      }
    }
  }
}

fn storage_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Storage(Box::new(e))
}

fn non_empty<'a>(value: &'a str, field: &'static str) -> Result<&'a str> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::ValidationRejected(field));
  }
  Ok(trimmed)
}

/// The local part of an email address, or the whole address when it has no
/// usable local part.
fn display_name(email: &str) -> &str {
  match email.split_once('@') {
    Some((local, _)) if !local.is_empty() => local,
    _ => email,
  }
}

fn synthesize_token() -> String {
  let mut bytes = [0u8; 24];
  OsRng.fill_bytes(&mut bytes);
  format!("local_{}", URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    io,
    sync::{
      Arc, Mutex, OnceLock,
      atomic::{AtomicBool, AtomicUsize, Ordering},
    },
  };

  use super::*;
  use crate::{auth::NoBackend, storage::MemoryStore};

  /// Accepts every call and counts them.
  #[derive(Default)]
  struct CountingBackend {
    calls: AtomicUsize,
  }

  impl AuthBackend for CountingBackend {
    type Error = Infallible;

    async fn login(&self, _: &Credentials) -> Result<(), Infallible> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    async fn register(&self, _: &Registration) -> Result<(), Infallible> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  /// Notes the published session state each time it is called, once
  /// `rx` has been wired to the store under test.
  #[derive(Default)]
  struct StateRecorder {
    rx:   OnceLock<watch::Receiver<SessionState>>,
    seen: Mutex<Vec<SessionState>>,
  }

  impl StateRecorder {
    fn record(&self) {
      if let Some(rx) = self.rx.get() {
        let state = rx.borrow().clone();
        self.seen.lock().unwrap().push(state);
      }
    }

    fn seen(&self) -> Vec<SessionState> { self.seen.lock().unwrap().clone() }
  }

  impl AuthBackend for StateRecorder {
    type Error = Infallible;

    async fn login(&self, _: &Credentials) -> Result<(), Infallible> {
      self.record();
      Ok(())
    }

    async fn register(&self, _: &Registration) -> Result<(), Infallible> {
      self.record();
      Ok(())
    }
  }

  impl KeyValueStore for StateRecorder {
    type Error = Infallible;

    async fn get(&self, _: &str) -> Result<Option<String>, Infallible> {
      self.record();
      Ok(None)
    }

    async fn put_all(&self, _: Vec<(String, String)>) -> Result<(), Infallible> {
      Ok(())
    }

    async fn remove_all(&self, _: Vec<String>) -> Result<(), Infallible> {
      Ok(())
    }
  }

  /// A `MemoryStore` whose writes and removals can be switched to fail.
  #[derive(Default)]
  struct FaultyStore {
    inner:       MemoryStore,
    fail_put:    AtomicBool,
    fail_remove: AtomicBool,
  }

  impl KeyValueStore for FaultyStore {
    type Error = io::Error;

    async fn get(&self, key: &str) -> Result<Option<String>, io::Error> {
      Ok(self.inner.get(key).await.unwrap())
    }

    async fn put_all(
      &self,
      entries: Vec<(String, String)>,
    ) -> Result<(), io::Error> {
      if self.fail_put.load(Ordering::SeqCst) {
        return Err(io::Error::other("disk full"));
      }
      self.inner.put_all(entries).await.unwrap();
      Ok(())
    }

    async fn remove_all(&self, keys: Vec<String>) -> Result<(), io::Error> {
      if self.fail_remove.load(Ordering::SeqCst) {
        return Err(io::Error::other("disk gone"));
      }
      self.inner.remove_all(keys).await.unwrap();
      Ok(())
    }
  }

  fn offline(storage: Arc<MemoryStore>) -> SessionStore<Arc<MemoryStore>, NoBackend> {
    SessionStore::new(storage, NoBackend)
  }

  #[tokio::test]
  async fn restore_without_persisted_session() {
    let store = offline(Arc::default());
    store.restore().await.unwrap();
    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(store.token().is_none());
  }

  #[tokio::test]
  async fn login_then_restore_round_trips() {
    let storage = Arc::new(MemoryStore::new());
    let first = offline(storage.clone());
    let session = first.login("alice@example.com", "hunter2").await.unwrap();

    // Simulate a reload: a fresh store over the same storage.
    let second = offline(storage);
    second.restore().await.unwrap();
    assert_eq!(second.subject().unwrap().id, session.subject.id);
    assert_eq!(second.token().unwrap(), session.token);
  }

  #[tokio::test]
  async fn login_derives_name_from_local_part() {
    let store = offline(Arc::default());
    let session = store.login("  bob@example.com ", "pw").await.unwrap();
    assert_eq!(session.subject.name, "bob");
    assert_eq!(session.subject.email, "bob@example.com");
    assert!(session.token.starts_with("local_"));
    assert!(store.is_authenticated());
  }

  #[tokio::test]
  async fn login_rejects_blank_fields() {
    let storage = Arc::new(MemoryStore::new());
    let store = offline(storage.clone());

    let err = store.login("   ", "pw").await.unwrap_err();
    assert!(matches!(err, Error::ValidationRejected("email")));
    let err = store.login("a@b.c", "").await.unwrap_err();
    assert!(matches!(err, Error::ValidationRejected("password")));

    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(storage.is_empty());
  }

  #[tokio::test]
  async fn same_email_same_subject_id() {
    let store = offline(Arc::default());
    let a = store.login("Carol@Example.com", "pw").await.unwrap();
    let b = store.login("carol@example.com", "pw").await.unwrap();
    assert_eq!(a.subject.id, b.subject.id);
    assert_eq!(a.subject.id.len(), 16);
    assert_ne!(a.token, b.token);
  }

  #[tokio::test]
  async fn register_uses_supplied_name() {
    let backend = CountingBackend::default();
    let store = SessionStore::new(MemoryStore::new(), backend);
    let session = store
      .register("Dana Scully", "dana@fbi.gov", "trustno1")
      .await
      .unwrap();
    assert_eq!(session.subject.name, "Dana Scully");
    assert_eq!(store.backend.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn logout_clears_storage_and_is_idempotent() {
    let storage = Arc::new(MemoryStore::new());
    let store = offline(storage.clone());
    store.login("e@x.io", "pw").await.unwrap();
    assert_eq!(storage.len(), 2);

    store.logout().await.unwrap();
    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(storage.is_empty());

    store.logout().await.unwrap();
    assert_eq!(store.state(), SessionState::Unauthenticated);
  }

  #[tokio::test]
  async fn required_policy_surfaces_remote_failure() {
    let storage = Arc::new(MemoryStore::new());
    let store = offline(storage.clone()).with_policy(RemotePolicy::Required);

    let err = store.login("f@x.io", "pw").await.unwrap_err();
    assert!(matches!(err, Error::RemoteCallFailed(_)));
    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(storage.is_empty());
  }

  #[tokio::test]
  async fn required_policy_keeps_previous_session_on_failure() {
    let storage = Arc::new(MemoryStore::new());
    let lenient = offline(storage.clone());
    let session = lenient.login("g@x.io", "pw").await.unwrap();

    let strict = offline(storage).with_policy(RemotePolicy::Required);
    strict.restore().await.unwrap();
    strict.register("H", "h@x.io", "pw").await.unwrap_err();
    assert_eq!(strict.subject().unwrap(), session.subject);
  }

  #[tokio::test]
  async fn half_present_session_is_ignored() {
    let storage = Arc::new(MemoryStore::new());
    storage
      .put_all(vec![(TOKEN_KEY.to_owned(), "orphan".to_owned())])
      .await
      .unwrap();

    let store = offline(storage);
    store.restore().await.unwrap();
    assert_eq!(store.state(), SessionState::Unauthenticated);
  }

  #[tokio::test]
  async fn corrupt_subject_is_ignored() {
    let storage = Arc::new(MemoryStore::new());
    storage
      .put_all(vec![
        (TOKEN_KEY.to_owned(), "tok".to_owned()),
        (SUBJECT_KEY.to_owned(), "not json".to_owned()),
      ])
      .await
      .unwrap();

    let store = offline(storage);
    store.restore().await.unwrap();
    assert!(!store.is_authenticated());
  }

  #[tokio::test]
  async fn subscribers_see_transitions() {
    let store = offline(Arc::default());
    let mut rx = store.subscribe();
    store.login("i@x.io", "pw").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.session().unwrap().subject.name, "i");
  }

  #[tokio::test]
  async fn login_and_register_pass_through_loading() {
    let store = SessionStore::new(MemoryStore::new(), StateRecorder::default());
    let _ = store.backend.rx.set(store.subscribe());

    store.login("k@x.io", "pw").await.unwrap();
    store.register("Kim", "kim@x.io", "pw").await.unwrap();

    assert_eq!(store.backend.seen(), vec![
      SessionState::Loading,
      SessionState::Loading
    ]);
    assert_eq!(store.subject().unwrap().name, "Kim");
  }

  #[tokio::test]
  async fn restore_passes_through_loading() {
    let store = SessionStore::new(StateRecorder::default(), NoBackend);
    let _ = store.storage.rx.set(store.subscribe());

    store.restore().await.unwrap();

    let seen = store.storage.seen();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|s| *s == SessionState::Loading));
    assert_eq!(store.state(), SessionState::Unauthenticated);
  }

  #[tokio::test]
  async fn failed_write_keeps_previous_state() {
    let storage = Arc::new(FaultyStore::default());
    let store = SessionStore::new(storage.clone(), NoBackend);

    storage.fail_put.store(true, Ordering::SeqCst);
    let err = store.login("l@x.io", "pw").await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(storage.inner.is_empty());

    storage.fail_put.store(false, Ordering::SeqCst);
    let session = store.login("l@x.io", "pw").await.unwrap();

    storage.fail_put.store(true, Ordering::SeqCst);
    let err = store.register("M", "m@x.io", "pw").await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(store.state(), SessionState::Authenticated(session.clone()));
    assert_eq!(
      storage.inner.get(TOKEN_KEY).await.unwrap(),
      Some(session.token)
    );
  }

  #[tokio::test]
  async fn failed_logout_keeps_session() {
    let storage = Arc::new(FaultyStore::default());
    let store = SessionStore::new(storage.clone(), NoBackend);
    let session = store.login("n@x.io", "pw").await.unwrap();

    storage.fail_remove.store(true, Ordering::SeqCst);
    let err = store.logout().await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(store.state(), SessionState::Authenticated(session.clone()));

    // Memory and storage still agree after a reload.
    let reloaded = SessionStore::new(storage.clone(), NoBackend);
    reloaded.restore().await.unwrap();
    assert_eq!(reloaded.subject().unwrap(), session.subject);

    storage.fail_remove.store(false, Ordering::SeqCst);
    store.logout().await.unwrap();
    assert!(!store.is_authenticated());
    assert!(storage.inner.is_empty());
  }
}
