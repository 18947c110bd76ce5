//! The remote authentication seam.
//!
//! A backend is consulted on every login and registration. Whether its
//! answer gates the session is decided by [`RemotePolicy`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input to [`AuthBackend::login`].
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

/// Input to [`AuthBackend::register`].
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

/// How a failed remote call affects `login` / `register`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RemotePolicy {
  /// Log the failure and synthesize a local session anyway.
  #[default]
  BestEffort,
  /// Surface the failure as [`Error::RemoteCallFailed`](crate::Error).
  Required,
}

/// A remote identity service.
///
/// Implementations report success or failure only; the session itself is
/// always built locally.
pub trait AuthBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn login<'a>(
    &'a self,
    credentials: &'a Credentials,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn register<'a>(
    &'a self,
    registration: &'a Registration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Returned by [`NoBackend`] for every call.
#[derive(Debug, Error)]
#[error("no auth backend configured")]
pub struct Unconfigured;

/// A backend that is never reachable. With [`RemotePolicy::BestEffort`] this
/// yields purely local sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackend;

impl AuthBackend for NoBackend {
  type Error = Unconfigured;

  async fn login(&self, _: &Credentials) -> Result<(), Unconfigured> {
    Err(Unconfigured)
  }

  async fn register(&self, _: &Registration) -> Result<(), Unconfigured> {
    Err(Unconfigured)
  }
}
