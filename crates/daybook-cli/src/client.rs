//! HTTP implementation of [`AuthBackend`].

use std::time::Duration;

use anyhow::Context as _;
use daybook_core::auth::{AuthBackend, Credentials, Registration};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("no api_url configured")]
  Unconfigured,

  #[error("POST {path} failed: {source}")]
  Request {
    path:   &'static str,
    #[source]
    source: reqwest::Error,
  },

  #[error("POST {path} → {status}")]
  Status {
    path:   &'static str,
    status: StatusCode,
  },
}

/// Posts credentials to `{base_url}/api/auth/*`.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Without a
/// base URL every call fails with [`ClientError::Unconfigured`].
#[derive(Clone)]
pub struct RemoteAuth {
  client:   Client,
  base_url: Option<String>,
}

impl RemoteAuth {
  pub fn new(base_url: Option<String>) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  fn url(&self, path: &str) -> Option<String> {
    self
      .base_url
      .as_deref()
      .map(|base| format!("{}/api{}", base.trim_end_matches('/'), path))
  }

  async fn post<T>(&self, path: &'static str, body: &T) -> Result<(), ClientError>
  where
    T: Serialize + Sync,
  {
    let url = self.url(path).ok_or(ClientError::Unconfigured)?;
    let resp = self
      .client
      .post(url)
      .json(body)
      .send()
      .await
      .map_err(|source| ClientError::Request { path, source })?;

    if !resp.status().is_success() {
      return Err(ClientError::Status { path, status: resp.status() });
    }
    Ok(())
  }
}

impl AuthBackend for RemoteAuth {
  type Error = ClientError;

  /// `POST /api/auth/login`
  async fn login(&self, credentials: &Credentials) -> Result<(), ClientError> {
    self.post("/auth/login", credentials).await
  }

  /// `POST /api/auth/register`
  async fn register(
    &self,
    registration: &Registration,
  ) -> Result<(), ClientError> {
    self.post("/auth/register", registration).await
  }
}
