//! HTTP client for advisory record locks.

use std::sync::Arc;

use teamdesk_core::locks::{AcquireResponse, LockKind, LockRequest};
use teamdesk_core::types::DbId;

use crate::client::{ClientError, TokenSource};

/// Calls `/api/locks/*` on behalf of the signed-in user.
#[derive(Clone)]
pub struct LockClient {
    http: reqwest::Client,
    api_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl LockClient {
    /// * `api_url` - HTTP base URL, e.g. `http://host:3000`.
    pub fn new(api_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn post(&self, path: &str, body: &LockRequest) -> Result<reqwest::RequestBuilder, ClientError> {
        let token = self.tokens.token().ok_or(ClientError::NoSession)?;
        Ok(self
            .http
            .post(format!("{}/api/locks/{path}", self.api_url))
            .bearer_auth(token)
            .json(body))
    }

    /// Try to lock a record before editing it.
    pub async fn acquire(&self, kind: LockKind, id: DbId) -> Result<AcquireResponse, ClientError> {
        let response = self
            .post("acquire", &LockRequest { kind, id })?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<AcquireResponse>().await?)
    }

    /// Release a lock without waiting for the outcome.
    ///
    /// The request runs on a spawned task; failures are only logged. The
    /// handle may be dropped.
    pub fn release(&self, kind: LockKind, id: DbId) -> tokio::task::JoinHandle<()> {
        let request = self.post("release", &LockRequest { kind, id });
        tokio::spawn(async move {
            let result = match request {
                Ok(request) => request.send().await.map(|_| ()).map_err(ClientError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(kind = %kind, id, error = %e, "Lock release failed");
            }
        })
    }
}
