//! Shared HTTP client for the embedding and completion services.
//!
//! Both services speak the OpenAI-compatible JSON dialect. Requests are
//! retried a bounded number of times with linear back-off; the caller picks
//! which error variant a final failure maps to.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Which external service a client talks to; selects the error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Embedding,
    Completion,
}

impl ServiceKind {
    fn error(self, message: impl Into<String>) -> Error {
        match self {
            ServiceKind::Embedding => Error::Embedding(message.into()),
            ServiceKind::Completion => Error::Completion(message.into()),
        }
    }
}

pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    kind: ServiceKind,
    retries: usize,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        kind: ServiceKind,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            kind,
            retries: 2,
        })
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid service URL: {}", e)))
    }

    /// POST a JSON body to `path` and decode the JSON reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let mut request = self.client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        self.send_with_retry(request).await
    }

    async fn send_with_retry<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let req = request
                .try_clone()
                .ok_or_else(|| self.kind.error("Failed to clone service request"))?;
            match req.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => {
                        return ok
                            .json::<T>()
                            .await
                            .map_err(|e| self.kind.error(format!("Malformed response: {}", e)))
                    }
                    Err(e) => last_err = Some(self.kind.error(e.to_string())),
                },
                Err(e) => last_err = Some(self.kind.error(e.to_string())),
            }

            if attempt < self.retries {
                debug!("Request attempt {} failed, retrying", attempt + 1);
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| self.kind.error("Service request failed")))
    }
}
