//! HTTP client for the backend's JSON endpoints.
//!
//! Requests go through a blocking `ureq` agent moved onto tokio's blocking
//! pool, so the single UI thread never stalls on the network. A failed
//! request is reported once; nothing here retries.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::task;
use url::Url;

use crate::ids::VideoId;
use crate::model::{Feed, FeedSource, OEmbedMeta};

pub const OEMBED_PATH: &str = "/api/oembed";
pub const FEED_PATH: &str = "/api/feed";

#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// A 2xx response whose body was not JSON.
    #[error("{0}")]
    InvalidPayload(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request task failed: {0}")]
    Join(#[from] task::JoinError),
    #[error("invalid request address: {0}")]
    Address(#[from] url::ParseError),
}

/// The two lookups the UI depends on.
#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn oembed(&self, id: &VideoId) -> Result<OEmbedMeta, FetchError>;
    async fn feed(&self, source: &FeedSource) -> Result<Feed, FetchError>;
}

/// [`DataSource`] backed by the tubekit HTTP backend.
#[derive(Clone)]
pub struct HttpDataSource {
    agent: ureq::Agent,
    base: Url,
    timeout: Option<Duration>,
}

impl HttpDataSource {
    /// Requests never time out; a stalled backend leaves the caller waiting.
    pub fn new(base: Url) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self {
            agent,
            base,
            timeout: None,
        }
    }

    /// Like [`HttpDataSource::new`] but gives up after `timeout`.
    pub fn with_timeout(base: Url, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base,
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Fetches `path` and returns the parsed JSON body.
    pub async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let url = self.base.join(path)?;
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        let agent = self.agent.clone();

        tracing::debug!(%url, "fetching");
        task::spawn_blocking(move || request_json(&agent, &url, &params)).await?
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let payload = self.get_json(path, params).await?;
        Ok(serde_json::from_value(payload)?)
    }
}

impl DataSource for HttpDataSource {
    async fn oembed(&self, id: &VideoId) -> Result<OEmbedMeta, FetchError> {
        self.get(OEMBED_PATH, &[("v", id.as_str())]).await
    }

    async fn feed(&self, source: &FeedSource) -> Result<Feed, FetchError> {
        self.get(FEED_PATH, &[(source.param(), source.value())]).await
    }
}

fn request_json(
    agent: &ureq::Agent,
    url: &Url,
    params: &[(String, String)],
) -> Result<Value, FetchError> {
    let mut request = agent.request_url("GET", url).set("Accept", "application/json");
    for (key, value) in params {
        request = request.query(key, value);
    }

    let (status, body) = match request.call() {
        Ok(response) => {
            let status = response.status();
            let body = response
                .into_string()
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            (status, body)
        }
        Err(ureq::Error::Status(status, response)) => {
            (status, response.into_string().unwrap_or_default())
        }
        Err(ureq::Error::Transport(err)) => return Err(FetchError::Transport(err.to_string())),
    };

    normalize(status, &body)
}

/// Turns a status and raw body into a JSON value or a descriptive error.
fn normalize(status: u16, body: &str) -> Result<Value, FetchError> {
    let fallback = || format!("HTTP {status}");
    let (payload, parsed) = match serde_json::from_str::<Value>(body) {
        Ok(value) => (value, true),
        Err(_) => {
            let text = if body.is_empty() {
                fallback()
            } else {
                body.to_owned()
            };
            (json!({ "error": text }), false)
        }
    };

    if !(200..300).contains(&status) {
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(fallback);
        return Err(FetchError::Status { status, message });
    }

    if !parsed {
        let message = payload["error"].as_str().map(str::to_owned).unwrap_or_else(fallback);
        return Err(FetchError::InvalidPayload(message));
    }

    Ok(payload)
}
