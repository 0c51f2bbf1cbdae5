use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::config::FetchConfig;
use crate::db::text::scrub_nul;

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as storable text: invalid UTF-8 and NUL characters are replaced.
    pub fn text(&self) -> String {
        scrub_nul(&String::from_utf8_lossy(&self.body)).into_owned()
    }
}

#[derive(Debug)]
pub enum FetchError {
    Timeout(Duration),
    TooLarge { limit: usize },
    Request(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Timeout(after) => write!(f, "Request timed out after {}s", after.as_secs_f32()),
            FetchError::TooLarge { limit } => {
                write!(f, "Response body exceeds {limit} bytes")
            }
            FetchError::Request(msg) => write!(f, "Request failed: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Outbound GET capability. One call per ingestion; callers never retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_response_size: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
            max_response_size: config.max_response_size,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = resp.status().as_u16();

        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| self.map_error(e))? {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(FetchError::TooLarge {
                    limit: self.max_response_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!("Fetched {url}: HTTP {status}, {} bytes", body.len());

        Ok(FetchResponse {
            status,
            body: body.freeze(),
        })
    }
}
