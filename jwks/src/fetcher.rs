//! The HTTP side of the JWKS subsystem (spec §4.8): a small trait so the
//! scheduler's retry/backoff/dedup logic can be tested without a socket,
//! plus a `hyper`-backed implementation for production use.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid JWKS url {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("server returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches over plain HTTP/1 using `hyper-util`'s legacy client, the same
/// stack the teacher's admin server uses for its HTTP surface.
pub struct HyperFetcher {
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HyperFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }
}

impl Default for HyperFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JwksFetcher for HyperFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let uri: hyper::Uri = url
            .parse()
            .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let resp = self
            .client
            .get(uri)
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?
            .to_bytes();
        Ok(body.to_vec())
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of responses, one per call; grounded on
    /// the need to exercise backoff math deterministically (spec §8
    /// scenario 4) without a real server.
    pub struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Vec<u8>, FetchError>>>,
    }

    impl ScriptedFetcher {
        pub fn new(responses: Vec<Result<Vec<u8>, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl JwksFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Status(503)))
        }
    }
}
