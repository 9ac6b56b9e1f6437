//! Reqwest-based HTTP sending for loadsign.
//!
//! Credential providers that talk to instance metadata, the container
//! credentials endpoint or STS send their requests through `ReqwestHttpSend`.
//!
//! ## Example
//!
//! ```no_run
//! use loadsign_core::{Context, OsEnv};
//! use loadsign_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new()
//!     .with_http_send(ReqwestHttpSend::default())
//!     .with_env(OsEnv);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use loadsign_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};

/// Metadata endpoints are link-local: off EC2 and ECS nothing answers, so the
/// default client gives up quickly instead of stalling the credential chain.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reqwest-based implementation of the `HttpSend` trait.
#[derive(Debug, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl Default for ReqwestHttpSend {
    fn default() -> Self {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let uri = req.uri().to_string();
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid(format!("invalid request to {uri}")).with_source(e))?;

        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected(format!("failed to send request to {uri}")).with_source(e))?;

        let status = resp.status();
        let version = resp.version();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|e| {
            Error::unexpected(format!("failed to read response from {uri}")).with_source(e)
        })?;

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
