use crate::constants::{AWS_EC2_METADATA_DISABLED, AWS_EC2_METADATA_SERVICE_ENDPOINT};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use log::debug;
use loadsign_core::time::{now, DateTime};
use loadsign_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
/// 21600s (6h) is recommended by AWS.
const TOKEN_TTL_SECONDS: i64 = 21600;

/// ImdsCredentialProvider loads the instance role credential from EC2
/// instance metadata (IMDSv2).
///
/// Set `AWS_EC2_METADATA_DISABLED=true` to skip it, or
/// `AWS_EC2_METADATA_SERVICE_ENDPOINT` to talk to another endpoint.
#[derive(Debug, Clone)]
pub struct ImdsCredentialProvider {
    endpoint: Option<String>,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for ImdsCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ImdsCredentialProvider {
    /// Create a new `ImdsCredentialProvider` instance.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    async fn load_token(&self, ctx: &Context, endpoint: &str) -> Result<String> {
        {
            let (token, expires_at) = self
                .token
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if expires_at > now() {
                return Ok(token);
            }
        }

        let req = http::Request::builder()
            .uri(format!("{endpoint}/latest/api/token"))
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            .header(
                "x-aws-ec2-metadata-token-ttl-seconds",
                TOKEN_TTL_SECONDS.to_string(),
            )
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(metadata_error("fetch token", resp.status(), resp.body()));
        }

        let token = resp.into_body();
        // Refresh 10 minutes before the token really expires.
        let expires_at = now() + chrono::TimeDelta::seconds(TOKEN_TTL_SECONDS - 600);
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = (token.clone(), expires_at);

        Ok(token)
    }

    async fn get(&self, ctx: &Context, url: String, token: &str) -> Result<String> {
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::GET)
            .header("x-aws-ec2-metadata-token", token)
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(metadata_error(&url, resp.status(), resp.body()));
        }
        Ok(resp.into_body())
    }
}

fn metadata_error(op: &str, status: StatusCode, body: &str) -> Error {
    Error::credential_fetch(format!(
        "instance metadata {op} failed: status={status}, body={body}"
    ))
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            debug!("instance metadata disabled by {AWS_EC2_METADATA_DISABLED}");
            return Ok(None);
        }

        let endpoint = self.endpoint(ctx);
        let token = self.load_token(ctx, &endpoint).await?;

        // The listing holds one role name per line, the first one is used.
        let listing = self
            .get(
                ctx,
                format!("{endpoint}/latest/meta-data/iam/security-credentials/"),
                &token,
            )
            .await?;
        let Some(role) = listing.lines().map(str::trim).find(|v| !v.is_empty()) else {
            debug!("no IAM role attached to this instance");
            return Ok(None);
        };

        let content = self
            .get(
                ctx,
                format!("{endpoint}/latest/meta-data/iam/security-credentials/{role}"),
                &token,
            )
            .await?;
        let resp: InstanceCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse instance metadata credentials").with_source(e)
        })?;

        if resp.code != "Success" {
            return Err(Error::credential_fetch(format!(
                "instance metadata returned [{}] {} for role {role}",
                resp.code, resp.message
            )));
        }

        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            role_arn: None,
        }))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstanceCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,

    code: String,
    message: String,
}
