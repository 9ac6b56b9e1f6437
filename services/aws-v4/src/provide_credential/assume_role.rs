use crate::constants::{AWS_REGION, AWS_STS_REGIONAL_ENDPOINTS};
use crate::{Credential, RequestSigner};
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use log::debug;
use loadsign_core::time::DateTime;
use loadsign_core::{Context, Error, ProvideCredential, Result, SigningCredential};
use quick_xml::de;
use serde::Deserialize;
use std::fmt::{self, Debug, Formatter};

const DEFAULT_SESSION_NAME: &str = "loadsign";

/// AssumeRoleCredentialProvider exchanges a source credential for temporary
/// credentials of `role_arn` through STS `AssumeRole`.
pub struct AssumeRoleCredentialProvider {
    role_arn: String,
    role_session_name: String,
    external_id: Option<String>,
    duration_seconds: Option<u32>,

    region: Option<String>,
    use_regional_sts_endpoint: Option<bool>,
    time: Option<DateTime>,

    source: Box<dyn ProvideCredential<Credential = Credential>>,
}

impl AssumeRoleCredentialProvider {
    /// Create a provider assuming `role_arn` with credentials from `source`.
    pub fn new(
        role_arn: impl Into<String>,
        source: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            role_session_name: DEFAULT_SESSION_NAME.to_string(),
            external_id: None,
            duration_seconds: None,
            region: None,
            use_regional_sts_endpoint: None,
            time: None,
            source: Box::new(source),
        }
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = name.into();
        self
    }

    /// Set the external ID.
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Set the duration in seconds.
    pub fn with_duration_seconds(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Set the region used for the STS endpoint and its signature.
    ///
    /// Falls back to `AWS_REGION`.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Use the regional STS endpoint instead of the global one.
    ///
    /// Falls back to `AWS_STS_REGIONAL_ENDPOINTS=regional`.
    pub fn with_regional_sts_endpoint(mut self, regional: bool) -> Self {
        self.use_regional_sts_endpoint = Some(regional);
        self
    }

    /// Sign the STS request with a fixed time. Only meant for tests.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

impl Debug for AssumeRoleCredentialProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleCredentialProvider")
            .field("role_arn", &self.role_arn)
            .field("role_session_name", &self.role_session_name)
            .field("region", &self.region)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Returns the STS host and the region its requests are signed for.
///
/// - [STS endpoints](https://docs.aws.amazon.com/general/latest/gr/sts.html)
fn sts_endpoint(region: Option<&str>, regional: bool) -> Result<(String, String)> {
    match (region, regional) {
        (Some(region), true) if region.starts_with("cn-") => Ok((
            format!("sts.{region}.amazonaws.com.cn"),
            region.to_string(),
        )),
        (Some(region), true) => Ok((format!("sts.{region}.amazonaws.com"), region.to_string())),
        (None, true) => Err(Error::config_invalid(
            "regional STS endpoint requires a region",
        )),
        (Some(region), false) if region.starts_with("cn-") => {
            Ok(("sts.amazonaws.com.cn".to_string(), "cn-north-1".to_string()))
        }
        _ => Ok(("sts.amazonaws.com".to_string(), "us-east-1".to_string())),
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let source = self
            .source
            .provide_credential(ctx)
            .await?
            .filter(|c| c.has_key_pair())
            .ok_or_else(|| {
                Error::credential_fetch(format!(
                    "no source credential available to assume role {}",
                    self.role_arn
                ))
            })?;

        let region = self.region.clone().or_else(|| ctx.env_var(AWS_REGION));
        let regional = self.use_regional_sts_endpoint.unwrap_or_else(|| {
            ctx.env_var(AWS_STS_REGIONAL_ENDPOINTS).as_deref() == Some("regional")
        });
        let (endpoint, signing_region) = sts_endpoint(region.as_deref(), regional)?;

        let url = {
            let mut query = form_urlencoded::Serializer::new(String::new());
            query
                .append_pair("Action", "AssumeRole")
                .append_pair("Version", "2011-06-15")
                .append_pair("RoleArn", &self.role_arn)
                .append_pair("RoleSessionName", &self.role_session_name);
            if let Some(external_id) = &self.external_id {
                query.append_pair("ExternalId", external_id);
            }
            if let Some(duration_seconds) = self.duration_seconds {
                query.append_pair("DurationSeconds", &duration_seconds.to_string());
            }
            format!("https://{endpoint}/?{}", query.finish())
        };

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .body(Bytes::new())?;
        let (mut parts, body) = req.into_parts();

        let mut signer = RequestSigner::new("sts", &signing_region);
        if let Some(time) = self.time {
            signer = signer.with_time(time);
        }
        signer.sign(&mut parts, &body, &source)?;

        debug!("assuming role {} through {endpoint}", self.role_arn);
        let resp = ctx
            .http_send_as_string(http::Request::from_parts(parts, body))
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::credential_fetch(format!(
                "AssumeRole for {} failed: status={}, body={}",
                self.role_arn,
                resp.status(),
                resp.body()
            )));
        }

        let resp: AssumeRoleResponse = de::from_str(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse STS AssumeRole response").with_source(e)
        })?;
        let creds = resp.result.credentials;

        let cred = Credential {
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: Some(creds.session_token.trim().to_string()),
            role_arn: Some(self.role_arn.clone()),
        };
        if !cred.is_valid() {
            return Err(Error::credential_fetch(format!(
                "AssumeRole for {} returned no credentials",
                self.role_arn
            )));
        }
        Ok(Some(cred))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleResult")]
    result: AssumeRoleResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: AssumeRoleCredentials,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}
