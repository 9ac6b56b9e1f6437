use crate::constants::{
    AWS_CONTAINER_AUTHORIZATION_TOKEN, AWS_CONTAINER_CREDENTIALS_FULL_URI,
    AWS_CONTAINER_CREDENTIALS_RELATIVE_URI,
};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Method, StatusCode};
use loadsign_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

const ECS_ENDPOINT: &str = "http://169.254.170.2";

/// EcsCredentialProvider loads the task role credential from the container
/// credentials endpoint.
///
/// Only active when `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` or
/// `AWS_CONTAINER_CREDENTIALS_FULL_URI` is set.
///
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Clone, Copy, Default)]
pub struct EcsCredentialProvider;

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let url = match (
            ctx.env_var(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI),
            ctx.env_var(AWS_CONTAINER_CREDENTIALS_FULL_URI),
        ) {
            (Some(relative), _) => format!("{ECS_ENDPOINT}{relative}"),
            (None, Some(full)) => full,
            (None, None) => return Ok(None),
        };

        let mut req = http::Request::builder().uri(&url).method(Method::GET);
        if let Some(token) = ctx.env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN) {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::credential_fetch(format!(
                "container credentials endpoint {url} failed: status={}, body={}",
                resp.status(),
                resp.body()
            )));
        }

        let cred: TaskCredentials = serde_json::from_str(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse container credentials").with_source(e)
        })?;

        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: Some(cred.token),
            role_arn: cred.role_arn,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    #[serde(default)]
    role_arn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provide_credential::testing::MockHttpSend;
    use loadsign_core::{ErrorKind, StaticEnv};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const TASK_CREDENTIALS: &str = r#"{
        "AccessKeyId": "ASIATASKKEY",
        "Expiration": "2024-01-01T06:00:00Z",
        "RoleArn": "arn:aws:iam::123456789012:role/task",
        "SecretAccessKey": "task-secret",
        "Token": "task-token"
    }"#;

    fn ctx(http: MockHttpSend, envs: &[(&str, &str)]) -> Context {
        Context::new().with_http_send(http).with_env(StaticEnv {
            home_dir: None,
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_without_env() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let http = MockHttpSend::new();
        let cred = EcsCredentialProvider::new()
            .provide_credential(&ctx(http.clone(), &[]))
            .await?;

        assert!(cred.is_none());
        assert!(http.seen().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_relative_uri() -> anyhow::Result<()> {
        let http = MockHttpSend::new().route("/v2/credentials/task-id", 200, TASK_CREDENTIALS);
        let cred = EcsCredentialProvider::new()
            .provide_credential(&ctx(
                http.clone(),
                &[(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, "/v2/credentials/task-id")],
            ))
            .await?
            .expect("credential must be loaded");

        assert_eq!(cred.access_key_id, "ASIATASKKEY");
        assert_eq!(cred.secret_access_key, "task-secret");
        assert_eq!(cred.session_token.as_deref(), Some("task-token"));
        assert_eq!(
            cred.role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/task")
        );
        assert_eq!(
            http.seen()[0].uri,
            "http://169.254.170.2/v2/credentials/task-id"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_full_uri_with_token() -> anyhow::Result<()> {
        let http = MockHttpSend::new().route("/creds", 200, TASK_CREDENTIALS);
        EcsCredentialProvider::new()
            .provide_credential(&ctx(
                http.clone(),
                &[
                    (AWS_CONTAINER_CREDENTIALS_FULL_URI, "http://127.0.0.1:8080/creds"),
                    (AWS_CONTAINER_AUTHORIZATION_TOKEN, "Basic abc"),
                ],
            ))
            .await?
            .expect("credential must be loaded");

        let seen = http.seen();
        assert_eq!(seen[0].uri, "http://127.0.0.1:8080/creds");
        assert_eq!(seen[0].headers[AUTHORIZATION], "Basic abc");
        Ok(())
    }

    #[tokio::test]
    async fn test_endpoint_error() {
        let http = MockHttpSend::new().route("/creds", 500, "boom");
        let err = EcsCredentialProvider::new()
            .provide_credential(&ctx(
                http,
                &[(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, "/creds")],
            ))
            .await
            .expect_err("server error must fail");

        assert_eq!(err.kind(), ErrorKind::CredentialFetch);
        assert!(err.message().contains("500"));
    }
}
