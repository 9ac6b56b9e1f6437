use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use loadsign_core::{HttpSend, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// STS answer for a successful `AssumeRole`.
pub const ASSUME_ROLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <AssumedRoleUser>
      <Arn>arn:aws:sts::123456789012:assumed-role/load-test/loadsign</Arn>
      <AssumedRoleId>ARO123EXAMPLE123:loadsign</AssumedRoleId>
    </AssumedRoleUser>
    <Credentials>
      <AccessKeyId>ASIAASSUMEDKEY</AccessKeyId>
      <SecretAccessKey>assumed-secret</SecretAccessKey>
      <SessionToken>
       assumed-session-token
      </SessionToken>
      <Expiration>2024-01-01T01:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
  <ResponseMetadata>
    <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
  </ResponseMetadata>
</AssumeRoleResponse>"#;

/// A request seen by [`MockHttpSend`].
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
}

/// Serves canned responses keyed by request path, records every request.
///
/// Unknown paths answer `404`.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    routes: HashMap<String, (StatusCode, String)>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).expect("status must be valid");
        self.routes
            .insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.seen.lock().expect("lock poisoned").push(SeenRequest {
            method: req.method().clone(),
            uri: req.uri().to_string(),
            headers: req.headers().clone(),
        });

        let (status, body) = self
            .routes
            .get(req.uri().path())
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, String::new()));

        let mut resp = http::Response::new(Bytes::from(body));
        *resp.status_mut() = status;
        Ok(resp)
    }
}
