use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::Method;
use log::debug;
use loadsign_aws_v4::{Credential, RequestSigner};
use loadsign_core::time::DateTime;
use loadsign_core::{Error, Result};
use url::Url;

use crate::config::PluginConfig;
use crate::host::{ExecutionContext, RequestParams};
use crate::sdk::is_usable;
use crate::template::{Substitute, Template};

/// Credentials and region a request is signed with.
#[derive(Debug, Clone, Default)]
pub struct SigningMaterial {
    pub credential: Option<Arc<Credential>>,
    pub region: Option<String>,
}

/// Outcome of a successful [`RequestTransform::sign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    /// The request now carries an `authorization` header.
    Signed,
    /// Credentials or region are unusable, the request is left untouched.
    Skipped,
}

/// Turns a host request into a signed one.
pub struct RequestTransform {
    service_name: String,
    target: Option<String>,
    template: Arc<dyn Substitute>,
    time: Option<DateTime>,
}

impl RequestTransform {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            target: config.target.clone(),
            template: Arc::new(Template),
            time: None,
        }
    }

    /// Replace the template engine.
    pub fn with_template(mut self, template: impl Substitute) -> Self {
        self.template = Arc::new(template);
        self
    }

    /// Sign with a fixed time instead of the current one.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sign `req` in place.
    ///
    /// All work happens on a copy: on error `req` is left exactly as it was.
    /// On success every header the signer produced is merged back into
    /// `req.headers`, and `body`/`json` hold their substituted values so the
    /// host sends the bytes that were signed.
    pub fn sign(
        &self,
        material: &SigningMaterial,
        req: &mut RequestParams,
        ctx: &ExecutionContext,
    ) -> Result<SignOutcome> {
        if !is_usable(material.credential.as_deref(), material.region.as_deref()) {
            return Ok(SignOutcome::Skipped);
        }
        let (Some(cred), Some(region)) = (&material.credential, &material.region) else {
            return Ok(SignOutcome::Skipped);
        };

        let url = self.resolve_url(req, ctx)?;
        debug!("signing {} {url}", req.method);

        let method = Method::from_bytes(req.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::request_invalid(format!("invalid method {}", req.method)).with_source(e))?;

        let mut builder = http::Request::builder().method(method).uri(url.as_str());
        for (name, value) in &req.headers {
            let value = self.template.substitute_str(value, ctx);
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::request_invalid(format!("invalid header name {name}")).with_source(e)
            })?;
            let value = HeaderValue::from_bytes(value.as_bytes()).map_err(|e| {
                Error::request_invalid(format!("invalid value for header {name}")).with_source(e)
            })?;
            builder = builder.header(name, value);
        }

        let (json, body) = match (&req.json, &req.body) {
            (Some(json), _) => {
                let json = self.template.substitute_value(json, ctx);
                let payload = serde_json::to_string(&json).map_err(|e| {
                    Error::unexpected("failed to serialize json body").with_source(e)
                })?;
                (Some(json), Some(payload))
            }
            (None, Some(body)) => (None, Some(self.template.substitute_str(body, ctx))),
            (None, None) => (None, None),
        };

        let (mut parts, _) = builder
            .body(())
            .map_err(|e| Error::request_invalid(format!("invalid request {url}")).with_source(e))?
            .into_parts();

        let mut signer = RequestSigner::new(&self.service_name, region);
        if let Some(time) = self.time {
            signer = signer.with_time(time);
        }
        signer.sign(
            &mut parts,
            body.as_deref().unwrap_or_default().as_bytes(),
            cred,
        )?;

        // Headers differing only in case arrive as one repeated header. They
        // go back as the comma joined value the signature covers.
        let signed: Vec<(String, String)> = parts
            .headers
            .keys()
            .map(|name| {
                let value = parts
                    .headers
                    .get_all(name)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()))
                    .collect::<Vec<_>>()
                    .join(",");
                (name.as_str().to_string(), value)
            })
            .collect();

        // Nothing can fail past this point.
        for (name, value) in signed {
            req.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
            req.headers.insert(name, value);
        }
        match json {
            Some(json) => req.json = Some(json),
            None => req.body = body,
        }

        Ok(SignOutcome::Signed)
    }

    /// Resolve the url the request is sent to.
    fn resolve_url(&self, req: &RequestParams, ctx: &ExecutionContext) -> Result<String> {
        let raw = req
            .uri
            .as_deref()
            .or(req.url.as_deref())
            .ok_or_else(|| Error::request_invalid("request has neither uri nor url"))?;

        let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let url = self.template.substitute_str(&stripped, ctx);
        let url = match (url.starts_with('/'), &self.target) {
            (false, _) => url,
            (true, Some(target)) => format!("{}{url}", target.trim_end_matches('/')),
            (true, None) => {
                return Err(Error::request_invalid(format!(
                    "relative url {url} requires a configured target"
                )))
            }
        };

        // Substituted values may hold characters that are only valid once
        // percent-encoded, the way the host's http client sends them.
        let parsed = Url::parse(&url).map_err(|e| {
            Error::request_invalid(format!("invalid url {url}")).with_source(e)
        })?;
        Ok(parsed.into())
    }
}

impl Debug for RequestTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTransform")
            .field("service_name", &self.service_name)
            .field("target", &self.target)
            .field("time", &self.time)
            .finish()
    }
}
