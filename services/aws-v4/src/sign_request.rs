use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use loadsign_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use loadsign_core::time::{format_date, format_iso8601, now, DateTime};
use loadsign_core::{Error, Result, SigningRequest};
use percent_encoding::utf8_percent_encode;
use std::fmt::Write;

/// RequestSigner that implement AWS SigV4 with the signature in headers.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for the given service and region.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sign the request in place.
    ///
    /// `payload` must be the exact bytes that will be sent: its SHA-256 is part
    /// of the canonical request unless the caller already set
    /// `x-amz-content-sha256`.
    ///
    /// On success `req` carries `host`, `x-amz-date`, `authorization` and, for
    /// temporary credentials, `x-amz-security-token`.
    pub fn sign(&self, req: &mut Parts, payload: &[u8], cred: &Credential) -> Result<()> {
        let now = self.time.unwrap_or_else(now);
        let mut signed_req = SigningRequest::build(req)?;

        // canonicalize context
        canonicalize_header(&mut signed_req, cred, now)?;
        canonicalize_query(&mut signed_req);

        // build canonical request and string to sign.
        let payload_hash = match signed_req.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => v.to_str()?.to_string(),
            None => hex_sha256(payload),
        };
        // S3 refuses requests without the payload hash header.
        if self.service == "s3" && !signed_req.headers.contains_key(X_AMZ_CONTENT_SHA_256) {
            signed_req
                .headers
                .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::try_from(&payload_hash)?);
        }
        let creq = canonical_request_string(&signed_req, &self.service, &payload_hash)?;
        debug!("calculated canonical request: {creq}");
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{}", &scope)?;
            write!(f, "{}", &encoded_req)?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            signed_req.header_name_to_vec_sorted().join(";"),
            signature
        ))
        .map_err(|e| {
            Error::credential_invalid("access key id can't be used in authorization header")
                .with_source(e)
        })?;
        authorization.set_sensitive(true);

        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)
    }
}

fn canonical_request_string(
    ctx: &SigningRequest,
    service: &str,
    payload_hash: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)?;
    // Insert encoded path
    //
    // S3 expects the path encoded once, every other service signs the
    // already encoded path encoded again.
    if service == "s3" {
        let path = ctx.path_percent_decoded();
        writeln!(f, "{}", utf8_percent_encode(&path, &AWS_URI_ENCODE_SET))?;
    } else {
        writeln!(f, "{}", utf8_percent_encode(&ctx.path, &AWS_URI_ENCODE_SET))?;
    }
    // Insert query
    writeln!(
        f,
        "{}",
        ctx.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    let signed_headers = ctx.header_name_to_vec_sorted();
    for header in signed_headers.iter() {
        // Repeated headers are signed as one comma separated value. Values may
        // carry non-ascii bytes, which are signed as utf-8.
        let value = ctx
            .headers
            .get_all(*header)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(f, "{header}:{value}")?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;
    write!(f, "{payload_hash}")?;

    Ok(f)
}

fn canonicalize_header(ctx: &mut SigningRequest, cred: &Credential, now: DateTime) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // The signature itself is never signed.
    ctx.headers.remove(header::AUTHORIZATION);

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // X_AMZ_DATE always follows the signing time.
    ctx.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token).map_err(|e| {
            Error::credential_invalid("session token can't be used as header value")
                .with_source(e)
        })?;
        // Set token value sensitive to valid leaking.
        value.set_sensitive(true);

        ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    Ok(())
}

fn canonicalize_query(ctx: &mut SigningRequest) {
    // Return if query is empty.
    if ctx.query.is_empty() {
        return;
    }

    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();

    // Sort by encoded param name, then value.
    ctx.query.sort();
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
