mod credential_providers;

use std::collections::HashMap;
use std::time::SystemTime;

use anyhow::Result;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningSettings,
    UriPathNormalizationMode,
};
use aws_sigv4::sign::v4;
use chrono::TimeZone;
use credential_providers::{create_test_context_with_env, testdata};
use http::{header, Request};
use log::debug;
use loadsign_aws_v4::{Credential, DefaultCredentialProvider, RegionResolver, RequestSigner};
use loadsign_core::time::DateTime;
use loadsign_core::ProvideCredential;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn signing_time() -> DateTime {
    chrono::Utc
        .with_ymd_and_hms(2024, 5, 17, 10, 30, 0)
        .single()
        .expect("time must be valid")
}

fn request(uri: &str) -> Result<Request<&'static str>> {
    Ok(Request::builder().method("GET").uri(uri).body("")?)
}

fn reference_authorization(
    mut req: Request<&'static str>,
    service: &str,
    region: &str,
    settings: SigningSettings,
) -> Result<String> {
    let id = Credentials::new(
        "access_key_id",
        "secret_access_key",
        None,
        None,
        "hardcoded-credentials",
    )
    .into();
    let sp = v4::SigningParams::builder()
        .identity(&id)
        .region(region)
        .name(service)
        .time(SystemTime::from(signing_time()))
        .settings(settings)
        .build()?;

    let output = aws_sigv4::http_request::sign(
        SignableRequest::new(
            req.method().as_str(),
            req.uri().to_string(),
            req.headers()
                .iter()
                .map(|(k, v)| (k.as_str(), v.to_str().expect("header must be ascii"))),
            SignableBody::Bytes(req.body().as_bytes()),
        )?,
        &sp.into(),
    )?;
    let (instructions, _) = output.into_parts();
    instructions.apply_to_request_http1x(&mut req);

    Ok(req.headers()[header::AUTHORIZATION].to_str()?.to_string())
}

fn loadsign_authorization(
    req: Request<&'static str>,
    service: &str,
    region: &str,
) -> Result<String> {
    let cred = Credential {
        access_key_id: "access_key_id".to_string(),
        secret_access_key: "secret_access_key".to_string(),
        ..Default::default()
    };

    let (mut parts, body) = req.into_parts();
    RequestSigner::new(service, region)
        .with_time(signing_time())
        .sign(&mut parts, body.as_bytes(), &cred)?;

    Ok(parts.headers[header::AUTHORIZATION].to_str()?.to_string())
}

#[test_case("https://api.example.com/prod/my%20item", "execute-api"; "double encoded path")]
#[test_case("https://api.example.com/prod/a-b_c.d~e", "execute-api"; "unreserved path")]
#[test_case("https://bucket.s3.amazonaws.com/my%20file.txt", "s3"; "single encoded s3 path")]
#[test_case("https://bucket.s3.amazonaws.com/dir/report.csv?versionId=3", "s3"; "s3 path with query")]
fn test_path_encoding_against_aws_sigv4(uri: &str, service: &str) -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut settings = SigningSettings::default();
    if service == "s3" {
        settings.percent_encoding_mode = PercentEncodingMode::Single;
        settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    }

    let expected = reference_authorization(request(uri)?, service, "us-east-1", settings)?;
    let actual = loadsign_authorization(request(uri)?, service, "us-east-1")?;
    debug!("authorization for {uri}: {actual}");

    assert_eq!(expected, actual);
    Ok(())
}

#[tokio::test]
async fn test_sign_with_ambient_credentials() -> Result<()> {
    let ctx = create_test_context_with_env(HashMap::from_iter([
        (
            "AWS_SHARED_CREDENTIALS_FILE".to_string(),
            testdata("default_credential"),
        ),
        ("AWS_CONFIG_FILE".to_string(), testdata("default_config")),
    ]));

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be resolved");
    let region = RegionResolver::new()
        .resolve(&ctx)
        .await?
        .expect("region must be resolved");
    assert_eq!(region, "us-east-1");

    let (mut parts, body) = Request::builder()
        .method("POST")
        .uri("https://abc123.execute-api.us-east-1.amazonaws.com/prod/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"qty":1}"#)?
        .into_parts();

    RequestSigner::new("execute-api", &region)
        .with_time(signing_time())
        .sign(&mut parts, body.as_bytes(), &cred)?;

    let auth = parts.headers[header::AUTHORIZATION].to_str()?;
    assert!(auth.starts_with(
        "AWS4-HMAC-SHA256 Credential=shared_access_key_id/20240517/us-east-1/execute-api/aws4_request"
    ));
    assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date,"));
    assert!(parts.headers[header::AUTHORIZATION].is_sensitive());
    assert_eq!(
        parts.headers[header::HOST],
        "abc123.execute-api.us-east-1.amazonaws.com"
    );
    Ok(())
}
