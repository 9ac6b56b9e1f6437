use super::{create_test_context_with_env, testdata};
use loadsign_aws_v4::{DefaultCredentialProvider, ProfileCredentialProvider};
use loadsign_core::{ProvideCredential, SigningCredential};
use std::collections::HashMap;

#[tokio::test]
async fn test_profile_credential_provider_named_profile() {
    let envs = HashMap::from_iter([
        ("AWS_PROFILE".to_string(), "load-test".to_string()),
        (
            "AWS_SHARED_CREDENTIALS_FILE".to_string(),
            testdata("default_credential"),
        ),
        ("AWS_CONFIG_FILE".to_string(), testdata("default_config")),
    ]);

    let ctx = create_test_context_with_env(envs);
    let cred = ProfileCredentialProvider::new()
        .provide_credential(&ctx)
        .await
        .expect("ProfileCredentialProvider should not fail")
        .expect("Should load credentials from AWS profile files");

    assert_eq!(cred.access_key_id, "load_test_access_key_id");
    assert_eq!(cred.secret_access_key, "load_test_secret_access_key");
    assert_eq!(cred.session_token.as_deref(), Some("load_test_session_token"));
}

#[tokio::test]
async fn test_default_provider_falls_back_to_role_profile() {
    let envs = HashMap::from_iter([
        ("AWS_PROFILE".to_string(), "load-test".to_string()),
        ("AWS_SHARED_CREDENTIALS_FILE".to_string(), testdata("not_exist")),
        ("AWS_CONFIG_FILE".to_string(), testdata("default_config")),
    ]);

    let ctx = create_test_context_with_env(envs);
    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await
        .expect("DefaultCredentialProvider should not fail")
        .expect("role profile must yield a credential");

    assert!(cred.is_valid());
    assert!(!cred.has_key_pair());
    assert_eq!(
        cred.role_arn.as_deref(),
        Some("arn:aws:iam::123456789012:role/load-test")
    );
}
