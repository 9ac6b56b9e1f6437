use super::create_test_context_with_env;
use loadsign_aws_v4::EnvCredentialProvider;
use loadsign_core::ProvideCredential;
use std::collections::HashMap;

#[tokio::test]
async fn test_env_credential_provider() {
    let envs = HashMap::from_iter([
        ("AWS_ACCESS_KEY_ID".to_string(), "AKIDLOADTEST".to_string()),
        (
            "AWS_SECRET_ACCESS_KEY".to_string(),
            "load/test/secret".to_string(),
        ),
        ("AWS_SESSION_TOKEN".to_string(), "session".to_string()),
    ]);

    let ctx = create_test_context_with_env(envs);
    let cred = EnvCredentialProvider::new()
        .provide_credential(&ctx)
        .await
        .expect("EnvCredentialProvider should not fail")
        .expect("Should load credentials from AWS_* env vars");

    assert_eq!(cred.access_key_id, "AKIDLOADTEST");
    assert_eq!(cred.secret_access_key, "load/test/secret");
    assert_eq!(cred.session_token.as_deref(), Some("session"));
}
