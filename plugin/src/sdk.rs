use log::error;
use loadsign_aws_v4::Credential;

/// Prefix of every diagnostic printed when a request goes out unsigned.
pub const SDK_CONFIG_INVALID: &str =
    "loadsign-plugin-aws-sigv4 ERROR (signature will not be added):";

/// Check that the resolved credentials and region can sign a request.
///
/// Never fails: every problem is logged with a hint on how to fix it and
/// reported as `false`.
pub fn is_usable(credential: Option<&Credential>, region: Option<&str>) -> bool {
    let Some(cred) = credential else {
        error!("{SDK_CONFIG_INVALID} credentials not obtained.");
        error!("Ensure the credential chain can obtain valid credentials.");
        return false;
    };

    if !(cred.has_key_pair() || cred.has_role_arn()) {
        error!("{SDK_CONFIG_INVALID} valid credentials not loaded.");
        error!(
            "Ensure the credential chain can obtain credentials with either both an access key id and a secret access key (optionally a session token) or a role ARN."
        );
        return false;
    }

    if region.map_or(true, str::is_empty) {
        error!("{SDK_CONFIG_INVALID} valid region not configured.");
        error!("Ensure a valid region can be obtained for signing your requests.");
        error!(
            "Consider exporting or setting AWS_REGION or alternatively specify a default region in your AWS config file."
        );
        return false;
    }

    true
}
