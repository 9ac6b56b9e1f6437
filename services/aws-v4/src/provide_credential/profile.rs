// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::constants::{AWS_CONFIG_FILE, AWS_SHARED_CREDENTIALS_FILE};
use crate::provide_credential::{
    AssumeRoleCredentialProvider, EcsCredentialProvider, EnvCredentialProvider,
    ImdsCredentialProvider, StaticCredentialProvider,
};
use crate::shared_config::{
    config_section, current_profile, load_ini, DEFAULT_CONFIG_FILE, DEFAULT_CREDENTIALS_FILE,
    DEFAULT_PROFILE,
};
use crate::Credential;
use async_trait::async_trait;
use ini::{Ini, Properties};
use log::debug;
use loadsign_core::{Context, Error, ProvideCredential, Result};

/// ProfileCredentialProvider loads AWS credentials from the shared files.
///
/// The shared credentials file (`~/.aws/credentials`) is consulted first, then
/// the config file (`~/.aws/config`). Both paths can be overridden through
/// `AWS_SHARED_CREDENTIALS_FILE` and `AWS_CONFIG_FILE`, and the profile
/// through `AWS_PROFILE`.
///
/// A profile with a `role_arn` and either a `source_profile` or a
/// `credential_source` assumes that role through STS. A profile carrying only
/// a `role_arn` still yields a credential: the role identifies who to act as
/// even though nothing to assume it with is configured locally.
#[derive(Debug, Clone)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider for the default profile.
    pub fn new() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name. `AWS_PROFILE` still takes precedence.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the config file path.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the shared credentials file path.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_files(&self, ctx: &Context) -> Result<SharedFiles> {
        let credentials = load_ini(
            ctx,
            self.credentials_file.as_deref(),
            AWS_SHARED_CREDENTIALS_FILE,
            DEFAULT_CREDENTIALS_FILE,
        )
        .await?;
        let config = load_ini(
            ctx,
            self.config_file.as_deref(),
            AWS_CONFIG_FILE,
            DEFAULT_CONFIG_FILE,
        )
        .await?;
        Ok(SharedFiles {
            credentials,
            config,
        })
    }

    async fn resolve(
        &self,
        ctx: &Context,
        profile: &str,
        props: &Properties,
        files: &SharedFiles,
    ) -> Result<Option<Credential>> {
        let cred = credential_from_properties(props);
        if cred.has_key_pair() {
            return Ok(Some(cred));
        }
        let Some(role_arn) = cred.role_arn.clone().filter(|_| cred.has_role_arn()) else {
            return Ok(None);
        };

        let provider = match (props.get("source_profile"), props.get("credential_source")) {
            (Some(source_profile), _) => {
                let source = files.key_pair(source_profile).ok_or_else(|| {
                    Error::config_invalid(format!(
                        "source profile {source_profile} of profile {profile} has no access keys"
                    ))
                })?;
                assume_role(profile, props, role_arn, source)?
            }
            (None, Some("Environment")) => {
                assume_role(profile, props, role_arn, EnvCredentialProvider::new())?
            }
            (None, Some("Ec2InstanceMetadata")) => {
                assume_role(profile, props, role_arn, ImdsCredentialProvider::new())?
            }
            (None, Some("EcsContainer")) => {
                assume_role(profile, props, role_arn, EcsCredentialProvider::new())?
            }
            (None, Some(other)) => {
                return Err(Error::config_invalid(format!(
                    "unsupported credential_source {other} in profile {profile}"
                )))
            }
            (None, None) => {
                debug!("profile {profile} has a role_arn but nothing to assume it with");
                return Ok(Some(cred));
            }
        };

        provider.provide_credential(ctx).await
    }
}

/// Role assumption configured by the properties of `profile`.
fn assume_role(
    profile: &str,
    props: &Properties,
    role_arn: String,
    source: impl ProvideCredential<Credential = Credential>,
) -> Result<AssumeRoleCredentialProvider> {
    let mut provider = AssumeRoleCredentialProvider::new(role_arn, source);
    if let Some(name) = props.get("role_session_name") {
        provider = provider.with_role_session_name(name);
    }
    if let Some(id) = props.get("external_id") {
        provider = provider.with_external_id(id);
    }
    if let Some(seconds) = props.get("duration_seconds") {
        let seconds = seconds.parse().map_err(|e| {
            Error::config_invalid(format!(
                "invalid duration_seconds {seconds} in profile {profile}"
            ))
            .with_source(e)
        })?;
        provider = provider.with_duration_seconds(seconds);
    }
    if let Some(region) = props.get("region") {
        provider = provider.with_region(region);
    }
    if let Some(mode) = props.get("sts_regional_endpoints") {
        provider = provider.with_regional_sts_endpoint(mode == "regional");
    }
    Ok(provider)
}

struct SharedFiles {
    credentials: Option<Ini>,
    config: Option<Ini>,
}

impl SharedFiles {
    /// Sections describing `profile`, credentials file first.
    fn sections(&self, profile: &str) -> Vec<&Properties> {
        let section = config_section(profile);
        [
            self.credentials
                .as_ref()
                .and_then(|conf| conf.section(Some(profile))),
            self.config
                .as_ref()
                .and_then(|conf| conf.section(Some(section.as_str()))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Static access keys of `profile`, used as the source of a role.
    fn key_pair(&self, profile: &str) -> Option<StaticCredentialProvider> {
        self.sections(profile)
            .into_iter()
            .map(credential_from_properties)
            .find(|c| c.has_key_pair())
            .map(|c| {
                let provider =
                    StaticCredentialProvider::new(&c.access_key_id, &c.secret_access_key);
                match c.session_token {
                    Some(token) => provider.with_session_token(&token),
                    None => provider,
                }
            })
    }
}

fn credential_from_properties(props: &Properties) -> Credential {
    let get = |key: &str| props.get(key).filter(|v| !v.is_empty()).map(str::to_string);

    Credential {
        access_key_id: get("aws_access_key_id").unwrap_or_default(),
        secret_access_key: get("aws_secret_access_key").unwrap_or_default(),
        session_token: get("aws_session_token"),
        role_arn: get("role_arn"),
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = current_profile(ctx, &self.profile);
        let files = self.load_files(ctx).await?;

        let sections = files.sections(&profile);
        if sections.is_empty() {
            debug!("profile {profile} not found in shared files");
        }
        for props in sections {
            if let Some(cred) = self.resolve(ctx, &profile, props, &files).await? {
                return Ok(Some(cred));
            }
        }
        Ok(None)
    }
}
