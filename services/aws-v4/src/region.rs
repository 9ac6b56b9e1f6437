use crate::constants::{AWS_CONFIG_FILE, AWS_DEFAULT_REGION, AWS_REGION};
use crate::shared_config::{
    config_section, current_profile, load_ini, DEFAULT_CONFIG_FILE, DEFAULT_PROFILE,
};
use log::debug;
use loadsign_core::{Context, Result};

/// RegionResolver finds the region the way the AWS SDKs do.
///
/// Resolution order:
///
/// 1. `AWS_REGION`
/// 2. `AWS_DEFAULT_REGION`
/// 3. `region` of the active profile in the config file
#[derive(Debug, Clone)]
pub struct RegionResolver {
    profile: String,
    config_file: Option<String>,
}

impl Default for RegionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionResolver {
    /// Create a resolver for the default profile.
    pub fn new() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            config_file: None,
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

    /// Resolve the region, `Ok(None)` if nothing is configured.
    pub async fn resolve(&self, ctx: &Context) -> Result<Option<String>> {
        for key in [AWS_REGION, AWS_DEFAULT_REGION] {
            if let Some(region) = ctx.env_var(key).filter(|v| !v.is_empty()) {
                debug!("region {region} resolved from {key}");
                return Ok(Some(region));
            }
        }

        let Some(conf) = load_ini(
            ctx,
            self.config_file.as_deref(),
            AWS_CONFIG_FILE,
            DEFAULT_CONFIG_FILE,
        )
        .await?
        else {
            return Ok(None);
        };

        let section = config_section(&current_profile(ctx, &self.profile));
        let region = conf
            .section(Some(section.as_str()))
            .and_then(|props| props.get("region"))
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        debug!("region {region:?} resolved from config section [{section}]");

        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::AWS_PROFILE;
    use loadsign_core::StaticEnv;
    use loadsign_file_read_tokio::TokioFileRead;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::env;
    use test_case::test_case;

    fn config_path() -> String {
        format!(
            "{}/testdata/default_config",
            env::current_dir()
                .expect("current_dir must exist")
                .to_string_lossy()
        )
    }

    #[test_case(&[("AWS_REGION", "ap-south-1"), ("AWS_DEFAULT_REGION", "us-west-2")], Some("ap-south-1"); "region env wins")]
    #[test_case(&[("AWS_DEFAULT_REGION", "us-west-2")], Some("us-west-2"); "default region env")]
    #[test_case(&[("AWS_REGION", ""), ("AWS_DEFAULT_REGION", "us-west-2")], Some("us-west-2"); "empty region env skipped")]
    #[test_case(&[], Some("us-east-1"); "default profile")]
    #[test_case(&[("AWS_PROFILE", "load-test")], Some("eu-west-1"); "named profile")]
    #[test_case(&[("AWS_PROFILE", "missing")], None; "unknown profile")]
    #[tokio::test]
    async fn test_resolve(envs: &[(&str, &str)], expected: Option<&str>) -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut envs: HashMap<String, String> = envs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        envs.insert(AWS_CONFIG_FILE.to_string(), config_path());

        let ctx = Context::new().with_file_read(TokioFileRead).with_env(StaticEnv {
            home_dir: None,
            envs,
        });

        let region = RegionResolver::new().resolve(&ctx).await?;
        assert_eq!(region.as_deref(), expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_without_anything() -> anyhow::Result<()> {
        let ctx = Context::new();
        assert_eq!(RegionResolver::new().resolve(&ctx).await?, None);

        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_PROFILE.to_string(), "load-test".to_string())]),
        });
        let region = RegionResolver::new()
            .with_config_file("/definitely/not/here")
            .resolve(&ctx)
            .await?;
        assert_eq!(region, None);
        Ok(())
    }
}
