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

//! Helpers for the shared AWS files (`~/.aws/credentials`, `~/.aws/config`).

use ini::Ini;
use log::debug;
use loadsign_core::{Context, Error, Result};

use crate::constants::AWS_PROFILE;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_CREDENTIALS_FILE: &str = "~/.aws/credentials";
pub const DEFAULT_CONFIG_FILE: &str = "~/.aws/config";

/// Profile selected by `AWS_PROFILE`, falling back to `fallback`.
pub fn current_profile(ctx: &Context, fallback: &str) -> String {
    ctx.env_var(AWS_PROFILE)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Section name of a profile inside the config file.
///
/// The config file prefixes every non-default profile with `profile `, the
/// credentials file does not.
pub fn config_section(profile: &str) -> String {
    match profile {
        DEFAULT_PROFILE => DEFAULT_PROFILE.to_string(),
        x => format!("profile {x}"),
    }
}

/// Load a shared INI file.
///
/// Path resolution: `explicit`, then the env var `env_key`, then `default_path`.
/// A file that can't be found or read yields `Ok(None)`, a file that can't be
/// parsed is an error.
pub async fn load_ini(
    ctx: &Context,
    explicit: Option<&str>,
    env_key: &str,
    default_path: &str,
) -> Result<Option<Ini>> {
    let path = match explicit {
        Some(path) => path.to_string(),
        None => ctx
            .env_var(env_key)
            .unwrap_or_else(|| default_path.to_string()),
    };

    let Some(expanded_path) = ctx.expand_home_dir(&path) else {
        debug!("failed to expand homedir for path: {path}");
        return Ok(None);
    };

    let content = match ctx.file_read_as_string(&expanded_path).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read shared file {expanded_path}: {err:?}");
            return Ok(None);
        }
    };

    Ini::load_from_str(&content).map(Some).map_err(|e| {
        Error::config_invalid(format!("failed to parse shared file {expanded_path}"))
            .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadsign_core::StaticEnv;
    use std::collections::HashMap;

    #[test]
    fn test_config_section() {
        assert_eq!(config_section("default"), "default");
        assert_eq!(config_section("load-test"), "profile load-test");
    }

    #[test]
    fn test_current_profile() {
        let ctx = Context::new();
        assert_eq!(current_profile(&ctx, "default"), "default");

        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_PROFILE.to_string(), "staging".to_string())]),
        });
        assert_eq!(current_profile(&ctx, "default"), "staging");
    }
}
