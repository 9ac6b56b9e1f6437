use loadsign_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Name of the plugin section under `config.plugins`.
pub const PLUGIN_NAME: &str = "aws-sigv4";

/// What to do with requests that arrive before credentials are resolved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Hold the first early request, reject any other one.
    #[default]
    Single,
    /// Hold every early request and replay them in arrival order.
    Queue,
}

/// Validated plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    /// AWS service the signature is scoped to, like `execute-api` or `s3`.
    pub service_name: String,
    /// Base url prefixed to root-relative request urls.
    pub target: Option<String>,
    pub pending: PendingPolicy,
}

impl PluginConfig {
    /// Validate the host script.
    ///
    /// `script` may be the `config` object itself or a document holding it
    /// under a top-level `config` key.
    pub fn validate(script: &Value) -> Result<Self> {
        let config = match script.get("config") {
            Some(v) if v.is_object() => v,
            _ => script,
        };

        let section = config
            .get("plugins")
            .and_then(|v| v.get(PLUGIN_NAME))
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Error::missing_plugin_config(format!(
                    "The {PLUGIN_NAME} plugin requires configuration under [script].config.plugins.{PLUGIN_NAME}."
                ))
            })?;
        if !section.is_object() {
            return Err(Error::config_invalid(format!(
                "The {PLUGIN_NAME} plugin configuration must be a mapping."
            )));
        }

        let service_name = match section.get("serviceName") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(Error::invalid_service_name_type(
                    "The \"serviceName\" parameter must have a string value.",
                ))
            }
        }
        .ok_or_else(|| Error::missing_service_name("The \"serviceName\" parameter is required."))?;

        let pending = match section.get("pendingPolicy") {
            None | Some(Value::Null) => PendingPolicy::default(),
            Some(v) => PendingPolicy::deserialize(v).map_err(|e| {
                Error::config_invalid(
                    "The \"pendingPolicy\" parameter must be either \"single\" or \"queue\".",
                )
                .with_source(e)
            })?,
        };

        let target = match config.get("target") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(Error::config_invalid(
                    "The \"target\" parameter must have a string value.",
                ))
            }
        };

        Ok(PluginConfig {
            service_name,
            target,
            pending,
        })
    }
}
