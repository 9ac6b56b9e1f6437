//! Types shared with the load-testing host.
//!
//! The host owns the scenario engine and the HTTP transport. It hands every
//! generated request to the processors registered on its [`ScriptConfig`]
//! right before sending it.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use loadsign_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An outbound request as generated by the host.
///
/// `uri` takes precedence over `url` when both are set. `json` takes
/// precedence over `body`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
}

impl RequestParams {
    /// Create a request with the given method and url.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a raw body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a json body.
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }
}

/// Per virtual user variables available to template substitution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub vars: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

/// Sink for the host's metrics events.
pub trait EventEmitter: Send + Sync + 'static {
    /// Increment the counter `name` by `value`.
    fn counter(&self, name: &str, value: u64);
}

/// EventEmitter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn counter(&self, _: &str, _: u64) {}
}

/// Completion callback handed to a processor.
///
/// It must be invoked exactly once. The request travels back to the host
/// through it, signed or not.
pub type Done = Box<dyn FnOnce(RequestParams, Result<()>) + Send + 'static>;

/// A per-request hook the host invokes before sending a request.
pub trait Processor: Send + Sync + 'static {
    fn process(
        &self,
        request: RequestParams,
        context: ExecutionContext,
        events: Arc<dyn EventEmitter>,
        done: Done,
    );
}

/// The host's run-wide script.
///
/// `config` is the script as parsed from YAML or JSON, `processors` is where
/// plugins register their hooks.
#[derive(Default)]
pub struct ScriptConfig {
    pub config: Value,
    pub processors: BTreeMap<String, Arc<dyn Processor>>,
}

impl ScriptConfig {
    pub fn new(config: Value) -> Self {
        Self {
            config,
            processors: BTreeMap::new(),
        }
    }

    /// Look up a registered processor by name.
    pub fn processor(&self, name: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(name).cloned()
    }
}

impl Debug for ScriptConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptConfig")
            .field("config", &self.config)
            .field("processors", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_params_serde() -> anyhow::Result<()> {
        let req: RequestParams = serde_json::from_value(json!({
            "url": "https://api.example.com/items",
            "method": "POST",
            "headers": {"Content-Type": "application/json"},
            "json": {"id": "{{id}}"}
        }))?;

        assert_eq!(
            req,
            RequestParams::new("POST", "https://api.example.com/items")
                .with_header("Content-Type", "application/json")
                .with_json(json!({"id": "{{id}}"}))
        );

        let value = serde_json::to_value(&req)?;
        assert!(value.get("uri").is_none());
        assert!(value.get("body").is_none());
        Ok(())
    }

    #[test]
    fn test_script_config_debug_lists_processors() {
        let script = ScriptConfig::new(json!({"target": "https://api.example.com"}));
        let out = format!("{script:?}");
        assert!(out.contains("processors: []"));
        assert!(script.processor("missing").is_none());
    }
}
