//! AWS SigV4 request-signing plugin for load-testing hosts.
//!
//! The host builds one [`Plugin`] per run and calls the registered
//! `addAmazonSignatureV4` processor for every request right before sending
//! it. The plugin resolves `{{name}}` placeholders, signs the final request
//! with SigV4 and merges the resulting headers back into the request.
//!
//! Credentials are fetched once, in the background. Requests arriving before
//! the fetch completes are held by a [`CredentialGate`] and replayed as soon
//! as it does.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use loadsign_plugin::{ExecutionContext, NoopEventEmitter, Plugin, RequestParams, ScriptConfig};
//! use serde_json::json;
//!
//! # async fn example() -> loadsign_core::Result<()> {
//! let mut script = ScriptConfig::new(json!({
//!     "target": "https://abc123.execute-api.us-east-1.amazonaws.com",
//!     "plugins": {"aws-sigv4": {"serviceName": "execute-api"}}
//! }));
//! let plugin = Plugin::new(&mut script, Arc::new(NoopEventEmitter))?;
//!
//! let ctx = ExecutionContext::new().with_var("id", "42");
//! let (req, res) = plugin
//!     .process_async(RequestParams::new("GET", "/prod/items/{{id}}"), ctx)
//!     .await;
//! res?;
//! assert!(req.headers.contains_key("authorization"));
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::{PendingPolicy, PluginConfig, PLUGIN_NAME};

mod gate;
pub use gate::{Admission, CredentialGate, PendingRequest};

mod host;
pub use host::{
    Done, EventEmitter, ExecutionContext, NoopEventEmitter, Processor, RequestParams,
    ScriptConfig,
};

mod plugin;
pub use plugin::{Plugin, METRIC_ERRORS, METRIC_SIGNED, METRIC_SKIPPED, PROCESSOR_NAME};

mod sdk;
pub use sdk::{is_usable, SDK_CONFIG_INVALID};

mod sign;
pub use sign::{RequestTransform, SignOutcome, SigningMaterial};

mod source;
pub use source::{AmbientCredentialSource, CredentialSource, StaticCredentialSource};

mod template;
pub use template::{Substitute, Template};
