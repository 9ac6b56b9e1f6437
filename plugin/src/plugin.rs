use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use log::{debug, warn};
use loadsign_core::{Error, Result};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::PluginConfig;
use crate::gate::{Admission, CredentialGate, PendingRequest};
use crate::host::{Done, EventEmitter, ExecutionContext, Processor, RequestParams, ScriptConfig};
use crate::sign::{RequestTransform, SignOutcome, SigningMaterial};
use crate::source::{AmbientCredentialSource, CredentialSource};

/// Name the processor is registered under in [`ScriptConfig::processors`].
pub const PROCESSOR_NAME: &str = "addAmazonSignatureV4";

/// Counter bumped for every signed request.
pub const METRIC_SIGNED: &str = "aws_sigv4.signed";
/// Counter bumped for every request sent unsigned.
pub const METRIC_SKIPPED: &str = "aws_sigv4.skipped";
/// Counter bumped for every request completed with an error.
pub const METRIC_ERRORS: &str = "aws_sigv4.errors";

/// The aws-sigv4 plugin.
///
/// Cloning is cheap: all clones share the same gate and credentials.
#[derive(Clone)]
pub struct Plugin {
    inner: Arc<Inner>,
}

struct Inner {
    config: PluginConfig,
    gate: CredentialGate,
    transform: RequestTransform,
    events: Arc<dyn EventEmitter>,
}

impl Plugin {
    /// Build the plugin with credentials from the environment and the shared
    /// AWS files.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(script: &mut ScriptConfig, events: Arc<dyn EventEmitter>) -> Result<Self> {
        Self::with_source(script, events, AmbientCredentialSource::new())
    }

    /// Build the plugin with the given credential source.
    pub fn with_source(
        script: &mut ScriptConfig,
        events: Arc<dyn EventEmitter>,
        source: impl CredentialSource,
    ) -> Result<Self> {
        let config = PluginConfig::validate(&script.config)?;
        let transform = RequestTransform::new(&config);
        Self::build(script, events, source, config, transform)
    }

    /// Build the plugin with a custom transform.
    pub fn with_transform(
        script: &mut ScriptConfig,
        events: Arc<dyn EventEmitter>,
        source: impl CredentialSource,
        transform: RequestTransform,
    ) -> Result<Self> {
        let config = PluginConfig::validate(&script.config)?;
        Self::build(script, events, source, config, transform)
    }

    fn build(
        script: &mut ScriptConfig,
        events: Arc<dyn EventEmitter>,
        source: impl CredentialSource,
        config: PluginConfig,
        transform: RequestTransform,
    ) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            Error::config_invalid("the aws-sigv4 plugin must be created within a tokio runtime")
                .with_source(e)
        })?;

        let plugin = Plugin {
            inner: Arc::new(Inner {
                gate: CredentialGate::new(config.pending),
                config,
                transform,
                events,
            }),
        };
        debug!("created plugin: {plugin:?}");

        let inner = plugin.inner.clone();
        handle.spawn(async move {
            match source.fetch().await {
                Ok(credential) => {
                    let material = SigningMaterial {
                        credential,
                        region: source.region(),
                    };
                    debug!("credentials resolved for region {:?}", material.region);
                    inner
                        .gate
                        .resolve(material, |req, material| inner.run(req, material));
                }
                Err(err) => inner.gate.fail(&err),
            }
        });

        script
            .processors
            .insert(PROCESSOR_NAME.to_string(), Arc::new(plugin.clone()));
        Ok(plugin)
    }

    /// The validated configuration.
    pub fn config(&self) -> &PluginConfig {
        &self.inner.config
    }

    /// Process a request and wait for its completion.
    ///
    /// Events go to the emitter the plugin was built with.
    pub async fn process_async(
        &self,
        request: RequestParams,
        context: ExecutionContext,
    ) -> (RequestParams, Result<()>) {
        let (tx, rx) = oneshot::channel();
        let fallback = request.clone();

        self.process(
            request,
            context,
            self.inner.events.clone(),
            Box::new(move |req, res| {
                let _ = tx.send((req, res));
            }),
        );

        rx.await.unwrap_or_else(|_| {
            (
                fallback,
                Err(Error::unexpected("request dropped before completion")),
            )
        })
    }
}

impl Inner {
    fn run(&self, req: PendingRequest, material: &SigningMaterial) {
        let PendingRequest {
            mut request,
            context,
            events,
            done,
        } = req;

        let result = match self.transform.sign(material, &mut request, &context) {
            Ok(SignOutcome::Signed) => {
                events.counter(METRIC_SIGNED, 1);
                Ok(())
            }
            Ok(SignOutcome::Skipped) => {
                events.counter(METRIC_SKIPPED, 1);
                Ok(())
            }
            Err(err) => {
                warn!("failed to sign request {} {:?}: {err:?}", request.method, request.url);
                events.counter(METRIC_ERRORS, 1);
                Err(err)
            }
        };

        done(request, result)
    }
}

impl Processor for Plugin {
    fn process(
        &self,
        request: RequestParams,
        context: ExecutionContext,
        events: Arc<dyn EventEmitter>,
        done: Done,
    ) {
        let req = PendingRequest {
            request,
            context,
            events,
            done,
        };

        match self.inner.gate.admit(req) {
            Admission::Ready(material, req) => self.inner.run(req, &material),
            Admission::Held => debug!("request held until credentials resolve"),
            Admission::Rejected(req, err) => {
                req.events.counter(METRIC_ERRORS, 1);
                req.reject(err)
            }
        }
    }
}

impl Debug for Plugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("config", &self.inner.config)
            .field("gate", &self.inner.gate)
            .field("transform", &self.inner.transform)
            .finish()
    }
}
