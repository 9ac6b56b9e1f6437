use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use log::{debug, warn};
use loadsign_aws_v4::{Credential, DefaultCredentialProvider, RegionResolver};
use loadsign_core::{Context, Error, OsEnv, ProvideCredential, Result};
use loadsign_file_read_tokio::TokioFileRead;
use loadsign_http_send_reqwest::ReqwestHttpSend;

/// Where the plugin gets its credentials and region from.
///
/// `fetch` is called exactly once per plugin. `region` is read after `fetch`
/// completed.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    /// Fetch the credentials, `Ok(None)` when no source has any.
    async fn fetch(&self) -> Result<Option<Arc<Credential>>>;

    /// The region to sign for.
    fn region(&self) -> Option<String>;
}

/// CredentialSource backed by the process environment and the shared AWS files.
pub struct AmbientCredentialSource {
    ctx: Context,
    provider: Box<dyn ProvideCredential<Credential = Credential>>,
    region_resolver: RegionResolver,
    region: OnceLock<Option<String>>,
}

impl Default for AmbientCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbientCredentialSource {
    /// Use the default credential chain against the real environment.
    pub fn new() -> Self {
        Self {
            ctx: Context::new()
                .with_file_read(TokioFileRead)
                .with_http_send(ReqwestHttpSend::default())
                .with_env(OsEnv),
            provider: Box::new(DefaultCredentialProvider::new()),
            region_resolver: RegionResolver::new(),
            region: OnceLock::new(),
        }
    }

    /// Replace the context the providers read from.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Replace the credential provider.
    pub fn with_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// Replace the region resolver.
    pub fn with_region_resolver(mut self, resolver: RegionResolver) -> Self {
        self.region_resolver = resolver;
        self
    }
}

impl Debug for AmbientCredentialSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientCredentialSource")
            .field("provider", &self.provider)
            .field("region_resolver", &self.region_resolver)
            .field("region", &self.region.get())
            .finish()
    }
}

#[async_trait]
impl CredentialSource for AmbientCredentialSource {
    async fn fetch(&self) -> Result<Option<Arc<Credential>>> {
        let cred = self
            .provider
            .provide_credential(&self.ctx)
            .await
            .map_err(|e| Error::credential_fetch(e.to_string()).with_source(e))?;

        let region = match self.region_resolver.resolve(&self.ctx).await {
            Ok(region) => region,
            Err(e) => {
                warn!("failed to resolve region: {e:?}");
                None
            }
        };
        debug!("resolved credential {cred:?} for region {region:?}");
        let _ = self.region.set(region);

        Ok(cred.map(Arc::new))
    }

    fn region(&self) -> Option<String> {
        self.region.get().cloned().flatten()
    }
}

/// CredentialSource returning fixed values.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    credential: Option<Arc<Credential>>,
    region: Option<String>,
}

impl StaticCredentialSource {
    pub fn new(credential: Option<Credential>, region: Option<&str>) -> Self {
        Self {
            credential: credential.map(Arc::new),
            region: region.map(str::to_string),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn fetch(&self) -> Result<Option<Arc<Credential>>> {
        Ok(self.credential.clone())
    }

    fn region(&self) -> Option<String> {
        self.region.clone()
    }
}
