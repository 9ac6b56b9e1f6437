use crate::provide_credential::{
    EcsCredentialProvider, EnvCredentialProvider, ImdsCredentialProvider,
    ProfileCredentialProvider, ProvideCredentialChain,
};
use crate::Credential;
use async_trait::async_trait;
use loadsign_core::{Context, ProvideCredential, Result};

/// DefaultCredentialProvider is a loader that will try to load credential via default chains.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Shared config (`~/.aws/credentials`, then `~/.aws/config`), assuming
///    the profile's role when it names a source
/// 3. ECS container credentials
/// 4. EC2 instance metadata (IMDSv2)
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ProfileCredentialProvider::new())
            .push(EcsCredentialProvider::new())
            .push(ImdsCredentialProvider::new());

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
