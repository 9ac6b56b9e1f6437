use crate::Credential;
use async_trait::async_trait;
use loadsign_core::{Context, ProvideCredential, Result};
use std::fmt::{self, Debug};

/// A chain of credential providers that will be tried in order.
///
/// The first provider returning a credential wins. Errors are logged and the
/// chain moves on to the next provider.
pub struct ProvideCredentialChain {
    providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>,
}

impl ProvideCredentialChain {
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a credential provider to the chain.
    pub fn push(
        mut self,
        provider: impl ProvideCredential<Credential = Credential> + 'static,
    ) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// The chain holds no provider.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProvideCredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ProvideCredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers", &self.providers)
            .finish()
    }
}

#[async_trait]
impl ProvideCredential for ProvideCredentialChain {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            log::debug!("trying credential provider: {provider:?}");

            match provider.provide_credential(ctx).await {
                Ok(Some(cred)) => {
                    log::debug!("loaded credential from provider: {provider:?}");
                    return Ok(Some(cred));
                }
                Ok(None) => {
                    log::debug!("no credential found in provider: {provider:?}");
                }
                Err(e) => {
                    log::warn!("error loading credential from provider {provider:?}: {e:?}");
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCredentialProvider;
    use loadsign_core::Error;

    #[derive(Debug)]
    struct FailProvider;

    #[async_trait]
    impl ProvideCredential for FailProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Err(Error::credential_fetch("provider failed"))
        }
    }

    #[derive(Debug)]
    struct EmptyProvider;

    #[async_trait]
    impl ProvideCredential for EmptyProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_chain_skips_failures() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let chain = ProvideCredentialChain::new()
            .push(FailProvider)
            .push(EmptyProvider)
            .push(StaticCredentialProvider::new("ak", "sk"));
        assert_eq!(chain.len(), 3);

        let cred = chain
            .provide_credential(&Context::new())
            .await?
            .expect("last provider must win");
        assert_eq!(cred.access_key_id, "ak");
        Ok(())
    }

    #[tokio::test]
    async fn test_chain_first_wins() -> anyhow::Result<()> {
        let chain = ProvideCredentialChain::new()
            .push(StaticCredentialProvider::new("first", "sk"))
            .push(StaticCredentialProvider::new("second", "sk"));

        let cred = chain
            .provide_credential(&Context::new())
            .await?
            .expect("first provider must win");
        assert_eq!(cred.access_key_id, "first");
        Ok(())
    }

    #[tokio::test]
    async fn test_chain_exhausted() -> anyhow::Result<()> {
        let chain = ProvideCredentialChain::new()
            .push(FailProvider)
            .push(EmptyProvider);
        assert!(chain.provide_credential(&Context::new()).await?.is_none());

        let empty = ProvideCredentialChain::default();
        assert!(empty.is_empty());
        assert!(empty.provide_credential(&Context::new()).await?.is_none());
        Ok(())
    }
}
