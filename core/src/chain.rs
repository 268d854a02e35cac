use crate::{Context, ProvideCredential, Result};
use async_trait::async_trait;
use std::fmt::{self, Debug};

/// A chain of credential providers tried in order.
///
/// The first provider that yields a credential wins. Providers that return
/// `None` or fail are skipped; failures are logged, not propagated, so one
/// misconfigured source does not block the rest of the chain.
pub struct ProvideCredentialChain<C> {
    providers: Vec<Box<dyn ProvideCredential<Credential = C>>>,
}

impl<C: Send + Sync + Unpin + 'static> ProvideCredentialChain<C> {
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a credential provider to the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = C> + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Create a credential provider chain from a vector of providers.
    pub fn from_vec(providers: Vec<Box<dyn ProvideCredential<Credential = C>>>) -> Self {
        Self { providers }
    }
}

impl<C: Send + Sync + Unpin + 'static> Default for ProvideCredentialChain<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Debug for ProvideCredentialChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers_count", &self.providers.len())
            .finish()
    }
}

#[async_trait]
impl<C: Send + Sync + Unpin + 'static> ProvideCredential for ProvideCredentialChain<C> {
    type Credential = C;

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
                    continue;
                }
                Err(e) => {
                    log::warn!("credential provider {provider:?} failed: {e:?}");
                    continue;
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Debug, Clone)]
    struct TestCredential(String);

    struct SuccessProvider(String);

    #[async_trait]
    impl ProvideCredential for SuccessProvider {
        type Credential = TestCredential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Ok(Some(TestCredential(self.0.clone())))
        }
    }

    impl Debug for SuccessProvider {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("SuccessProvider").finish()
        }
    }

    #[derive(Debug)]
    struct FailProvider;

    #[async_trait]
    impl ProvideCredential for FailProvider {
        type Credential = TestCredential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Err(Error::unexpected("provider failed"))
        }
    }

    #[derive(Debug)]
    struct EmptyProvider;

    #[async_trait]
    impl ProvideCredential for EmptyProvider {
        type Credential = TestCredential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let ctx = Context::new();
        let chain = ProvideCredentialChain::new()
            .push(FailProvider)
            .push(EmptyProvider)
            .push(SuccessProvider("first".to_string()))
            .push(SuccessProvider("second".to_string()));

        let cred = chain.provide_credential(&ctx).await.unwrap().unwrap();
        assert_eq!(cred.0, "first");
    }

    #[tokio::test]
    async fn test_chain_returns_none_when_nothing_loads() {
        let ctx = Context::new();
        let chain = ProvideCredentialChain::<TestCredential>::new()
            .push(FailProvider)
            .push(EmptyProvider);

        assert!(chain.provide_credential(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_chain_returns_none() {
        let ctx = Context::new();
        let chain = ProvideCredentialChain::<TestCredential>::new();

        assert!(chain.provide_credential(&ctx).await.unwrap().is_none());
    }
}
