use crate::provide_credential::{
    ConfigCredentialProvider, EcsCredentialProvider, EnvCredentialProvider,
    IMDSv2CredentialProvider,
};
use crate::{Config, Credential};
use async_trait::async_trait;
use std::sync::Arc;
use stevedore_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

/// DefaultCredentialProvider resolves credentials through the standard
/// chain.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Static configuration
/// 3. ECS (container) task metadata
/// 4. EC2 IMDSv2
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new(Arc::new(Config::default()))
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new(config: Arc<Config>) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ConfigCredentialProvider::new(config.clone()))
            .push(EcsCredentialProvider::new(config.clone()))
            .push(IMDSv2CredentialProvider::new(config));

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        AWS_ACCESS_KEY_ID, AWS_EC2_METADATA_DISABLED, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN,
    };
    use std::collections::HashMap;
    use stevedore_core::StaticEnv;

    #[tokio::test]
    async fn test_default_provider_without_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_EC2_METADATA_DISABLED.to_string(), "true".to_string())]),
        });

        let provider = DefaultCredentialProvider::default();
        let loaded = provider
            .provide_credential(&ctx)
            .await
            .expect("load must succeed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_default_provider_with_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from_iter([
                (AWS_ACCESS_KEY_ID.to_string(), "access_key_id".to_string()),
                (
                    AWS_SECRET_ACCESS_KEY.to_string(),
                    "secret_access_key".to_string(),
                ),
                (AWS_SESSION_TOKEN.to_string(), "session_token".to_string()),
            ]),
        });

        let provider = DefaultCredentialProvider::default();
        let cred = provider
            .provide_credential(&ctx)
            .await
            .expect("load must succeed")
            .expect("credential must be found");
        assert_eq!("access_key_id", cred.access_key_id);
        assert_eq!("secret_access_key", cred.secret_access_key);
        assert_eq!(Some("session_token"), cred.session_token.as_deref());
    }

    #[tokio::test]
    async fn test_default_provider_prefers_env_over_config() {
        let _ = env_logger::builder().is_test(true).try_init();

        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from_iter([
                (AWS_ACCESS_KEY_ID.to_string(), "env_ak".to_string()),
                (AWS_SECRET_ACCESS_KEY.to_string(), "env_sk".to_string()),
            ]),
        });

        let provider = DefaultCredentialProvider::new(Arc::new(Config {
            access_key_id: Some("config_ak".to_string()),
            secret_access_key: Some("config_sk".to_string()),
            ..Default::default()
        }));
        let cred = provider
            .provide_credential(&ctx)
            .await
            .unwrap()
            .expect("credential must be found");
        assert_eq!("env_ak", cred.access_key_id);
    }
}
