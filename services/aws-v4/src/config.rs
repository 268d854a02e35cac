use crate::constants::*;
use std::fmt::{Debug, Formatter};
use stevedore_core::utils::Redact;
use stevedore_core::Context;

/// Static configuration for AWS-style signing and credential loading.
///
/// Fields left `None` fall through to the other providers in the default
/// chain.
#[derive(Clone, Default)]
pub struct Config {
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Session token, for temporary credentials.
    pub session_token: Option<String>,
    /// Region the requests are signed for.
    pub region: Option<String>,
    /// Disable the ECS (container) credential provider.
    pub container_credentials_disabled: bool,
    /// Disable the EC2 instance metadata credential provider.
    pub ec2_metadata_disabled: bool,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("region", &self.region)
            .field(
                "container_credentials_disabled",
                &self.container_credentials_disabled,
            )
            .field("ec2_metadata_disabled", &self.ec2_metadata_disabled)
            .finish()
    }
}

impl Config {
    /// Populate a config from environment variables through the context's
    /// [`Env`](stevedore_core::Env) implementation.
    pub fn from_env(ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        Self {
            access_key_id: envs.get(AWS_ACCESS_KEY_ID).cloned(),
            secret_access_key: envs.get(AWS_SECRET_ACCESS_KEY).cloned(),
            session_token: envs.get(AWS_SESSION_TOKEN).cloned(),
            region: envs.get(AWS_REGION).cloned(),
            container_credentials_disabled: false,
            ec2_metadata_disabled: envs
                .get(AWS_EC2_METADATA_DISABLED)
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }
}
