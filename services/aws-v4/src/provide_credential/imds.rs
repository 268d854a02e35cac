use crate::constants::AWS_EC2_METADATA_DISABLED;
use crate::{Config, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::Method;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use stevedore_core::time::{now, parse_rfc3339, DateTime};
use stevedore_core::{Context, Error, ProvideCredential, Result};

/// IMDSv2CredentialProvider loads credentials from the EC2 instance
/// metadata service.
///
/// The session token required by IMDSv2 is fetched once and cached until
/// shortly before it expires.
#[derive(Debug)]
pub struct IMDSv2CredentialProvider {
    config: Arc<Config>,
    endpoint: Option<String>,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for IMDSv2CredentialProvider {
    fn default() -> Self {
        Self::new(Arc::new(Config::default()))
    }
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            endpoint: None,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn get_endpoint(&self, ctx: &Context) -> String {
        // Configured endpoint first, then environment, then the default.
        self.endpoint.clone().unwrap_or_else(|| {
            ctx.env_var("AWS_EC2_METADATA_SERVICE_ENDPOINT")
                .unwrap_or_else(|| "http://169.254.169.254".into())
        })
    }

    async fn load_ec2_metadata_token(&self, ctx: &Context) -> Result<String> {
        {
            let (token, expires_in) = self.token.lock().expect("lock poisoned").clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let endpoint = self.get_endpoint(ctx);
        let url = format!("{}/latest/api/token", endpoint);
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            // 21600s (6h) is the recommended session length.
            .header("x-aws-ec2-metadata-token-ttl-seconds", "21600")
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build metadata token request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to connect to instance metadata service")
                .with_source(e)
                .with_context(format!("endpoint: {endpoint}"))
                .set_retryable(true)
        })?;

        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "failed to fetch metadata token: status={}, body={}",
                resp.status(),
                resp.body()
            )));
        }
        let ec2_token = resp.into_body();
        // Expire the cached token 10 minutes early to enforce a re-read.
        let expires_in = now() + chrono::TimeDelta::try_seconds(21600).expect("in bounds")
            - chrono::TimeDelta::try_seconds(600).expect("in bounds");

        {
            *self.token.lock().expect("lock poisoned") = (ec2_token.clone(), expires_in);
        }

        Ok(ec2_token)
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if self.config.ec2_metadata_disabled {
            return Ok(None);
        }
        let disabled_env = ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .map(|v| v == "true")
            .unwrap_or(false);
        if disabled_env {
            return Ok(None);
        }

        let token = self.load_ec2_metadata_token(ctx).await?;

        // Discover the instance profile attached to this node.
        let endpoint = self.get_endpoint(ctx);
        let url = format!("{}/latest/meta-data/iam/security-credentials/", endpoint);
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::GET)
            .header("x-aws-ec2-metadata-token", &token)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build role discovery request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to list instance profiles")
                .with_source(e)
                .set_retryable(true)
        })?;

        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "failed to list instance profiles: status={}, body={}",
                resp.status(),
                resp.body()
            )));
        }

        let profile_name = resp.into_body();
        if profile_name.is_empty() {
            return Err(Error::config_invalid("no IAM role attached to instance")
                .with_context("hint: attach an IAM role to the instance"));
        }

        // Fetch the credentials for the discovered role.
        let url = format!(
            "{}/latest/meta-data/iam/security-credentials/{profile_name}",
            endpoint
        );
        let req = http::Request::builder()
            .uri(url)
            .method(Method::GET)
            .header("x-aws-ec2-metadata-token", &token)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build credential fetch request")
                    .with_source(e)
                    .with_context(format!("profile: {profile_name}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to fetch instance credentials")
                .with_source(e)
                .with_context(format!("profile: {profile_name}"))
                .set_retryable(true)
        })?;

        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "failed to fetch instance credentials: status={}, body={}",
                resp.status(),
                resp.body()
            ))
            .with_context(format!("profile: {profile_name}")));
        }

        let content = resp.into_body();
        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected("failed to parse instance credential document")
                    .with_source(e)
                    .with_context(format!("profile: {profile_name}"))
            })?;

        match resp.code.as_str() {
            "Success" => {}
            code if code.contains("Expired") => {
                return Err(Error::credential_invalid(format!(
                    "instance credentials expired: {}",
                    resp.message
                ))
                .with_context(format!("error_code: {code}"))
                .with_context(format!("profile: {profile_name}")));
            }
            code => {
                return Err(Error::unexpected(format!(
                    "instance metadata returned error: [{}] {}",
                    code, resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
        }

        let cred = Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration).map_err(|e| {
                Error::unexpected("failed to parse credential expiration time")
                    .with_source(e)
                    .with_context(format!("expiration_value: {}", resp.expiration))
            })?),
        };

        Ok(Some(cred))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use stevedore_core::StaticEnv;

    #[tokio::test]
    async fn test_imds_disabled_via_env() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_EC2_METADATA_DISABLED.to_string(), "true".to_string())]),
        });

        let provider = IMDSv2CredentialProvider::default();
        let result = provider.provide_credential(&ctx).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_imds_disabled_via_config() {
        let ctx = Context::new().with_env(StaticEnv::default());

        let provider = IMDSv2CredentialProvider::new(Arc::new(Config {
            ec2_metadata_disabled: true,
            ..Default::default()
        }));
        let result = provider.provide_credential(&ctx).await.unwrap();
        assert!(result.is_none());
    }
}
