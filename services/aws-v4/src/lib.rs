//! AWS SigV4 request signing.
//!
//! This crate implements the Signature Version 4 protocol against the
//! abstractions of `stevedore_core`: a [`RequestSigner`] that
//! canonicalizes and signs requests (header or presigned-query variant),
//! the [`Credential`] type, and the credential providers that load key
//! material from configuration, the environment, or metadata endpoints.
//!
//! ## Example
//!
//! ```no_run
//! use anyhow::Result;
//! use stevedore_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use stevedore_core::{Context, OsEnv, Signer};
//! use stevedore_file_read_tokio::TokioFileRead;
//! use stevedore_http_send_reqwest::ReqwestHttpSend;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead)
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     let signer = Signer::new(
//!         ctx,
//!         DefaultCredentialProvider::default(),
//!         RequestSigner::new("s3", "us-east-1"),
//!     );
//!
//!     let mut parts = http::Request::builder()
//!         .method("GET")
//!         .uri("https://my-bucket.s3.us-east-1.amazonaws.com/object")
//!         .body(())
//!         .unwrap()
//!         .into_parts()
//!         .0;
//!     signer.sign(&mut parts, None).await?;
//!     Ok(())
//! }
//! ```

pub mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::{
    ConfigCredentialProvider, DefaultCredentialProvider, EcsCredentialProvider,
    EnvCredentialProvider, IMDSv2CredentialProvider, StaticCredentialProvider,
};

mod sign_request;
pub use sign_request::RequestSigner;
