//! Core components for signing API requests and driving signed transfers.
//!
//! This crate provides the foundational types and traits for the stevedore
//! workspace. It defines the abstractions that service crates plug into.
//!
//! ## Overview
//!
//! - **Context**: a container holding the file reading, HTTP sending, and
//!   environment access implementations the caller wired in
//! - **Traits**: [`ProvideCredential`] for loading key material and
//!   [`SignRequest`] for attaching signatures
//! - **Signer**: the orchestrator that coordinates credential loading,
//!   caching, and request signing
//!
//! ## Example
//!
//! ```no_run
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use std::time::Duration;
//! use stevedore_core::{Context, ProvideCredential, SignRequest, Signer, SigningCredential};
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(
//!         &self,
//!         _: &Context,
//!     ) -> stevedore_core::Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-access-key".to_string(),
//!             secret: "my-secret-key".to_string(),
//!         }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! #[async_trait]
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _ctx: &Context,
//!         _req: &mut http::request::Parts,
//!         _cred: Option<&Self::Credential>,
//!         _expires_in: Option<Duration>,
//!     ) -> stevedore_core::Result<()> {
//!         // Build and attach the signature here.
//!         todo!()
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::default();
//! let signer = Signer::new(ctx, MyProvider, MySigner);
//!
//! let mut parts = http::Request::builder()
//!     .method("GET")
//!     .uri("https://example.com")
//!     .body(())
//!     .unwrap()
//!     .into_parts()
//!     .0;
//!
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend, OsEnv, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::{scan_query, SigningMethod, SigningRequest};
mod signer;
pub use signer::Signer;
