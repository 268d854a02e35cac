//! Signed transfers for S3-compatible object storage.
//!
//! This crate combines the SigV4 signer from `stevedore_aws_v4` with a
//! transport from `stevedore_core` into two building blocks:
//!
//! - [`SignedClient`]: hashes the body, signs the request, and sends it
//!   through the configured transport
//! - [`MultipartUploader`]: splits a byte stream into fixed-size parts,
//!   uploads them concurrently with per-part retry, and completes the
//!   upload with a manifest ordered by part number
//!
//! ## Example
//!
//! ```no_run
//! use anyhow::Result;
//! use std::sync::Arc;
//! use stevedore_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use stevedore_core::{Context, OsEnv, Signer};
//! use stevedore_http_send_reqwest::ReqwestHttpSend;
//! use stevedore_transfer::{MultipartUploader, SignedClient, UploadOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!     let signer = Signer::new(
//!         ctx.clone(),
//!         DefaultCredentialProvider::default(),
//!         RequestSigner::new("s3", "us-east-1"),
//!     );
//!     let client = Arc::new(SignedClient::new(ctx, signer));
//!
//!     let mut upload = MultipartUploader::start(
//!         client,
//!         "https://my-bucket.s3.us-east-1.amazonaws.com/big-object",
//!         UploadOptions::default(),
//!     )
//!     .await?;
//!
//!     upload.write(&[0u8; 8 * 1024 * 1024]).await?;
//!     let completed = upload.close().await?;
//!     println!("uploaded {} parts", completed.parts.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod client;
pub use client::SignedClient;

mod multipart;
pub use multipart::{
    CompletedUpload, MultipartUploader, UploadOptions, MAX_PARTS, MIN_PART_SIZE,
};

mod retry;
pub use retry::{RetryExecutor, RetryPolicy};

pub mod xml;
pub use xml::CompletedPart;
