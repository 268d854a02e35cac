//! Tokio-based file reading implementation for stevedore.
//!
//! This crate provides [`TokioFileRead`], an async file reader that
//! implements the [`FileRead`] trait from `stevedore_core` using Tokio's
//! file system operations. Credential providers use it to read key
//! material from disk.
//!
//! ## Example
//!
//! ```no_run
//! use stevedore_core::{Context, OsEnv};
//! use stevedore_file_read_tokio::TokioFileRead;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead::default())
//!         .with_env(OsEnv);
//!
//!     match ctx.file_read("/path/to/credentials.json").await {
//!         Ok(content) => println!("Read {} bytes", content.len()),
//!         Err(e) => eprintln!("Failed to read file: {}", e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use stevedore_core::{Error, FileRead, Result};

/// Tokio-based implementation of the [`FileRead`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| Error::unexpected("failed to read file").with_source(e))
    }
}
