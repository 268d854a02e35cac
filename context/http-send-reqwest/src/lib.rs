//! reqwest-based HTTP sending implementation for stevedore.
//!
//! This crate provides [`ReqwestHttpSend`], an [`HttpSend`] implementation
//! over a shared [`reqwest::Client`]. It is the transport used by
//! credential providers that talk to metadata endpoints and by the signed
//! request pipeline. Connect and read timeouts are whatever the supplied
//! client was built with.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use stevedore_core::{Error, HttpSend, Result};

/// HttpSend implementation backed by [`reqwest::Client`].
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: reqwest::Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = reqwest::Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::transport("failed to send request").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::transport("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
