use bytes::Bytes;
use http::{header, HeaderValue};
use log::debug;
use std::time::Duration;
use stevedore_aws_v4::constants::X_AMZ_CONTENT_SHA_256;
use stevedore_aws_v4::Credential;
use stevedore_core::hash::hex_sha256;
use stevedore_core::{Context, Error, Result, Signer};

/// SignedClient turns a logical request into a signed wire request and
/// sends it.
///
/// It computes the body hash and content length, lets the [`Signer`]
/// attach the `Authorization` header (which also injects the session
/// token and date), and hands the request to the transport configured on
/// the [`Context`]. Signatures are never cached: timestamps make every
/// one single-use.
#[derive(Clone, Debug)]
pub struct SignedClient {
    ctx: Context,
    signer: Signer<Credential>,
}

impl SignedClient {
    /// Create a new client from a context and a signer.
    pub fn new(ctx: Context, signer: Signer<Credential>) -> Self {
        Self { ctx, signer }
    }

    /// Sign the request and send it, returning whatever the service
    /// answered.
    ///
    /// Transport failures come back as retryable `Transport` errors; the
    /// response status is not inspected here.
    pub async fn execute(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (mut parts, body) = req.into_parts();

        parts.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&hex_sha256(&body))?,
        );
        if !parts.headers.contains_key(header::CONTENT_LENGTH) {
            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        self.signer.sign(&mut parts, None).await?;
        debug!("sending {} {}", parts.method, parts.uri);

        self.ctx
            .http_send(http::Request::from_parts(parts, body))
            .await
            .map_err(|e| Error::transport("failed to send request").with_source(e))
    }

    /// Like [`execute`](Self::execute), but non-2xx responses become
    /// `Service` errors carrying the status and a body snippet.
    pub async fn execute_checked(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>> {
        let resp = self.execute(req).await?;
        if resp.status().is_success() {
            return Ok(resp);
        }

        let (parts, body) = resp.into_parts();
        Err(service_error(parts.status, &body))
    }

    /// Produce a presigned URL for the request, valid for `expires_in`,
    /// without sending anything.
    pub async fn presign(
        &self,
        req: http::Request<()>,
        expires_in: Duration,
    ) -> Result<http::Uri> {
        let (mut parts, _) = req.into_parts();
        self.signer.sign(&mut parts, Some(expires_in)).await?;
        Ok(parts.uri)
    }
}

fn service_error(status: http::StatusCode, body: &[u8]) -> Error {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(256)]);
    Error::service(format!("service replied with {status}: {snippet}")).with_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use stevedore_aws_v4::{RequestSigner, StaticCredentialProvider};
    use stevedore_core::HttpSend;

    #[derive(Debug, Clone, Default)]
    struct RecordingTransport {
        requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
        status: u16,
    }

    #[async_trait]
    impl HttpSend for RecordingTransport {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            let resp = http::Response::builder()
                .status(self.status)
                .body(Bytes::from_static(b"response body"))
                .expect("response must build");
            self.requests.lock().unwrap().push(req);
            Ok(resp)
        }
    }

    fn test_client(transport: RecordingTransport) -> SignedClient {
        let ctx = Context::new().with_http_send(transport);
        let signer = Signer::new(
            ctx.clone(),
            StaticCredentialProvider::new("access_key_id", "secret_access_key"),
            RequestSigner::new("s3", "us-east-1"),
        );
        SignedClient::new(ctx, signer)
    }

    #[tokio::test]
    async fn test_execute_signs_and_hashes_body() -> anyhow::Result<()> {
        let transport = RecordingTransport {
            status: 200,
            ..Default::default()
        };
        let client = test_client(transport.clone());

        let body = Bytes::from_static(b"Hello,World!");
        let req = http::Request::builder()
            .method(http::Method::PUT)
            .uri("https://bucket.s3.us-east-1.amazonaws.com/key")
            .body(body.clone())?;
        client.execute_checked(req).await?;

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(
            sent.headers()[X_AMZ_CONTENT_SHA_256],
            hex_sha256(&body).as_str()
        );
        assert_eq!(sent.headers()[header::CONTENT_LENGTH], "12");
        assert!(sent.headers().contains_key(header::AUTHORIZATION));
        assert!(sent.headers().contains_key("x-amz-date"));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_success_becomes_service_error() -> anyhow::Result<()> {
        let transport = RecordingTransport {
            status: 503,
            ..Default::default()
        };
        let client = test_client(transport);

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri("https://bucket.s3.us-east-1.amazonaws.com/key")
            .body(Bytes::new())?;
        let err = client.execute_checked(req).await.unwrap_err();

        assert_eq!(err.kind(), stevedore_core::ErrorKind::Service);
        assert_eq!(err.status(), Some(http::StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("response body"));
        Ok(())
    }

    #[tokio::test]
    async fn test_client_error_is_not_retryable() -> anyhow::Result<()> {
        let transport = RecordingTransport {
            status: 404,
            ..Default::default()
        };
        let client = test_client(transport);

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri("https://bucket.s3.us-east-1.amazonaws.com/missing")
            .body(Bytes::new())?;
        let err = client.execute_checked(req).await.unwrap_err();

        assert_eq!(err.kind(), stevedore_core::ErrorKind::Service);
        assert!(!err.is_retryable());
        Ok(())
    }

    #[tokio::test]
    async fn test_presign_attaches_query_signature() -> anyhow::Result<()> {
        let client = test_client(RecordingTransport {
            status: 200,
            ..Default::default()
        });

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri("https://bucket.s3.us-east-1.amazonaws.com/key")
            .body(())?;
        let uri = client.presign(req, Duration::from_secs(3600)).await?;

        let query = uri.query().expect("query must be present");
        assert!(query.contains("X-Amz-Signature="));
        assert!(query.contains("X-Amz-Expires=3600"));
        Ok(())
    }
}
