use crate::client::SignedClient;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::xml::{self, CompletedPart};
use bytes::{Bytes, BytesMut};
use http::{header, Method, Request};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use stevedore_core::{Error, Result};
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Smallest part size the service accepts for every part but the last.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum number of parts a single multipart upload supports.
pub const MAX_PARTS: u32 = 10_000;

/// Options for a multipart upload session.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Size every part except the final one is cut to. At least
    /// [`MIN_PART_SIZE`].
    pub part_size: usize,
    /// Retry policy applied independently to each part upload.
    pub retry: RetryPolicy,
    /// How long [`MultipartUploader::close`] waits for each outstanding
    /// part before aborting the session.
    pub part_timeout: Duration,
    /// Content type recorded on the assembled object.
    pub content_type: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: MIN_PART_SIZE,
            retry: RetryPolicy::default(),
            part_timeout: Duration::from_secs(300),
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Completing,
    Aborted,
}

/// Outcome of a completed multipart upload.
#[derive(Debug, Default)]
pub struct CompletedUpload {
    /// ETag of the assembled object, quotes stripped.
    pub e_tag: Option<String>,
    /// Location reported by the service.
    pub location: Option<String>,
    /// The parts that make up the object, in part-number order.
    pub parts: Vec<CompletedPart>,
}

/// A multipart upload session.
///
/// Bytes written through [`write`](Self::write) accumulate in a single
/// buffer; every time it reaches the configured part size a part is cut
/// off, numbered, and uploaded concurrently with its own retry budget.
/// [`close`](Self::close) flushes the remainder, waits for every part,
/// and completes the upload with a manifest ordered by part number. Any
/// part failure aborts the whole session remotely before the error is
/// returned.
///
/// Part numbers are assigned in the caller's call path, so ordering is
/// deterministic even though completion order is not. `&mut self` on
/// `write` enforces the single-writer discipline at compile time.
#[derive(Debug)]
pub struct MultipartUploader {
    client: Arc<SignedClient>,
    object_url: String,
    upload_id: String,
    part_size: usize,
    retry: RetryPolicy,
    part_timeout: Duration,
    next_part_number: u32,
    buffer: BytesMut,
    tasks: JoinSet<Result<CompletedPart>>,
    state: SessionState,
}

impl MultipartUploader {
    /// Open a new upload session for the object at `object_url`
    /// (endpoint and key combined, no query).
    ///
    /// Issues the signed initiate call; its failure is fatal and no
    /// session is created.
    pub async fn start(
        client: Arc<SignedClient>,
        object_url: &str,
        options: UploadOptions,
    ) -> Result<Self> {
        if options.part_size < MIN_PART_SIZE {
            return Err(Error::config_invalid(format!(
                "part size {} is below the minimum of {MIN_PART_SIZE} bytes",
                options.part_size
            )));
        }

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("{object_url}?uploads"));
        if let Some(content_type) = &options.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let req = builder.body(Bytes::new())?;

        let resp = client.execute_checked(req).await?;
        let body = String::from_utf8_lossy(resp.body()).into_owned();
        let initiated = xml::parse_initiate(&body)?;
        debug!(
            "multipart upload {} opened for {object_url}",
            initiated.upload_id
        );

        Ok(Self {
            client,
            object_url: object_url.to_string(),
            upload_id: initiated.upload_id,
            part_size: options.part_size,
            retry: options.retry,
            part_timeout: options.part_timeout,
            next_part_number: 1,
            buffer: BytesMut::with_capacity(options.part_size),
            tasks: JoinSet::new(),
            state: SessionState::Open,
        })
    }

    /// The upload id assigned by the service.
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Append bytes to the upload.
    ///
    /// Every full part's worth of buffered bytes is submitted
    /// immediately; the call itself never waits for uploads to finish.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(Error::request_invalid(
                "upload session is no longer accepting writes",
            ));
        }

        self.buffer.extend_from_slice(data);
        while self.buffer.len() >= self.part_size {
            let part = self.buffer.split_to(self.part_size).freeze();
            self.submit_part(part)?;
        }
        Ok(())
    }

    /// Flush the final part, wait for every in-flight part, and complete
    /// the upload.
    ///
    /// The completion manifest lists parts in part-number order
    /// regardless of the order their uploads finished in. Any part
    /// failure or timeout aborts the session and surfaces as an
    /// `UploadAborted` error carrying the cause.
    pub async fn close(mut self) -> Result<CompletedUpload> {
        self.state = SessionState::Completing;

        // The remainder becomes the final part, exempt from the minimum
        // size. A session that never filled a single part still uploads
        // one (possibly empty) part so the service sees a manifest.
        if !self.buffer.is_empty() || self.next_part_number == 1 {
            let part = self.buffer.split_off(0).freeze();
            if let Err(err) = self.submit_part(part) {
                return self.fail(err).await;
            }
        }

        let mut parts = Vec::with_capacity(self.tasks.len());
        loop {
            // Bind the outcome first: the join future borrows the task
            // set, while the failure arms consume `self`.
            let next = timeout(self.part_timeout, self.tasks.join_next()).await;
            match next {
                Err(_) => {
                    let err = Error::transport(format!(
                        "timed out after {:?} waiting for an in-flight part",
                        self.part_timeout
                    ))
                    .set_retryable(false);
                    return self.fail(err).await;
                }
                Ok(None) => break,
                Ok(Some(Err(join_err))) => {
                    let err = Error::unexpected("part upload task failed").with_source(join_err);
                    return self.fail(err).await;
                }
                Ok(Some(Ok(Err(part_err)))) => return self.fail(part_err).await,
                Ok(Some(Ok(Ok(part)))) => parts.push(part),
            }
        }
        parts.sort_by_key(|p| p.part_number);

        let manifest = match xml::build_complete_body(&parts) {
            Ok(manifest) => manifest,
            Err(err) => return self.fail(err).await,
        };
        let req = match Request::builder()
            .method(Method::POST)
            .uri(format!("{}?uploadId={}", self.object_url, self.upload_id))
            .header(header::CONTENT_TYPE, "application/xml")
            .body(Bytes::from(manifest))
        {
            Ok(req) => req,
            Err(err) => return self.fail(err.into()).await,
        };

        let completion = self.client.execute_checked(req).await;
        match completion {
            Ok(resp) => {
                debug!("multipart upload {} completed", self.upload_id);
                // Completion succeeded by status; the body is parsed
                // best-effort for the object's ETag and location.
                let body = String::from_utf8_lossy(resp.body()).into_owned();
                let doc = xml::parse_complete_result(&body).unwrap_or_default();
                Ok(CompletedUpload {
                    e_tag: doc.e_tag.map(|t| t.trim_matches('"').to_string()),
                    location: doc.location,
                    parts,
                })
            }
            Err(err) => self.fail(err).await,
        }
    }

    /// Abort the session: cancel outstanding part uploads and delete the
    /// remote upload.
    pub async fn abort(mut self) -> Result<()> {
        self.abort_inner().await;
        Ok(())
    }

    fn submit_part(&mut self, data: Bytes) -> Result<()> {
        let part_number = self.next_part_number;
        if part_number > MAX_PARTS {
            return Err(Error::request_invalid(format!(
                "upload would exceed {MAX_PARTS} parts, use a larger part size"
            )));
        }
        self.next_part_number += 1;

        let client = self.client.clone();
        let url = format!(
            "{}?partNumber={}&uploadId={}",
            self.object_url, part_number, self.upload_id
        );
        let executor = RetryExecutor::new(self.retry.clone());
        let size = data.len();

        self.tasks.spawn(async move {
            debug!("uploading part {part_number} ({size} bytes)");
            let e_tag = executor
                .execute(
                    || {
                        let client = client.clone();
                        let url = url.clone();
                        let data = data.clone();
                        async move {
                            let req = Request::builder()
                                .method(Method::PUT)
                                .uri(url.as_str())
                                .body(data)?;
                            let resp = client.execute_checked(req).await?;
                            let e_tag = resp
                                .headers()
                                .get(header::ETAG)
                                .ok_or_else(|| {
                                    Error::unexpected("part upload response carried no ETag")
                                })?
                                .to_str()?
                                .trim_matches('"')
                                .to_string();
                            Ok(e_tag)
                        }
                    },
                    |_: &String| false,
                    |err| err.is_retryable(),
                )
                .await
                .map_err(|e| e.with_context(format!("part {part_number}")))?;

            debug!("part {part_number} uploaded");
            Ok(CompletedPart {
                e_tag,
                part_number,
            })
        });

        Ok(())
    }

    /// Abort the session and wrap the failure that caused it.
    async fn fail<T>(mut self, err: Error) -> Result<T> {
        warn!(
            "aborting multipart upload {} after failure: {err}",
            self.upload_id
        );
        self.abort_inner().await;
        Err(Error::upload_aborted(format!(
            "multipart upload {} aborted",
            self.upload_id
        ))
        .with_source(err))
    }

    /// Best-effort cleanup: cancel part tasks and issue the signed abort
    /// DELETE. Its own failure is logged, never propagated, so it cannot
    /// mask the error that triggered it.
    async fn abort_inner(&mut self) {
        self.state = SessionState::Aborted;
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}

        let req = Request::builder()
            .method(Method::DELETE)
            .uri(format!("{}?uploadId={}", self.object_url, self.upload_id))
            .body(Bytes::new());
        match req {
            Ok(req) => {
                if let Err(err) = self.client.execute_checked(req).await {
                    warn!(
                        "failed to abort multipart upload {} remotely: {err}",
                        self.upload_id
                    );
                }
            }
            Err(err) => warn!(
                "failed to build abort request for upload {}: {err}",
                self.upload_id
            ),
        }
    }
}
