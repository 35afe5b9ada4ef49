//! Request and response bodies.
//!
//! [`RequestBody`] is what controllers read uploads from. It layers, in order:
//!
//! 1. chunk-signature verification when `x-amz-content-sha256` announces a
//!    streaming payload;
//! 2. a `Content-MD5` check;
//! 3. an `x-amz-content-sha256` check when the header carries a concrete hash.
//!
//! Digests are computed while streaming and compared at end of stream, so a
//! mismatch fails the final read. Every failure is also recorded in a shared
//! [`BodyProbe`], which lets the handler report it even if the controller
//! swallowed the I/O error.
//!
//! [`S3ResponseBody`] is the response body type: buffered, streaming, or empty.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use http_body_util::{BodyDataStream, Full};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use sha2::Sha256;
use tokio::io::{AsyncRead, ReadBuf};

use s3gate_auth::{ChunkError, ChunkedStream, STREAMING_PAYLOAD, SigningContext};
use s3gate_model::error::{S3Error, S3ErrorCode};

/// Why a request body was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    /// The chunk-signed framing or signature chain is broken.
    #[error("chunked body rejected: {0}")]
    Chunk(#[from] ChunkError),

    /// The body does not match `Content-MD5`.
    #[error("body does not match Content-MD5")]
    BadDigest,

    /// The body does not match `x-amz-content-sha256`.
    #[error("body does not match x-amz-content-sha256")]
    ContentSha256Mismatch,
}

impl BodyError {
    fn to_io(&self) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, self.clone())
    }
}

impl From<BodyError> for S3Error {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Chunk(chunk) => S3Error::signature_does_not_match().with_source(chunk),
            BodyError::BadDigest => S3Error::bad_digest(),
            BodyError::ContentSha256Mismatch => S3Error::content_sha256_mismatch(),
        }
    }
}

/// Records the first failure of a [`RequestBody`].
///
/// Cloned handles share the same slot.
#[derive(Debug, Clone, Default)]
pub struct BodyProbe {
    failure: Arc<Mutex<Option<BodyError>>>,
}

impl BodyProbe {
    /// Record `err` unless a failure is already recorded.
    pub fn record(&self, err: BodyError) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// The recorded failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<BodyError> {
        self.failure.lock().clone()
    }

    /// Let a recorded body failure take precedence over a controller outcome.
    ///
    /// # Errors
    ///
    /// Returns the body failure as an [`S3Error`], or `result`'s own error.
    pub fn settle<T>(&self, result: Result<T, S3Error>) -> Result<T, S3Error> {
        match self.failure() {
            Some(err) => Err(err.into()),
            None => result,
        }
    }
}

/// The body of an inbound request.
///
/// Implements both [`AsyncRead`] and [`Stream`]. Mixing the two on one body
/// is allowed; bytes buffered by a partial read are yielded first.
pub struct RequestBody {
    inner: BoxStream<'static, io::Result<Bytes>>,
    md5: Option<(Md5, [u8; 16])>,
    sha256: Option<(Sha256, String)>,
    probe: BodyProbe,
    pending: Bytes,
    done: bool,
    failure: Option<BodyError>,
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBody")
            .field("checks_md5", &self.md5.is_some())
            .field("checks_sha256", &self.sha256.is_some())
            .field("done", &self.done)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl RequestBody {
    /// Wrap an HTTP body, configuring checks from the request headers.
    ///
    /// `signing` is the signing context of the verified request, required for
    /// chunk-signed bodies.
    ///
    /// # Errors
    ///
    /// - `InvalidDigest` if `Content-MD5` is not base64 of 16 bytes.
    /// - `SignatureDoesNotMatch` for a chunk-signed body without `signing`.
    pub fn new<B>(
        body: B,
        headers: &http::HeaderMap,
        signing: Option<&SigningContext>,
    ) -> Result<Self, S3Error>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let md5 = parse_content_md5(headers)?.map(|expected| (Md5::new(), expected));

        let content_sha256 = headers
            .get("x-amz-content-sha256")
            .and_then(|v| v.to_str().ok());
        let sha256 = content_sha256
            .filter(|v| v.len() == 64 && v.bytes().all(|b| b.is_ascii_hexdigit()))
            .map(|v| (Sha256::new(), v.to_ascii_lowercase()));

        let data = BodyDataStream::new(body).map_err(io::Error::other);
        let inner = if content_sha256 == Some(STREAMING_PAYLOAD) {
            let Some(signing) = signing else {
                return Err(S3Error::with_message(
                    S3ErrorCode::SignatureDoesNotMatch,
                    "Chunk-signed payloads require a SigV4 signed request.",
                ));
            };
            ChunkedStream::new(data, signing).boxed()
        } else {
            data.boxed()
        };

        Ok(Self::from_parts(inner, md5, sha256))
    }

    /// A body over fixed bytes with no checks.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self::from_parts(futures::stream::once(async move { Ok(data) }).boxed(), None, None)
    }

    fn from_parts(
        inner: BoxStream<'static, io::Result<Bytes>>,
        md5: Option<(Md5, [u8; 16])>,
        sha256: Option<(Sha256, String)>,
    ) -> Self {
        Self {
            inner,
            md5,
            sha256,
            probe: BodyProbe::default(),
            pending: Bytes::new(),
            done: false,
            failure: None,
        }
    }

    /// A handle on this body's failure slot.
    #[must_use]
    pub fn probe(&self) -> BodyProbe {
        self.probe.clone()
    }

    /// Read the whole body, failing once it exceeds `limit` bytes.
    ///
    /// # Errors
    ///
    /// `EntityTooLarge` past the limit, the recorded body failure, or
    /// `InternalError` for transport errors.
    pub async fn collect_limited(&mut self, limit: usize) -> Result<Bytes, S3Error> {
        let mut buf = BytesMut::new();
        while let Some(item) = self.next().await {
            match item {
                Ok(bytes) => {
                    if buf.len() + bytes.len() > limit {
                        return Err(S3Error::with_message(
                            S3ErrorCode::EntityTooLarge,
                            format!("Request body exceeds {limit} bytes."),
                        ));
                    }
                    buf.extend_from_slice(&bytes);
                }
                Err(e) => return Err(self.error_for(e)),
            }
        }
        Ok(buf.freeze())
    }

    /// Consume the rest of the body so that end-of-stream checks run.
    ///
    /// # Errors
    ///
    /// The recorded body failure, or `InternalError` for transport errors.
    pub async fn drain(&mut self) -> Result<(), S3Error> {
        while let Some(item) = self.next().await {
            if let Err(e) = item {
                return Err(self.error_for(e));
            }
        }
        Ok(())
    }

    fn error_for(&self, err: io::Error) -> S3Error {
        match self.probe.failure() {
            Some(failure) => failure.into(),
            None => S3Error::internal(err),
        }
    }

    fn fail(&mut self, err: BodyError) -> io::Error {
        self.probe.record(err.clone());
        let io_err = err.to_io();
        self.failure = Some(err);
        io_err
    }

    fn check_digests(&mut self) -> Result<(), BodyError> {
        if let Some((hasher, expected)) = self.md5.take() {
            if hasher.finalize()[..] != expected[..] {
                return Err(BodyError::BadDigest);
            }
        }
        if let Some((hasher, expected)) = self.sha256.take() {
            if hex::encode(hasher.finalize()) != expected {
                return Err(BodyError::ContentSha256Mismatch);
            }
        }
        Ok(())
    }

    fn poll_data(&mut self, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        if let Some(err) = &self.failure {
            return Poll::Ready(Some(Err(err.to_io())));
        }
        if self.done {
            return Poll::Ready(None);
        }

        match ready!(self.inner.poll_next_unpin(cx)) {
            Some(Ok(bytes)) => {
                if let Some((hasher, _)) = &mut self.md5 {
                    hasher.update(&bytes);
                }
                if let Some((hasher, _)) = &mut self.sha256 {
                    hasher.update(&bytes);
                }
                Poll::Ready(Some(Ok(bytes)))
            }
            Some(Err(e)) => match ChunkError::from_io(&e) {
                Some(chunk) => {
                    let chunk = chunk.clone();
                    Poll::Ready(Some(Err(self.fail(chunk.into()))))
                }
                None => Poll::Ready(Some(Err(e))),
            },
            None => match self.check_digests() {
                Ok(()) => {
                    self.done = true;
                    Poll::Ready(None)
                }
                Err(err) => Poll::Ready(Some(Err(self.fail(err)))),
            },
        }
    }
}

impl Stream for RequestBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if !this.pending.is_empty() {
            return Poll::Ready(Some(Ok(std::mem::take(&mut this.pending))));
        }
        this.poll_data(cx)
    }
}

impl AsyncRead for RequestBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let n = buf.remaining().min(this.pending.len());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }
            match ready!(this.poll_data(cx)) {
                Some(Ok(bytes)) => this.pending = bytes,
                Some(Err(e)) => return Poll::Ready(Err(e)),
                None => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// Decode `Content-MD5`, if present.
fn parse_content_md5(headers: &http::HeaderMap) -> Result<Option<[u8; 16]>, S3Error> {
    let Some(value) = headers.get("content-md5") else {
        return Ok(None);
    };
    let digest = value
        .to_str()
        .ok()
        .and_then(|v| BASE64.decode(v.trim()).ok())
        .and_then(|bytes| <[u8; 16]>::try_from(bytes.as_slice()).ok())
        .ok_or_else(S3Error::invalid_digest)?;
    Ok(Some(digest))
}

/// A streamed response payload with an optional known length.
pub struct StreamingBody {
    stream: BoxStream<'static, io::Result<Bytes>>,
    length: Option<u64>,
}

impl std::fmt::Debug for StreamingBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingBody")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// S3 response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum S3ResponseBody {
    /// XML documents, error bodies, small payloads.
    Buffered(Full<Bytes>),
    /// Object content streamed from a controller.
    Streaming(StreamingBody),
    /// 204 responses and HEAD responses.
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a streaming body.
    #[must_use]
    pub fn from_stream(
        stream: impl Stream<Item = io::Result<Bytes>> + Send + 'static,
        length: Option<u64>,
    ) -> Self {
        Self::Streaming(StreamingBody {
            stream: stream.boxed(),
            length,
        })
    }
}

impl http_body::Body for S3ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(body) => body
                .stream
                .poll_next_unpin(cx)
                .map_ok(http_body::Frame::data),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(body) => body.length == Some(0),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(body) => body
                .length
                .map(http_body::SizeHint::with_exact)
                .unwrap_or_default(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
