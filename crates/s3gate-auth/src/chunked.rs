//! Chunk-signed request bodies (`STREAMING-AWS4-HMAC-SHA256-PAYLOAD`).
//!
//! A streaming body is a sequence of chunks:
//!
//! ```text
//! <hex-size>;chunk-signature=<hex-signature>\r\n
//! <payload>\r\n
//! ```
//!
//! terminated by a zero-size chunk. Each signature covers the previous one, so
//! chunks cannot be reordered, dropped, or altered without breaking the chain.
//! The request's own signature seeds the chain.
//!
//! [`ChunkDecoder`] is a sans-IO state machine. [`ChunkedStream`] drives it from
//! a byte stream, and [`decode_chunked`] from a buffered body.

use std::io;
use std::pin::Pin;
use std::sync::LazyLock;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;
use regex::Regex;
use tracing::debug;

use crate::crypto::{EMPTY_SHA256, constant_time_eq, sha256_hex};
use crate::error::ChunkError;
use crate::sigv4::SigningContext;

/// The longest chunk header line accepted, including CRLF.
pub const MAX_CHUNK_HEADER_LEN: usize = 4096;

/// The largest chunk payload accepted.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

static CHUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-fA-F]+);chunk-signature=([0-9a-fA-F]+)").expect("CHUNK_HEADER_RE")
});

/// Computes and verifies the chunk signature chain.
#[derive(Debug, Clone)]
pub struct ChunkSigner {
    signing: SigningContext,
    scope: String,
    previous: String,
}

impl ChunkSigner {
    /// Start a chain seeded with the request signature.
    #[must_use]
    pub fn new(signing: &SigningContext) -> Self {
        Self {
            scope: signing.scope(),
            previous: signing.seed_signature.clone(),
            signing: signing.clone(),
        }
    }

    /// The signature the next chunk chains from.
    #[must_use]
    pub fn previous_signature(&self) -> &str {
        &self.previous
    }

    /// Build the string to sign for `payload` following the current signature.
    #[must_use]
    pub fn string_to_sign(&self, payload: &[u8]) -> String {
        format!(
            "AWS4-HMAC-SHA256-PAYLOAD\n{}\n{}\n{}\n{EMPTY_SHA256}\n{}",
            self.signing.timestamp,
            self.scope,
            self.previous,
            sha256_hex(payload)
        )
    }

    /// Sign `payload` and advance the chain.
    pub fn next(&mut self, payload: &[u8]) -> String {
        let signature = self.signing.signing_key.sign(&self.string_to_sign(payload));
        self.previous.clone_from(&signature);
        signature
    }

    /// Verify `claimed` for `payload`, advancing the chain only on success.
    pub fn verify(&mut self, claimed: &str, payload: &[u8]) -> bool {
        let expected = self.signing.signing_key.sign(&self.string_to_sign(payload));
        if constant_time_eq(expected.as_bytes(), claimed.as_bytes()) {
            self.previous = expected;
            true
        } else {
            false
        }
    }
}

/// Where a [`ChunkDecoder`] is in the chunk grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for a `<hex-size>;chunk-signature=<hex>` line.
    AwaitingChunkHeader,
    /// Waiting for the declared number of payload bytes.
    AwaitingChunkBody,
    /// Waiting for the CRLF after the payload.
    AwaitingTrailer,
    /// The zero-size chunk has been verified. Further input is ignored.
    Exhausted,
    /// Decoding failed. Every later call reports the same error.
    Failed,
}

/// Incremental decoder for chunk-signed bodies.
///
/// Feed raw body bytes with [`feed`](Self::feed) in pieces of any size and
/// drain verified payloads with [`next_chunk`](Self::next_chunk). A payload is
/// released only after its signature has been verified.
#[derive(Debug)]
pub struct ChunkDecoder {
    signer: ChunkSigner,
    buf: BytesMut,
    state: DecoderState,
    size: usize,
    signature: String,
    payload: Bytes,
    failure: Option<ChunkError>,
}

impl ChunkDecoder {
    /// Create a decoder for a body signed under `signing`.
    #[must_use]
    pub fn new(signing: &SigningContext) -> Self {
        Self {
            signer: ChunkSigner::new(signing),
            buf: BytesMut::new(),
            state: DecoderState::AwaitingChunkHeader,
            size: 0,
            signature: String::new(),
            payload: Bytes::new(),
            failure: None,
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> DecoderState {
        if self.failure.is_some() {
            DecoderState::Failed
        } else {
            self.state
        }
    }

    /// Whether the terminating chunk has been verified.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state() == DecoderState::Exhausted
    }

    /// Append raw body bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        if !matches!(
            self.state(),
            DecoderState::Exhausted | DecoderState::Failed
        ) {
            self.buf.extend_from_slice(bytes);
        }
    }

    /// Return the next verified payload.
    ///
    /// `Ok(None)` means more input is needed, or that the body is complete
    /// when [`is_exhausted`](Self::is_exhausted) is true.
    ///
    /// # Errors
    ///
    /// Returns the [`ChunkError`] that failed the decoder, now or earlier.
    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, ChunkError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        loop {
            match self.state {
                DecoderState::AwaitingChunkHeader => {
                    let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                        if self.buf.len() > MAX_CHUNK_HEADER_LEN {
                            return Err(self.fail(ChunkError::HeaderTooLong(MAX_CHUNK_HEADER_LEN)));
                        }
                        return Ok(None);
                    };
                    if pos + 1 > MAX_CHUNK_HEADER_LEN {
                        return Err(self.fail(ChunkError::HeaderTooLong(MAX_CHUNK_HEADER_LEN)));
                    }
                    let line = self.buf.split_to(pos + 1);
                    let (size, signature) = match parse_chunk_header(&line) {
                        Ok(header) => header,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.size = size;
                    self.signature = signature;
                    self.state = DecoderState::AwaitingChunkBody;
                }
                DecoderState::AwaitingChunkBody => {
                    if self.buf.len() < self.size {
                        return Ok(None);
                    }
                    self.payload = self.buf.split_to(self.size).freeze();
                    self.state = DecoderState::AwaitingTrailer;
                }
                DecoderState::AwaitingTrailer => {
                    if self.buf.len() < 2 {
                        return Ok(None);
                    }
                    let trailer = self.buf.split_to(2);
                    if trailer.as_ref() != b"\r\n" {
                        return Err(self.fail(ChunkError::InvalidTrailer));
                    }

                    let payload = std::mem::take(&mut self.payload);
                    if !self.signer.verify(&self.signature, &payload) {
                        return Err(self.fail(ChunkError::SignatureMismatch));
                    }

                    if payload.is_empty() {
                        debug!("chunked body complete");
                        self.state = DecoderState::Exhausted;
                        self.buf.clear();
                        return Ok(None);
                    }
                    self.state = DecoderState::AwaitingChunkHeader;
                    return Ok(Some(payload));
                }
                DecoderState::Exhausted | DecoderState::Failed => return Ok(None),
            }
        }
    }

    /// Signal the end of input.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Truncated`] if the terminating chunk has not been
    /// seen, or the error that failed the decoder earlier.
    pub fn finish(&mut self) -> Result<(), ChunkError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.state == DecoderState::Exhausted {
            Ok(())
        } else {
            Err(self.fail(ChunkError::Truncated))
        }
    }

    fn fail(&mut self, err: ChunkError) -> ChunkError {
        debug!(error = %err, "chunked body rejected");
        self.buf.clear();
        self.payload = Bytes::new();
        self.failure = Some(err.clone());
        err
    }
}

/// Parse `<hex-size>;chunk-signature=<hex>` from a header line.
fn parse_chunk_header(line: &[u8]) -> Result<(usize, String), ChunkError> {
    let line = std::str::from_utf8(line).map_err(|_| ChunkError::InvalidHeader)?;
    let caps = CHUNK_HEADER_RE
        .captures(line)
        .ok_or(ChunkError::InvalidHeader)?;

    let size = u64::from_str_radix(&caps[1], 16).map_err(|_| ChunkError::InvalidHeader)?;
    let size = usize::try_from(size)
        .ok()
        .filter(|&s| s <= MAX_CHUNK_SIZE)
        .ok_or(ChunkError::ChunkTooLarge {
            size,
            limit: MAX_CHUNK_SIZE,
        })?;

    Ok((size, caps[2].to_owned()))
}

/// Decode a fully buffered chunk-signed body.
///
/// # Errors
///
/// Returns the first [`ChunkError`] encountered, including
/// [`ChunkError::Truncated`] when the terminating chunk is missing.
pub fn decode_chunked(body: &[u8], signing: &SigningContext) -> Result<Bytes, ChunkError> {
    let mut decoder = ChunkDecoder::new(signing);
    decoder.feed(body);

    let mut out = BytesMut::with_capacity(body.len());
    while let Some(chunk) = decoder.next_chunk()? {
        out.extend_from_slice(&chunk);
    }
    decoder.finish()?;
    Ok(out.freeze())
}

impl ChunkError {
    /// Recover a chunk error carried inside an [`io::Error`] produced by
    /// [`ChunkedStream`].
    #[must_use]
    pub fn from_io(err: &io::Error) -> Option<&ChunkError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<ChunkError>())
    }
}

pin_project! {
    /// Adapts a stream of raw body bytes into a stream of verified payloads.
    ///
    /// Chunk failures surface as [`io::ErrorKind::InvalidData`] errors wrapping
    /// a [`ChunkError`]; see [`ChunkError::from_io`]. After a failure the same
    /// error is returned on every poll.
    #[derive(Debug)]
    pub struct ChunkedStream<S> {
        #[pin]
        inner: S,
        decoder: ChunkDecoder,
        inner_done: bool,
    }
}

impl<S> ChunkedStream<S> {
    /// Wrap `inner`, verifying chunks against `signing`.
    pub fn new(inner: S, signing: &SigningContext) -> Self {
        Self {
            inner,
            decoder: ChunkDecoder::new(signing),
            inner_done: false,
        }
    }
}

impl<S, E> Stream for ChunkedStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match this.decoder.next_chunk() {
                Ok(Some(payload)) => return Poll::Ready(Some(Ok(payload))),
                Ok(None) if this.decoder.is_exhausted() => return Poll::Ready(None),
                Ok(None) => {}
                Err(e) => return Poll::Ready(Some(Err(invalid_data(e)))),
            }

            if *this.inner_done {
                return Poll::Ready(match this.decoder.finish() {
                    Ok(()) => None,
                    Err(e) => Some(Err(invalid_data(e))),
                });
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => this.decoder.feed(&bytes),
                Some(Err(e)) => return Poll::Ready(Some(Err(io::Error::other(e)))),
                None => *this.inner_done = true,
            }
        }
    }
}

fn invalid_data(err: ChunkError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
