//! Error types for SigV4 authentication and chunked-body decoding.

/// Errors that can occur while authenticating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header does not follow the SigV4 grammar.
    #[error("malformed SigV4 authorization header")]
    MalformedHeader,

    /// The computed signature does not match the provided signature.
    #[error("signature does not match")]
    SignatureDoesNotMatch,

    /// The request was rejected by the auth collaborator.
    #[error("access denied")]
    AccessDenied,

    /// The auth collaborator failed.
    #[error("credential lookup failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
    /// Wrap an arbitrary collaborator failure.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Errors that can occur while decoding a chunk-signed body.
///
/// Every variant is terminal: the decoder reports the same error for every
/// call after the first failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// A chunk header line does not match `<hex-size>;chunk-signature=<hex>`.
    #[error("invalid chunk header")]
    InvalidHeader,

    /// A chunk header line exceeds the maximum length.
    #[error("chunk header exceeds {0} bytes")]
    HeaderTooLong(usize),

    /// A chunk declares more bytes than allowed.
    #[error("chunk of {size} bytes exceeds limit of {limit}")]
    ChunkTooLarge {
        /// The declared chunk size.
        size: u64,
        /// The configured limit.
        limit: usize,
    },

    /// A chunk payload is not followed by CRLF.
    #[error("invalid chunk trailer")]
    InvalidTrailer,

    /// A chunk signature does not match the signature chain.
    #[error("chunk signature does not match")]
    SignatureMismatch,

    /// The body ended before the terminating zero-length chunk.
    #[error("chunked body ended before the final chunk")]
    Truncated,
}
