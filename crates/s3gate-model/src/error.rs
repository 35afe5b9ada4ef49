//! S3 error codes and the client-facing [`S3Error`].
//!
//! Every error condition the HTTP layer can report maps to one [`S3ErrorCode`],
//! which fixes its HTTP status and default message. Errors that are not one of
//! the defined kinds are wrapped with [`S3Error::internal`], which keeps the
//! original error for server-side logging and exposes only a generic message.

use std::fmt;

/// S3 error codes understood by s3gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// AccessDenied error.
    AccessDenied,
    /// AuthorizationHeaderMalformed error.
    AuthorizationHeaderMalformed,
    /// BadDigest error.
    BadDigest,
    /// BucketAlreadyExists error.
    BucketAlreadyExists,
    /// BucketAlreadyOwnedByYou error.
    BucketAlreadyOwnedByYou,
    /// BucketNotEmpty error.
    BucketNotEmpty,
    /// EntityTooLarge error.
    EntityTooLarge,
    /// EntityTooSmall error.
    EntityTooSmall,
    /// IllegalVersioningConfigurationException error.
    IllegalVersioningConfigurationException,
    /// InternalError error.
    InternalError,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidBucketName error.
    InvalidBucketName,
    /// InvalidDigest error.
    InvalidDigest,
    /// InvalidPart error.
    InvalidPart,
    /// InvalidPartOrder error.
    InvalidPartOrder,
    /// InvalidRequest error.
    InvalidRequest,
    /// InvalidURI error.
    InvalidURI,
    /// MalformedXML error.
    MalformedXML,
    /// MethodNotAllowed error.
    MethodNotAllowed,
    /// MissingContentLength error.
    MissingContentLength,
    /// NoSuchBucket error.
    NoSuchBucket,
    /// NoSuchKey error.
    NoSuchKey,
    /// NoSuchUpload error.
    NoSuchUpload,
    /// NoSuchVersion error.
    NoSuchVersion,
    /// NotImplemented error.
    NotImplemented,
    /// SignatureDoesNotMatch error.
    SignatureDoesNotMatch,
    /// XAmzContentSHA256Mismatch error.
    XAmzContentSHA256Mismatch,
}

impl S3ErrorCode {
    /// Returns the error code as it appears in `<Code>`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::AuthorizationHeaderMalformed => "AuthorizationHeaderMalformed",
            Self::BadDigest => "BadDigest",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::EntityTooLarge => "EntityTooLarge",
            Self::EntityTooSmall => "EntityTooSmall",
            Self::IllegalVersioningConfigurationException => {
                "IllegalVersioningConfigurationException"
            }
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidDigest => "InvalidDigest",
            Self::InvalidPart => "InvalidPart",
            Self::InvalidPartOrder => "InvalidPartOrder",
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidURI => "InvalidURI",
            Self::MalformedXML => "MalformedXML",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::MissingContentLength => "MissingContentLength",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::NoSuchVersion => "NoSuchVersion",
            Self::NotImplemented => "NotImplemented",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::XAmzContentSHA256Mismatch => "XAmzContentSHA256Mismatch",
        }
    }

    /// Returns the HTTP status code this error is reported with.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::AuthorizationHeaderMalformed
            | Self::BadDigest
            | Self::EntityTooLarge
            | Self::EntityTooSmall
            | Self::IllegalVersioningConfigurationException
            | Self::InvalidArgument
            | Self::InvalidBucketName
            | Self::InvalidDigest
            | Self::InvalidPart
            | Self::InvalidPartOrder
            | Self::InvalidRequest
            | Self::InvalidURI
            | Self::MalformedXML
            | Self::XAmzContentSHA256Mismatch => http::StatusCode::BAD_REQUEST,
            Self::AccessDenied | Self::SignatureDoesNotMatch => http::StatusCode::FORBIDDEN,
            Self::NoSuchBucket | Self::NoSuchKey | Self::NoSuchUpload | Self::NoSuchVersion => {
                http::StatusCode::NOT_FOUND
            }
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::BucketAlreadyExists | Self::BucketAlreadyOwnedByYou | Self::BucketNotEmpty => {
                http::StatusCode::CONFLICT
            }
            Self::MissingContentLength => http::StatusCode::LENGTH_REQUIRED,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => http::StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::AuthorizationHeaderMalformed => {
                "The authorization header you provided is invalid."
            }
            Self::BadDigest => "The Content-MD5 you specified did not match what we received.",
            Self::BucketAlreadyExists => {
                "The requested bucket name is not available. The bucket namespace is shared by \
                 all users of the system. Please select a different name and try again."
            }
            Self::BucketAlreadyOwnedByYou => {
                "The bucket you tried to create already exists, and you own it."
            }
            Self::BucketNotEmpty => "The bucket you tried to delete is not empty.",
            Self::EntityTooLarge => "Your proposed upload exceeds the maximum allowed object size.",
            Self::EntityTooSmall => {
                "Your proposed upload is smaller than the minimum allowed object size."
            }
            Self::IllegalVersioningConfigurationException => {
                "The versioning configuration specified in the request is invalid."
            }
            Self::InternalError => "We encountered an internal error. Please try again.",
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidBucketName => "The specified bucket is not valid.",
            Self::InvalidDigest => "The Content-MD5 you specified is not valid.",
            Self::InvalidPart => {
                "One or more of the specified parts could not be found. The part might not have \
                 been uploaded, or the specified entity tag might not have matched the part's \
                 entity tag."
            }
            Self::InvalidPartOrder => {
                "The list of parts was not in ascending order. The parts list must be specified \
                 in order by part number."
            }
            Self::InvalidRequest => "Invalid Request",
            Self::InvalidURI => "Couldn't parse the specified URI.",
            Self::MalformedXML => {
                "The XML you provided was not well-formed or did not validate against our \
                 published schema."
            }
            Self::MethodNotAllowed => "The specified method is not allowed against this resource.",
            Self::MissingContentLength => "You must provide the Content-Length HTTP header.",
            Self::NoSuchBucket => "The specified bucket does not exist.",
            Self::NoSuchKey => "The specified key does not exist.",
            Self::NoSuchUpload => {
                "The specified multipart upload does not exist. The upload ID might be invalid, \
                 or the multipart upload might have been aborted or completed."
            }
            Self::NoSuchVersion => {
                "Indicates that the version ID specified in the request does not match an \
                 existing version."
            }
            Self::NotImplemented => {
                "A header you provided implies functionality that is not implemented."
            }
            Self::SignatureDoesNotMatch => {
                "The request signature we calculated does not match the signature you provided. \
                 Check your key and signing method."
            }
            Self::XAmzContentSHA256Mismatch => {
                "The provided 'x-amz-content-sha256' header does not match what was computed."
            }
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 error response.
///
/// `resource` and `request_id` are usually filled in by the HTTP layer just
/// before rendering, from the request path and the per-request ID.
#[derive(Debug)]
pub struct S3Error {
    /// The error code.
    pub code: S3ErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource that caused the error.
    pub resource: Option<String>,
    /// The request ID.
    pub request_id: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any. Never sent to the client.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S3Error({}): {}", self.code, self.message)
    }
}

impl std::error::Error for S3Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl S3Error {
    /// Create a new S3Error from an error code.
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create a new S3Error with a custom message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
            request_id: None,
            source: None,
        }
    }

    /// Wrap an unexpected error as `InternalError`.
    ///
    /// The client only sees the generic message; `source` keeps the details.
    #[must_use]
    pub fn internal(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(S3ErrorCode::InternalError)
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether this is a wrapped unexpected failure.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.code == S3ErrorCode::InternalError
    }

    /// Create a NoSuchBucket error.
    #[must_use]
    pub fn no_such_bucket() -> Self {
        Self::new(S3ErrorCode::NoSuchBucket)
    }

    /// Create a NoSuchKey error.
    #[must_use]
    pub fn no_such_key() -> Self {
        Self::new(S3ErrorCode::NoSuchKey)
    }

    /// Create a NoSuchUpload error.
    #[must_use]
    pub fn no_such_upload() -> Self {
        Self::new(S3ErrorCode::NoSuchUpload)
    }

    /// Create a NoSuchVersion error.
    #[must_use]
    pub fn no_such_version() -> Self {
        Self::new(S3ErrorCode::NoSuchVersion)
    }

    /// Create a BucketAlreadyExists error.
    #[must_use]
    pub fn bucket_already_exists() -> Self {
        Self::new(S3ErrorCode::BucketAlreadyExists)
    }

    /// Create a BucketAlreadyOwnedByYou error.
    #[must_use]
    pub fn bucket_already_owned_by_you() -> Self {
        Self::new(S3ErrorCode::BucketAlreadyOwnedByYou)
    }

    /// Create a BucketNotEmpty error.
    #[must_use]
    pub fn bucket_not_empty() -> Self {
        Self::new(S3ErrorCode::BucketNotEmpty)
    }

    /// Create an AccessDenied error.
    #[must_use]
    pub fn access_denied() -> Self {
        Self::new(S3ErrorCode::AccessDenied)
    }

    /// Create an AuthorizationHeaderMalformed error.
    #[must_use]
    pub fn authorization_header_malformed() -> Self {
        Self::new(S3ErrorCode::AuthorizationHeaderMalformed)
    }

    /// Create an InvalidArgument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InvalidArgument, message)
    }

    /// Create an InvalidBucketName error.
    #[must_use]
    pub fn invalid_bucket_name() -> Self {
        Self::new(S3ErrorCode::InvalidBucketName)
    }

    /// Create an InvalidURI error.
    #[must_use]
    pub fn invalid_uri() -> Self {
        Self::new(S3ErrorCode::InvalidURI)
    }

    /// Create an InvalidDigest error.
    #[must_use]
    pub fn invalid_digest() -> Self {
        Self::new(S3ErrorCode::InvalidDigest)
    }

    /// Create a BadDigest error.
    #[must_use]
    pub fn bad_digest() -> Self {
        Self::new(S3ErrorCode::BadDigest)
    }

    /// Create an InvalidPart error.
    #[must_use]
    pub fn invalid_part() -> Self {
        Self::new(S3ErrorCode::InvalidPart)
    }

    /// Create an InvalidPartOrder error.
    #[must_use]
    pub fn invalid_part_order() -> Self {
        Self::new(S3ErrorCode::InvalidPartOrder)
    }

    /// Create an EntityTooSmall error.
    #[must_use]
    pub fn entity_too_small() -> Self {
        Self::new(S3ErrorCode::EntityTooSmall)
    }

    /// Create a MalformedXML error.
    #[must_use]
    pub fn malformed_xml() -> Self {
        Self::new(S3ErrorCode::MalformedXML)
    }

    /// Create an IllegalVersioningConfigurationException error.
    #[must_use]
    pub fn illegal_versioning_configuration() -> Self {
        Self::new(S3ErrorCode::IllegalVersioningConfigurationException)
    }

    /// Create a MethodNotAllowed error.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(S3ErrorCode::MethodNotAllowed)
    }

    /// Create a MissingContentLength error.
    #[must_use]
    pub fn missing_content_length() -> Self {
        Self::new(S3ErrorCode::MissingContentLength)
    }

    /// Create a NotImplemented error.
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::new(S3ErrorCode::NotImplemented)
    }

    /// Create a SignatureDoesNotMatch error.
    #[must_use]
    pub fn signature_does_not_match() -> Self {
        Self::new(S3ErrorCode::SignatureDoesNotMatch)
    }

    /// Create an XAmzContentSHA256Mismatch error.
    #[must_use]
    pub fn content_sha256_mismatch() -> Self {
        Self::new(S3ErrorCode::XAmzContentSHA256Mismatch)
    }
}

impl From<std::io::Error> for S3Error {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

/// Create an S3Error from an error code.
///
/// # Examples
///
/// ```
/// use s3gate_model::s3_error;
/// use s3gate_model::error::S3ErrorCode;
///
/// let err = s3_error!(NoSuchBucket);
/// assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
///
/// let err = s3_error!(InvalidArgument, "max-keys must be between 0 and 1000");
/// assert_eq!(err.message, "max-keys must be between 0 and 1000");
/// ```
#[macro_export]
macro_rules! s3_error {
    ($code:ident) => {
        $crate::error::S3Error::new($crate::error::S3ErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::S3Error::with_message($crate::error::S3ErrorCode::$code, $msg)
    };
}
