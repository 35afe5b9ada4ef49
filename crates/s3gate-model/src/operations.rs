//! The S3 operations s3gate can route a request to.

/// A routed S3 operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3Operation {
    /// The ListBuckets operation.
    ListBuckets,
    /// The GetBucketLocation operation.
    GetBucketLocation,
    /// The ListObjects operation.
    ListObjects,
    /// The ListObjectVersions operation.
    ListObjectVersions,
    /// The CreateBucket operation.
    CreateBucket,
    /// The DeleteBucket operation.
    DeleteBucket,
    /// The GetBucketVersioning operation.
    GetBucketVersioning,
    /// The PutBucketVersioning operation.
    PutBucketVersioning,
    /// The DeleteObjects (multi-object delete) operation.
    DeleteObjects,
    /// The ListMultipartUploads operation.
    ListMultipartUploads,
    /// The GetObject operation, also used for HEAD.
    GetObject,
    /// The PutObject operation.
    PutObject,
    /// The DeleteObject operation.
    DeleteObject,
    /// The CreateMultipartUpload operation.
    CreateMultipartUpload,
    /// The UploadPart operation.
    UploadPart,
    /// The CompleteMultipartUpload operation.
    CompleteMultipartUpload,
    /// The AbortMultipartUpload operation.
    AbortMultipartUpload,
    /// The ListParts operation.
    ListParts,
    /// Deletes a single uploaded part of a multipart upload.
    DeletePart,
    /// A recognised sub-resource that is not supported, named by its
    /// query parameter or header.
    NotImplemented(&'static str),
}

impl S3Operation {
    /// Returns the operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListBuckets => "ListBuckets",
            Self::GetBucketLocation => "GetBucketLocation",
            Self::ListObjects => "ListObjects",
            Self::ListObjectVersions => "ListObjectVersions",
            Self::CreateBucket => "CreateBucket",
            Self::DeleteBucket => "DeleteBucket",
            Self::GetBucketVersioning => "GetBucketVersioning",
            Self::PutBucketVersioning => "PutBucketVersioning",
            Self::DeleteObjects => "DeleteObjects",
            Self::ListMultipartUploads => "ListMultipartUploads",
            Self::GetObject => "GetObject",
            Self::PutObject => "PutObject",
            Self::DeleteObject => "DeleteObject",
            Self::CreateMultipartUpload => "CreateMultipartUpload",
            Self::UploadPart => "UploadPart",
            Self::CompleteMultipartUpload => "CompleteMultipartUpload",
            Self::AbortMultipartUpload => "AbortMultipartUpload",
            Self::ListParts => "ListParts",
            Self::DeletePart => "DeletePart",
            Self::NotImplemented(_) => "NotImplemented",
        }
    }

    /// Whether this operation reads the request body as a stream of object data.
    #[must_use]
    pub fn has_object_body(&self) -> bool {
        matches!(self, Self::PutObject | Self::UploadPart)
    }
}

impl std::fmt::Display for S3Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotImplemented(feature) => write!(f, "NotImplemented({feature})"),
            other => f.write_str(other.as_str()),
        }
    }
}
