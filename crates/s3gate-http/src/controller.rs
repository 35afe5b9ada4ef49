//! Storage controller contracts.
//!
//! The gateway never stores anything itself. Every operation is forwarded to
//! one of four controller traits, held by reference inside [`S3Gate`]. Each
//! method defaults to `NotImplemented`, so an implementation only overrides
//! what it supports.
//!
//! All traits use `#[async_trait]` so they stay object-safe behind
//! `Arc<dyn ...>`.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;

use s3gate_auth::Auth;
use s3gate_model::error::S3Error;
use s3gate_model::types::{
    Bucket, CompletedPart, DeleteMarkerEntry, Object, ObjectVersion, Owner, Part, Upload,
    VersioningStatus,
};

use crate::body::RequestBody;
use crate::config::S3GateConfig;
use crate::context::RequestContext;
use crate::service::S3GateService;

/// Result of [`ServiceController::list_buckets`].
#[derive(Debug, Clone, Default)]
pub struct ListBucketsResult {
    /// Owner of the listed buckets.
    pub owner: Owner,
    /// The buckets.
    pub buckets: Vec<Bucket>,
}

/// Parameters of [`BucketController::list_objects`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    /// Only keys starting with this prefix.
    pub prefix: String,
    /// Only keys sorting after this marker.
    pub marker: String,
    /// Group keys sharing a prefix up to this delimiter.
    pub delimiter: Option<String>,
    /// Maximum number of keys plus common prefixes to return.
    pub max_keys: u32,
}

/// Result of [`BucketController::list_objects`].
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResult {
    /// Matching objects.
    pub contents: Vec<Object>,
    /// Rolled-up prefixes when a delimiter was given.
    pub common_prefixes: Vec<String>,
    /// Whether more results are available.
    pub is_truncated: bool,
}

/// Parameters of [`BucketController::list_object_versions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectVersionsRequest {
    /// Only keys starting with this prefix.
    pub prefix: String,
    /// Resume after this key.
    pub key_marker: String,
    /// Resume after this version of `key_marker`.
    pub version_id_marker: String,
    /// Group keys sharing a prefix up to this delimiter.
    pub delimiter: Option<String>,
    /// Maximum number of entries to return.
    pub max_keys: u32,
}

/// Result of [`BucketController::list_object_versions`].
#[derive(Debug, Clone, Default)]
pub struct ListObjectVersionsResult {
    /// Object versions.
    pub versions: Vec<ObjectVersion>,
    /// Delete markers.
    pub delete_markers: Vec<DeleteMarkerEntry>,
    /// Rolled-up prefixes when a delimiter was given.
    pub common_prefixes: Vec<String>,
    /// Whether more results are available.
    pub is_truncated: bool,
    /// Key to resume from when truncated.
    pub next_key_marker: Option<String>,
    /// Version to resume from when truncated.
    pub next_version_id_marker: Option<String>,
}

/// The body of a stored object.
pub struct ObjectContent {
    /// Content length, if known up front.
    pub length: Option<u64>,
    /// The bytes.
    pub stream: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for ObjectContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectContent")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl Default for ObjectContent {
    fn default() -> Self {
        Self::from_bytes(Bytes::new())
    }
}

impl ObjectContent {
    /// Content held in memory.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let length = Some(data.len() as u64);
        Self {
            length,
            stream: futures::stream::once(async move { Ok(data) }).boxed(),
        }
    }

    /// Content produced by a stream.
    pub fn from_stream(
        stream: impl futures::Stream<Item = io::Result<Bytes>> + Send + 'static,
        length: Option<u64>,
    ) -> Self {
        Self {
            length,
            stream: stream.boxed(),
        }
    }
}

/// Result of [`ObjectController::get_object`].
#[derive(Debug, Default)]
pub struct GetObjectResult {
    /// Entity tag, quoted or not.
    pub etag: String,
    /// Version ID, if the bucket is versioned.
    pub version: Option<String>,
    /// Whether the resolved version is a delete marker.
    pub delete_marker: bool,
    /// Last modification time.
    pub mod_time: Option<DateTime<Utc>>,
    /// The object body.
    pub content: ObjectContent,
}

/// Result of [`ObjectController::put_object`].
#[derive(Debug, Clone, Default)]
pub struct PutObjectResult {
    /// Entity tag of the stored object.
    pub etag: String,
    /// Version ID assigned to the upload.
    pub version: Option<String>,
}

/// Result of [`ObjectController::delete_object`].
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectResult {
    /// Version that was deleted or created.
    pub version: Option<String>,
    /// Whether a delete marker was involved.
    pub delete_marker: bool,
}

/// Parameters of [`MultipartController::list_multipart`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMultipartRequest {
    /// Resume after this key.
    pub key_marker: String,
    /// Resume after this upload of `key_marker`.
    pub upload_id_marker: String,
    /// Maximum number of uploads to return.
    pub max_uploads: u32,
}

/// Result of [`MultipartController::list_multipart`].
#[derive(Debug, Clone, Default)]
pub struct ListMultipartResult {
    /// Whether more uploads are available.
    pub is_truncated: bool,
    /// In-progress uploads.
    pub uploads: Vec<Upload>,
}

/// Result of [`MultipartController::complete_multipart`].
#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartResult {
    /// URL of the assembled object.
    pub location: String,
    /// Entity tag of the assembled object.
    pub etag: String,
    /// Version ID of the assembled object.
    pub version: Option<String>,
}

/// Parameters of [`MultipartController::list_multipart_chunks`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListPartsRequest {
    /// Only parts numbered above this marker.
    pub part_number_marker: u32,
    /// Maximum number of parts to return.
    pub max_parts: u32,
}

/// Result of [`MultipartController::list_multipart_chunks`].
#[derive(Debug, Clone, Default)]
pub struct ListPartsResult {
    /// Who started the upload.
    pub initiator: Option<Owner>,
    /// Who will own the object.
    pub owner: Option<Owner>,
    /// Storage class; empty means `STANDARD`.
    pub storage_class: String,
    /// Whether more parts are available.
    pub is_truncated: bool,
    /// Uploaded parts.
    pub parts: Vec<Part>,
}

/// Operations on the service root.
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// List the caller's buckets.
    async fn list_buckets(&self, _ctx: &RequestContext) -> Result<ListBucketsResult, S3Error> {
        Err(S3Error::not_implemented())
    }
}

/// Operations on buckets.
#[async_trait]
pub trait BucketController: Send + Sync {
    /// The region the bucket lives in.
    async fn get_location(&self, _ctx: &RequestContext, _bucket: &str) -> Result<String, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// List objects (version 1 listing).
    async fn list_objects(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _request: ListObjectsRequest,
    ) -> Result<ListObjectsResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// List object versions and delete markers.
    async fn list_object_versions(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _request: ListObjectVersionsRequest,
    ) -> Result<ListObjectVersionsResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Create a bucket.
    async fn create_bucket(&self, _ctx: &RequestContext, _bucket: &str) -> Result<(), S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Delete an empty bucket.
    async fn delete_bucket(&self, _ctx: &RequestContext, _bucket: &str) -> Result<(), S3Error> {
        Err(S3Error::not_implemented())
    }

    /// The bucket's versioning state.
    async fn get_versioning(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
    ) -> Result<VersioningStatus, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Change the bucket's versioning state.
    async fn set_versioning(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _status: VersioningStatus,
    ) -> Result<(), S3Error> {
        Err(S3Error::not_implemented())
    }
}

/// Operations on single objects.
#[async_trait]
pub trait ObjectController: Send + Sync {
    /// Fetch an object, or a specific version of it.
    async fn get_object(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _version: Option<&str>,
    ) -> Result<GetObjectResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Store an object read from `body`.
    ///
    /// Read errors from `body` carry no S3 meaning on their own. Returning
    /// any error is enough; the handler reports the recorded body failure.
    async fn put_object(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _body: &mut RequestBody,
    ) -> Result<PutObjectResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Delete an object, or a specific version of it.
    async fn delete_object(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _version: Option<&str>,
    ) -> Result<DeleteObjectResult, S3Error> {
        Err(S3Error::not_implemented())
    }
}

/// Operations on multipart uploads.
#[async_trait]
pub trait MultipartController: Send + Sync {
    /// List in-progress uploads.
    async fn list_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _request: ListMultipartRequest,
    ) -> Result<ListMultipartResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Start an upload, returning its ID.
    async fn init_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
    ) -> Result<String, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Abandon an upload.
    async fn abort_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
    ) -> Result<(), S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Assemble the listed parts. Parts arrive in ascending order with
    /// unquoted ETags.
    async fn complete_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _parts: Vec<CompletedPart>,
    ) -> Result<CompleteMultipartResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// List uploaded parts.
    async fn list_multipart_chunks(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _request: ListPartsRequest,
    ) -> Result<ListPartsResult, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Store one part, returning its ETag.
    async fn upload_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _part_number: u32,
        _body: &mut RequestBody,
    ) -> Result<String, S3Error> {
        Err(S3Error::not_implemented())
    }

    /// Drop one uploaded part.
    async fn delete_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _part_number: u32,
    ) -> Result<(), S3Error> {
        Err(S3Error::not_implemented())
    }
}

/// A controller that implements nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedController;

impl ServiceController for UnimplementedController {}
impl BucketController for UnimplementedController {}
impl ObjectController for UnimplementedController {}
impl MultipartController for UnimplementedController {}

/// The gateway root: controllers plus the optional authenticator.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use s3gate_auth::StaticAuth;
/// use s3gate_http::config::S3GateConfig;
/// use s3gate_http::controller::S3Gate;
///
/// let auth = StaticAuth::new([("AKID".to_owned(), "secret".to_owned())]);
/// let service = S3Gate::new()
///     .with_auth(Arc::new(auth))
///     .into_service(S3GateConfig::default());
/// # let _ = service;
/// ```
#[derive(Clone)]
pub struct S3Gate {
    pub(crate) auth: Option<Arc<dyn Auth>>,
    pub(crate) service: Arc<dyn ServiceController>,
    pub(crate) bucket: Arc<dyn BucketController>,
    pub(crate) object: Arc<dyn ObjectController>,
    pub(crate) multipart: Arc<dyn MultipartController>,
}

impl std::fmt::Debug for S3Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Gate")
            .field("auth", &self.auth.as_ref().map(|_| "..."))
            .finish_non_exhaustive()
    }
}

impl Default for S3Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl S3Gate {
    /// A gateway with no authentication where every operation is
    /// `NotImplemented`.
    #[must_use]
    pub fn new() -> Self {
        let unimplemented = Arc::new(UnimplementedController);
        Self {
            auth: None,
            service: unimplemented.clone(),
            bucket: unimplemented.clone(),
            object: unimplemented.clone(),
            multipart: unimplemented,
        }
    }

    /// Require SigV4 (or `custom_auth`) on every request.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn Auth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the service controller.
    #[must_use]
    pub fn with_service_controller(mut self, controller: Arc<dyn ServiceController>) -> Self {
        self.service = controller;
        self
    }

    /// Set the bucket controller.
    #[must_use]
    pub fn with_bucket_controller(mut self, controller: Arc<dyn BucketController>) -> Self {
        self.bucket = controller;
        self
    }

    /// Set the object controller.
    #[must_use]
    pub fn with_object_controller(mut self, controller: Arc<dyn ObjectController>) -> Self {
        self.object = controller;
        self
    }

    /// Set the multipart controller.
    #[must_use]
    pub fn with_multipart_controller(mut self, controller: Arc<dyn MultipartController>) -> Self {
        self.multipart = controller;
        self
    }

    /// Whether requests are authenticated.
    #[must_use]
    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// Build the hyper service.
    #[must_use]
    pub fn into_service(self, config: S3GateConfig) -> S3GateService {
        S3GateService::new(self, config)
    }
}
