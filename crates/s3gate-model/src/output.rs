//! Documents rendered as XML response bodies.

use chrono::{DateTime, Utc};

use crate::types::{
    Bucket, CommonPrefix, DeleteMarkerEntry, Object, ObjectVersion, Owner, Part, Upload,
    VersioningStatus,
};

/// `<ListAllMyBucketsResult>`.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsOutput {
    /// The owner of the buckets.
    pub owner: Option<Owner>,
    /// The buckets.
    pub buckets: Vec<Bucket>,
}

/// `<ListBucketResult>` for the V1 listing.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOutput {
    /// The bucket name.
    pub name: String,
    /// The requested prefix.
    pub prefix: String,
    /// The requested marker.
    pub marker: String,
    /// Where the next page starts, present only when truncated with a delimiter.
    pub next_marker: Option<String>,
    /// The effective page size.
    pub max_keys: u32,
    /// The requested delimiter.
    pub delimiter: Option<String>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// The objects in this page.
    pub contents: Vec<Object>,
    /// Prefixes rolled up by the delimiter.
    pub common_prefixes: Vec<CommonPrefix>,
}

/// `<ListVersionsResult>`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectVersionsOutput {
    /// The bucket name.
    pub name: String,
    /// The requested prefix.
    pub prefix: String,
    /// The requested key marker.
    pub key_marker: String,
    /// The requested version ID marker.
    pub version_id_marker: String,
    /// The key the next page starts at, when truncated.
    pub next_key_marker: Option<String>,
    /// The version ID the next page starts at, when truncated.
    pub next_version_id_marker: Option<String>,
    /// The effective page size.
    pub max_keys: u32,
    /// The requested delimiter.
    pub delimiter: Option<String>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// Object versions.
    pub versions: Vec<ObjectVersion>,
    /// Delete markers.
    pub delete_markers: Vec<DeleteMarkerEntry>,
    /// Prefixes rolled up by the delimiter.
    pub common_prefixes: Vec<CommonPrefix>,
}

/// `<LocationConstraint>`.
#[derive(Debug, Clone, Default)]
pub struct GetBucketLocationOutput {
    /// The region, `None` for the default region.
    pub location_constraint: Option<String>,
}

/// `<VersioningConfiguration>` as returned by `GetBucketVersioning`.
#[derive(Debug, Clone, Default)]
pub struct GetBucketVersioningOutput {
    /// The versioning state.
    pub status: VersioningStatus,
}

/// A successfully deleted entry in `<DeleteResult>`.
#[derive(Debug, Clone, Default)]
pub struct DeletedObject {
    /// The object key.
    pub key: String,
    /// The version that was requested.
    pub version_id: Option<String>,
    /// Whether a delete marker was involved.
    pub delete_marker: bool,
    /// The version ID of the delete marker.
    pub delete_marker_version_id: Option<String>,
}

/// A failed entry in `<DeleteResult>`.
#[derive(Debug, Clone, Default)]
pub struct DeleteError {
    /// The object key.
    pub key: String,
    /// The version that was requested.
    pub version_id: Option<String>,
    /// The S3 error code.
    pub code: String,
    /// The error message.
    pub message: String,
}

/// `<DeleteResult>`.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectsOutput {
    /// Deleted entries, omitted in quiet mode.
    pub deleted: Vec<DeletedObject>,
    /// Failed entries.
    pub errors: Vec<DeleteError>,
}

/// `<InitiateMultipartUploadResult>`.
#[derive(Debug, Clone, Default)]
pub struct CreateMultipartUploadOutput {
    /// The bucket name.
    pub bucket: String,
    /// The object key.
    pub key: String,
    /// The new upload ID.
    pub upload_id: String,
}

/// `<CompleteMultipartUploadResult>`.
#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartUploadOutput {
    /// The URL of the assembled object.
    pub location: String,
    /// The bucket name.
    pub bucket: String,
    /// The object key.
    pub key: String,
    /// The quoted entity tag.
    pub etag: String,
}

/// `<ListPartsResult>`.
#[derive(Debug, Clone, Default)]
pub struct ListPartsOutput {
    /// The bucket name.
    pub bucket: String,
    /// The object key.
    pub key: String,
    /// The upload ID.
    pub upload_id: String,
    /// Who started the upload.
    pub initiator: Option<Owner>,
    /// Who will own the object.
    pub owner: Option<Owner>,
    /// The storage class.
    pub storage_class: String,
    /// The requested part number marker.
    pub part_number_marker: u32,
    /// The part number the next page starts after, when truncated.
    pub next_part_number_marker: Option<u32>,
    /// The effective page size.
    pub max_parts: u32,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// The parts in this page.
    pub parts: Vec<Part>,
}

/// `<ListMultipartUploadsResult>`.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsOutput {
    /// The bucket name.
    pub bucket: String,
    /// The requested key marker.
    pub key_marker: String,
    /// The requested upload ID marker.
    pub upload_id_marker: String,
    /// The key of the last upload, when truncated.
    pub next_key_marker: Option<String>,
    /// The upload ID of the last upload, when truncated.
    pub next_upload_id_marker: Option<String>,
    /// The effective page size.
    pub max_uploads: u32,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// The uploads in this page.
    pub uploads: Vec<Upload>,
}

/// Format a timestamp the way S3 XML documents carry it.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
