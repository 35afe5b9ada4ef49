//! Data types exchanged between the HTTP handlers and storage controllers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The storage class reported when a controller does not supply one.
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// A bucket or object owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// The canonical user ID.
    pub id: String,
    /// The display name.
    pub display_name: String,
}

impl Owner {
    /// Create an owner whose ID and display name are the same string.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            display_name: name,
        }
    }
}

/// A bucket as reported by `ListBuckets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// The bucket name.
    pub name: String,
    /// When the bucket was created.
    pub creation_date: DateTime<Utc>,
}

/// An object entry in a `ListObjects` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// The object key.
    pub key: String,
    /// When the object was last modified.
    pub last_modified: DateTime<Utc>,
    /// The entity tag, with or without surrounding quotes.
    pub etag: String,
    /// The object size in bytes.
    pub size: u64,
    /// The storage class. Empty means [`DEFAULT_STORAGE_CLASS`].
    pub storage_class: String,
    /// The object owner, if known.
    pub owner: Option<Owner>,
}

/// A common prefix rolled up by a delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonPrefix {
    /// The shared prefix, including the delimiter.
    pub prefix: String,
}

/// A single object version in a `ListObjectVersions` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVersion {
    /// The object key.
    pub key: String,
    /// The version ID.
    pub version_id: String,
    /// Whether this is the current version.
    pub is_latest: bool,
    /// When this version was written.
    pub last_modified: DateTime<Utc>,
    /// The entity tag, with or without surrounding quotes.
    pub etag: String,
    /// The size in bytes.
    pub size: u64,
    /// The storage class. Empty means [`DEFAULT_STORAGE_CLASS`].
    pub storage_class: String,
    /// The owner, if known.
    pub owner: Option<Owner>,
}

/// A delete marker in a `ListObjectVersions` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMarkerEntry {
    /// The object key.
    pub key: String,
    /// The version ID of the marker.
    pub version_id: String,
    /// Whether the marker is the current version.
    pub is_latest: bool,
    /// When the marker was created.
    pub last_modified: DateTime<Utc>,
    /// The owner, if known.
    pub owner: Option<Owner>,
}

/// An in-progress multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    /// The object key.
    pub key: String,
    /// The upload ID.
    pub upload_id: String,
    /// Who started the upload.
    pub initiator: Option<Owner>,
    /// Who will own the object.
    pub owner: Option<Owner>,
    /// The storage class. Empty means [`DEFAULT_STORAGE_CLASS`].
    pub storage_class: String,
    /// When the upload was started.
    pub initiated: DateTime<Utc>,
}

/// An uploaded part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// The part number, between 1 and 10000.
    pub part_number: u32,
    /// When the part was uploaded.
    pub last_modified: DateTime<Utc>,
    /// The entity tag, with or without surrounding quotes.
    pub etag: String,
    /// The part size in bytes.
    pub size: u64,
}

/// A part named in a `CompleteMultipartUpload` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    /// The part number.
    pub part_number: u32,
    /// The entity tag without surrounding quotes.
    pub etag: String,
}

/// An object named in a multi-object delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdentifier {
    /// The object key.
    pub key: String,
    /// The version to delete, if any.
    pub version_id: Option<String>,
}

/// The versioning state of a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning has never been enabled.
    #[default]
    Unversioned,
    /// Versioning is enabled.
    Enabled,
    /// Versioning was enabled and is now suspended.
    Suspended,
}

impl VersioningStatus {
    /// Returns the `<Status>` text, or `None` for an unversioned bucket.
    #[must_use]
    pub fn as_status(&self) -> Option<&'static str> {
        match self {
            Self::Unversioned => None,
            Self::Enabled => Some("Enabled"),
            Self::Suspended => Some("Suspended"),
        }
    }

    /// Parses a `<Status>` value. Only `Enabled` and `Suspended` are accepted.
    #[must_use]
    pub fn from_status(status: &str) -> Option<Self> {
        match status {
            "Enabled" => Some(Self::Enabled),
            "Suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// Returns the storage class to report, substituting the default for an empty value.
#[must_use]
pub fn storage_class_or_default(storage_class: &str) -> &str {
    if storage_class.is_empty() {
        DEFAULT_STORAGE_CLASS
    } else {
        storage_class
    }
}

/// Wrap an entity tag in double quotes unless it already is.
#[must_use]
pub fn quote_etag(etag: &str) -> String {
    if etag.len() >= 2 && etag.starts_with('"') && etag.ends_with('"') {
        etag.to_owned()
    } else {
        format!("\"{etag}\"")
    }
}

/// Strip one pair of surrounding double quotes from an entity tag.
#[must_use]
pub fn unquote_etag(etag: &str) -> &str {
    etag.strip_prefix('"')
        .and_then(|e| e.strip_suffix('"'))
        .unwrap_or(etag)
}
