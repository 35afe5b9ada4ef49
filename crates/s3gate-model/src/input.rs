//! Documents parsed from XML request bodies.

use serde::{Deserialize, Serialize};

use crate::types::{CompletedPart, ObjectIdentifier};

/// The `<Delete>` body of a multi-object delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    /// The objects to delete.
    pub objects: Vec<ObjectIdentifier>,
    /// Only report errors when set.
    pub quiet: bool,
}

/// The `<CompleteMultipartUpload>` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteMultipartUpload {
    /// The parts to assemble, in request order.
    pub parts: Vec<CompletedPart>,
}

/// The `<VersioningConfiguration>` body of `PutBucketVersioning`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersioningConfiguration {
    /// The raw `<Status>` value, validated by the handler.
    pub status: Option<String>,
    /// The raw `<MfaDelete>` value.
    pub mfa_delete: Option<String>,
}

/// The optional `<CreateBucketConfiguration>` body of `CreateBucket`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketConfiguration {
    /// The requested region.
    pub location_constraint: Option<String>,
}
