//! S3 XML serialization: rendering response documents.
//!
//! Each output type writes its child elements; [`to_xml`] adds the declaration
//! and the namespaced root element.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use s3gate_model::output::{
    CompleteMultipartUploadOutput, CreateMultipartUploadOutput, DeleteError, DeleteObjectsOutput,
    DeletedObject, GetBucketLocationOutput, GetBucketVersioningOutput, ListBucketsOutput,
    ListMultipartUploadsOutput, ListObjectVersionsOutput, ListObjectsOutput, ListPartsOutput,
    format_timestamp,
};
use s3gate_model::types::{
    Bucket, CommonPrefix, DeleteMarkerEntry, Object, ObjectVersion, Owner, Part, Upload,
    quote_etag, storage_class_or_default,
};

use crate::error::XmlError;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Trait for serializing S3 types to XML.
///
/// Implementors write their content as child elements inside the current XML context.
/// The root element name and namespace are handled by [`to_xml`].
///
/// Uses `io::Result` because `quick_xml::Writer` closures require `io::Result<()>`.
pub trait S3Serialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as a complete S3 XML document with declaration and namespace.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn write_optional_text<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<&str>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, v)?;
    }
    Ok(())
}

fn write_bool<W: Write>(writer: &mut Writer<W>, tag: &str, value: bool) -> io::Result<()> {
    write_text_element(writer, tag, if value { "true" } else { "false" })
}

fn write_number<W: Write, N: ToString>(
    writer: &mut Writer<W>,
    tag: &str,
    value: N,
) -> io::Result<()> {
    write_text_element(writer, tag, &value.to_string())
}

fn write_timestamp<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &DateTime<Utc>,
) -> io::Result<()> {
    write_text_element(writer, tag, &format_timestamp(value))
}

fn write_owner<W: Write>(writer: &mut Writer<W>, tag: &str, owner: &Owner) -> io::Result<()> {
    writer.create_element(tag).write_inner_content(|w| {
        write_text_element(w, "ID", &owner.id)?;
        write_text_element(w, "DisplayName", &owner.display_name)
    })?;
    Ok(())
}

fn write_optional_owner<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    owner: Option<&Owner>,
) -> io::Result<()> {
    if let Some(owner) = owner {
        write_owner(writer, tag, owner)?;
    }
    Ok(())
}

fn write_common_prefixes<W: Write>(
    writer: &mut Writer<W>,
    prefixes: &[CommonPrefix],
) -> io::Result<()> {
    for prefix in prefixes {
        writer
            .create_element("CommonPrefixes")
            .write_inner_content(|w| write_text_element(w, "Prefix", &prefix.prefix))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entity types
// ---------------------------------------------------------------------------

impl S3Serialize for Bucket {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_timestamp(writer, "CreationDate", &self.creation_date)
    }
}

impl S3Serialize for Object {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_text_element(writer, "ETag", &quote_etag(&self.etag))?;
        write_number(writer, "Size", self.size)?;
        write_text_element(
            writer,
            "StorageClass",
            storage_class_or_default(&self.storage_class),
        )?;
        write_optional_owner(writer, "Owner", self.owner.as_ref())
    }
}

impl S3Serialize for ObjectVersion {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "VersionId", &self.version_id)?;
        write_bool(writer, "IsLatest", self.is_latest)?;
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_text_element(writer, "ETag", &quote_etag(&self.etag))?;
        write_number(writer, "Size", self.size)?;
        write_text_element(
            writer,
            "StorageClass",
            storage_class_or_default(&self.storage_class),
        )?;
        write_optional_owner(writer, "Owner", self.owner.as_ref())
    }
}

impl S3Serialize for DeleteMarkerEntry {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "VersionId", &self.version_id)?;
        write_bool(writer, "IsLatest", self.is_latest)?;
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_optional_owner(writer, "Owner", self.owner.as_ref())
    }
}

impl S3Serialize for Upload {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "UploadId", &self.upload_id)?;
        write_optional_owner(writer, "Initiator", self.initiator.as_ref())?;
        write_optional_owner(writer, "Owner", self.owner.as_ref())?;
        write_text_element(
            writer,
            "StorageClass",
            storage_class_or_default(&self.storage_class),
        )?;
        write_timestamp(writer, "Initiated", &self.initiated)
    }
}

impl S3Serialize for Part {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_number(writer, "PartNumber", self.part_number)?;
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_text_element(writer, "ETag", &quote_etag(&self.etag))?;
        write_number(writer, "Size", self.size)
    }
}

impl S3Serialize for DeletedObject {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_optional_text(writer, "VersionId", self.version_id.as_deref())?;
        if self.delete_marker {
            write_bool(writer, "DeleteMarker", true)?;
            write_optional_text(
                writer,
                "DeleteMarkerVersionId",
                self.delete_marker_version_id.as_deref(),
            )?;
        }
        Ok(())
    }
}

impl S3Serialize for DeleteError {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_optional_text(writer, "VersionId", self.version_id.as_deref())?;
        write_text_element(writer, "Code", &self.code)?;
        write_text_element(writer, "Message", &self.message)
    }
}

fn write_children<W: Write, T: S3Serialize>(
    writer: &mut Writer<W>,
    tag: &str,
    items: &[T],
) -> io::Result<()> {
    for item in items {
        writer
            .create_element(tag)
            .write_inner_content(|w| item.serialize_xml(w))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Response documents
// ---------------------------------------------------------------------------

impl S3Serialize for ListBucketsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_optional_owner(writer, "Owner", self.owner.as_ref())?;
        writer
            .create_element("Buckets")
            .write_inner_content(|w| write_children(w, "Bucket", &self.buckets))?;
        Ok(())
    }
}

impl S3Serialize for ListObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", &self.prefix)?;
        write_text_element(writer, "Marker", &self.marker)?;
        write_optional_text(writer, "NextMarker", self.next_marker.as_deref())?;
        write_number(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_children(writer, "Contents", &self.contents)?;
        write_common_prefixes(writer, &self.common_prefixes)
    }
}

impl S3Serialize for ListObjectVersionsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", &self.prefix)?;
        write_text_element(writer, "KeyMarker", &self.key_marker)?;
        write_text_element(writer, "VersionIdMarker", &self.version_id_marker)?;
        write_optional_text(writer, "NextKeyMarker", self.next_key_marker.as_deref())?;
        write_optional_text(
            writer,
            "NextVersionIdMarker",
            self.next_version_id_marker.as_deref(),
        )?;
        write_number(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_children(writer, "Version", &self.versions)?;
        write_children(writer, "DeleteMarker", &self.delete_markers)?;
        write_common_prefixes(writer, &self.common_prefixes)
    }
}

/// Renders as text directly inside `<LocationConstraint>`.
impl S3Serialize for GetBucketLocationOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(location) = self.location_constraint.as_deref() {
            writer.write_event(Event::Text(BytesText::new(location)))?;
        }
        Ok(())
    }
}

impl S3Serialize for GetBucketVersioningOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_optional_text(writer, "Status", self.status.as_status())
    }
}

impl S3Serialize for DeleteObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_children(writer, "Deleted", &self.deleted)?;
        write_children(writer, "Error", &self.errors)
    }
}

impl S3Serialize for CreateMultipartUploadOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "UploadId", &self.upload_id)
    }
}

impl S3Serialize for CompleteMultipartUploadOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Location", &self.location)?;
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "ETag", &quote_etag(&self.etag))
    }
}

impl S3Serialize for ListPartsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "UploadId", &self.upload_id)?;
        write_optional_owner(writer, "Initiator", self.initiator.as_ref())?;
        write_optional_owner(writer, "Owner", self.owner.as_ref())?;
        write_text_element(
            writer,
            "StorageClass",
            storage_class_or_default(&self.storage_class),
        )?;
        write_number(writer, "PartNumberMarker", self.part_number_marker)?;
        if let Some(next) = self.next_part_number_marker {
            write_number(writer, "NextPartNumberMarker", next)?;
        }
        write_number(writer, "MaxParts", self.max_parts)?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_children(writer, "Part", &self.parts)
    }
}

impl S3Serialize for ListMultipartUploadsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "KeyMarker", &self.key_marker)?;
        write_text_element(writer, "UploadIdMarker", &self.upload_id_marker)?;
        write_optional_text(writer, "NextKeyMarker", self.next_key_marker.as_deref())?;
        write_optional_text(
            writer,
            "NextUploadIdMarker",
            self.next_upload_id_marker.as_deref(),
        )?;
        write_number(writer, "MaxUploads", self.max_uploads)?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_children(writer, "Upload", &self.uploads)
    }
}
