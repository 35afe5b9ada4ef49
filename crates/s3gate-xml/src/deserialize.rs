//! S3 XML deserialization: parsing request bodies.
//!
//! Unknown child elements are skipped. Text inside leaf elements is kept
//! verbatim, including surrounding whitespace, since object keys may carry it.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use s3gate_model::input::{
    CompleteMultipartUpload, CreateBucketConfiguration, Delete, VersioningConfiguration,
};
use s3gate_model::types::{CompletedPart, ObjectIdentifier, unquote_etag};

use crate::error::XmlError;

/// Trait for deserializing S3 types from XML.
///
/// The root element has already been consumed by the caller; the implementation
/// reads child elements until the matching end tag.
pub trait S3Deserialize: Sized {
    /// The expected root element name.
    const ROOT: &'static str;

    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize an S3 XML request body into a typed value.
///
/// The root element must be `T::ROOT`.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed, the root element is wrong, or
/// deserialization fails.
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().expand_empty_elements = true;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e)?;
                if name != T::ROOT {
                    return Err(XmlError::UnexpectedElement(name));
                }
                return T::deserialize_xml(&mut reader);
            }
            Event::Eof => {
                return Err(XmlError::MissingElement(T::ROOT.to_owned()));
            }
            // Declaration, comments, processing instructions, whitespace.
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn element_name(e: &BytesStart<'_>) -> Result<String, XmlError> {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_owned)
        .map_err(|err| XmlError::ParseError(err.to_string()))
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&decoded);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let name = e
                        .decode()
                        .map_err(|err| XmlError::ParseError(err.to_string()))?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                        .ok_or_else(|| XmlError::ParseError(format!("unknown entity: {name}")))?;
                    text.push_str(resolved);
                }
            }
            Event::End(_) => return Ok(text),
            Event::Start(e) => {
                return Err(XmlError::UnexpectedElement(element_name(&e)?));
            }
            Event::Eof => {
                return Err(XmlError::ParseError(
                    "unexpected EOF while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::ParseError(
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Walk the children of the current element, calling `on_child` for each
/// start tag. `on_child` must consume the child through its end tag.
fn for_each_child<F>(
    reader: &mut Reader<&[u8]>,
    context: &str,
    mut on_child: F,
) -> Result<(), XmlError>
where
    F: FnMut(&mut Reader<&[u8]>, &str) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e)?;
                on_child(reader, &name)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::ParseError(format!("unexpected EOF in {context}")));
            }
            _ => {}
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, XmlError> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(XmlError::ParseError(format!("invalid boolean: {other}"))),
    }
}

fn parse_u32(s: &str) -> Result<u32, XmlError> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| XmlError::ParseError(format!("invalid integer '{s}': {e}")))
}

// ---------------------------------------------------------------------------
// Request documents
// ---------------------------------------------------------------------------

impl S3Deserialize for ObjectIdentifier {
    const ROOT: &'static str = "Object";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut key = None;
        let mut version_id = None;

        for_each_child(reader, "Object", |r, name| {
            match name {
                "Key" => key = Some(read_text_content(r)?),
                "VersionId" => version_id = Some(read_text_content(r)?),
                _ => skip_element(r)?,
            }
            Ok(())
        })?;

        Ok(ObjectIdentifier {
            key: key.ok_or_else(|| XmlError::MissingElement("Key".to_owned()))?,
            version_id: version_id.filter(|v| !v.is_empty()),
        })
    }
}

impl S3Deserialize for Delete {
    const ROOT: &'static str = "Delete";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut objects = Vec::new();
        let mut quiet = false;

        for_each_child(reader, "Delete", |r, name| {
            match name {
                "Object" => objects.push(ObjectIdentifier::deserialize_xml(r)?),
                "Quiet" => quiet = parse_bool(&read_text_content(r)?)?,
                _ => skip_element(r)?,
            }
            Ok(())
        })?;

        Ok(Delete { objects, quiet })
    }
}

impl S3Deserialize for CompletedPart {
    const ROOT: &'static str = "Part";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut part_number = None;
        let mut etag = None;

        for_each_child(reader, "Part", |r, name| {
            match name {
                "PartNumber" => part_number = Some(parse_u32(&read_text_content(r)?)?),
                "ETag" => etag = Some(read_text_content(r)?),
                _ => skip_element(r)?,
            }
            Ok(())
        })?;

        let etag = etag.ok_or_else(|| XmlError::MissingElement("ETag".to_owned()))?;
        Ok(CompletedPart {
            part_number: part_number
                .ok_or_else(|| XmlError::MissingElement("PartNumber".to_owned()))?,
            etag: unquote_etag(etag.trim()).to_owned(),
        })
    }
}

impl S3Deserialize for CompleteMultipartUpload {
    const ROOT: &'static str = "CompleteMultipartUpload";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut parts = Vec::new();

        for_each_child(reader, "CompleteMultipartUpload", |r, name| {
            match name {
                "Part" => parts.push(CompletedPart::deserialize_xml(r)?),
                _ => skip_element(r)?,
            }
            Ok(())
        })?;

        Ok(CompleteMultipartUpload { parts })
    }
}

impl S3Deserialize for VersioningConfiguration {
    const ROOT: &'static str = "VersioningConfiguration";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut config = VersioningConfiguration::default();

        for_each_child(reader, "VersioningConfiguration", |r, name| {
            match name {
                "Status" => config.status = Some(read_text_content(r)?),
                "MfaDelete" | "MFADelete" => config.mfa_delete = Some(read_text_content(r)?),
                _ => skip_element(r)?,
            }
            Ok(())
        })?;

        Ok(config)
    }
}

impl S3Deserialize for CreateBucketConfiguration {
    const ROOT: &'static str = "CreateBucketConfiguration";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut location_constraint = None;

        for_each_child(reader, "CreateBucketConfiguration", |r, name| {
            match name {
                "LocationConstraint" => location_constraint = Some(read_text_content(r)?),
                _ => skip_element(r)?,
            }
            Ok(())
        })?;

        Ok(CreateBucketConfiguration {
            location_constraint: location_constraint.filter(|l| !l.is_empty()),
        })
    }
}
