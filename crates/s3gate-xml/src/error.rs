//! XML error types and the `<Error>` response document.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use s3gate_model::{S3Error, S3ErrorCode};

/// Errors that can occur during S3 XML serialization or deserialization.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// The document root is not the expected element.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),

    /// An error parsing a value from XML text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

/// Request bodies that fail to parse are reported as `MalformedXML`.
impl From<XmlError> for S3Error {
    fn from(err: XmlError) -> Self {
        S3Error::new(S3ErrorCode::MalformedXML).with_source(err)
    }
}

/// Format an S3 error as XML.
///
/// S3 does not wrap errors, so the document is a flat `<Error>` element:
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>NoSuchBucket</Code>
///   <Message>The specified bucket does not exist.</Message>
///   <Resource>/mybucket</Resource>
///   <RequestId>4442587FB7D0A2F9</RequestId>
/// </Error>
/// ```
#[must_use]
pub fn error_to_xml(
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: Option<&str>,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Err(e) = write_error_xml(&mut buf, code, message, resource, request_id) {
        tracing::error!(error = %e, "failed to serialize S3 error XML");
        buf.clear();
    }
    buf
}

/// Format an [`S3Error`] as XML, including its resource and request ID.
#[must_use]
pub fn s3_error_to_xml(err: &S3Error) -> Vec<u8> {
    error_to_xml(
        err.code.as_str(),
        &err.message,
        err.resource.as_deref(),
        err.request_id.as_deref(),
    )
}

fn write_error_xml(
    buf: &mut Vec<u8>,
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: Option<&str>,
) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code")
            .write_text_content(BytesText::new(code))?;
        w.create_element("Message")
            .write_text_content(BytesText::new(message))?;
        w.create_element("Resource")
            .write_text_content(BytesText::new(resource.unwrap_or_default()))?;
        w.create_element("RequestId")
            .write_text_content(BytesText::new(request_id.unwrap_or_default()))?;
        Ok(())
    })?;

    Ok(())
}
