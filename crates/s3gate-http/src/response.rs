//! Response construction helpers.
//!
//! Successful XML responses and `<Error>` documents both go through
//! `s3gate-xml`, so they share one serialization path.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{CONTENT_TYPE, HeaderValue};
use s3gate_model::error::S3Error;
use s3gate_model::types::quote_etag;
use s3gate_xml::{S3Serialize, s3_error_to_xml, to_xml};

use crate::body::S3ResponseBody;

/// Content type of XML documents.
pub const APPLICATION_XML: &str = "application/xml";

/// The type every handler returns.
pub type S3Response = http::Response<S3ResponseBody>;

/// Set a header if the value is present and a valid header value.
pub(crate) fn set_optional_header(
    builder: http::response::Builder,
    name: &str,
    value: Option<&str>,
) -> http::response::Builder {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        if let Ok(hv) = HeaderValue::from_str(v) {
            return builder.header(name, hv);
        }
    }
    builder
}

/// Set `ETag`, quoting the value if needed. Empty values are skipped.
pub(crate) fn set_etag(builder: http::response::Builder, etag: &str) -> http::response::Builder {
    if etag.is_empty() {
        return builder;
    }
    set_optional_header(builder, "ETag", Some(&quote_etag(etag)))
}

/// Set `x-amz-delete-marker: true` when `delete_marker` is set.
pub(crate) fn set_delete_marker(
    builder: http::response::Builder,
    delete_marker: bool,
) -> http::response::Builder {
    if delete_marker {
        builder.header("x-amz-delete-marker", "true")
    } else {
        builder
    }
}

/// Format a timestamp as an RFC 7231 HTTP date.
#[must_use]
pub fn http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Finish a builder, converting build errors to `InternalError`.
pub(crate) fn build_response(
    builder: http::response::Builder,
    body: S3ResponseBody,
) -> Result<S3Response, S3Error> {
    builder.body(body).map_err(S3Error::internal)
}

/// A response with no body.
pub(crate) fn empty_response(status: http::StatusCode) -> Result<S3Response, S3Error> {
    build_response(
        http::Response::builder().status(status),
        S3ResponseBody::empty(),
    )
}

/// Serialize `value` under `root` into a 200 XML response.
pub(crate) fn xml_response<T: S3Serialize>(root: &str, value: &T) -> Result<S3Response, S3Error> {
    xml_response_with(http::Response::builder(), root, value)
}

/// Serialize `value` under `root` into an XML response on a prepared builder.
pub(crate) fn xml_response_with<T: S3Serialize>(
    builder: http::response::Builder,
    root: &str,
    value: &T,
) -> Result<S3Response, S3Error> {
    let xml = to_xml(root, value).map_err(S3Error::internal)?;
    build_response(
        builder
            .status(http::StatusCode::OK)
            .header(CONTENT_TYPE, APPLICATION_XML),
        S3ResponseBody::from_bytes(xml),
    )
}

/// Render an error as an XML `<Error>` response.
///
/// `resource` and `request_id` should already be set on `err`.
#[must_use]
pub fn error_to_response(err: &S3Error) -> S3Response {
    let body = S3ResponseBody::from_bytes(Bytes::from(s3_error_to_xml(err)));
    let mut response = http::Response::new(body);
    *response.status_mut() = err.status_code;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_XML));
    response
}

/// Join an error with every source beneath it, for server-side logs.
pub(crate) fn source_chain(err: &S3Error) -> String {
    let mut chain = vec![err.to_string()];
    let mut current = err
        .source
        .as_deref()
        .map(|e| e as &(dyn std::error::Error + 'static));
    while let Some(e) = current {
        chain.push(e.to_string());
        current = e.source();
    }
    chain.join(": ")
}
