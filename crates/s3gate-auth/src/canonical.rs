//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Every function here is pure: identical input always yields identical output,
//! which the signature comparison depends on.

use percent_encoding::{
    AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode, utf8_percent_encode,
};

/// Characters that are percent-encoded in canonical paths and query strings.
///
/// Everything except the RFC 3986 unreserved set (`A-Z a-z 0-9 - _ . ~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn uri_encode(s: &str) -> String {
    utf8_percent_encode(s, URI_ENCODE_SET).to_string()
}

/// Build the canonical URI by re-encoding each path segment.
///
/// Segments are percent-decoded first so that already-encoded paths are not
/// encoded twice. Decoding and re-encoding work on raw bytes, so escapes that
/// are not valid UTF-8 survive unchanged. Forward slashes are preserved; an
/// empty path becomes `/`.
///
/// # Examples
///
/// ```
/// use s3gate_auth::canonical::canonical_uri;
///
/// assert_eq!(canonical_uri(""), "/");
/// assert_eq!(canonical_uri("/bucket/my file.txt"), "/bucket/my%20file.txt");
/// assert_eq!(canonical_uri("/bucket/my%20file.txt"), "/bucket/my%20file.txt");
/// ```
#[must_use]
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let bytes: Vec<u8> = percent_decode_str(segment).collect();
            percent_encode(&bytes, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a raw query string into ordered `(name, value)` pairs.
///
/// Uses form-urlencoded rules, so `+` decodes to a space. A parameter without
/// `=` yields an empty value.
#[must_use]
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Build the canonical query string from decoded parameters.
///
/// Names and values are encoded with the same set as paths (space becomes
/// `%20`), sorted by name and then by value, and joined as `name=value`
/// with `&`.
///
/// # Examples
///
/// ```
/// use s3gate_auth::canonical::{canonical_query, parse_query};
///
/// assert_eq!(canonical_query(&parse_query("b=2&a=1")), "a=1&b=2");
/// assert_eq!(canonical_query(&parse_query("acl")), "acl=");
/// ```
#[must_use]
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonicalize the values of one header.
///
/// Each value is trimmed and internal runs of whitespace are collapsed to a
/// single space; repeated headers are joined with `,`.
#[must_use]
pub fn canonical_header_value<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the full canonical request string.
///
/// `headers` holds the canonical value for each name in `signed_headers`, in
/// the same (sorted) order.
///
/// # Examples
///
/// ```
/// use s3gate_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     &[],
///     &[("host", "examplebucket.s3.amazonaws.com".to_owned())],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n\nhost:examplebucket.s3.amazonaws.com\n\nhost\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &[(String, String)],
    headers: &[(&str, String)],
    payload_hash: &str,
) -> String {
    let mut canonical = String::with_capacity(256);
    canonical.push_str(method);
    canonical.push('\n');
    canonical.push_str(&canonical_uri(path));
    canonical.push('\n');
    canonical.push_str(&canonical_query(query));
    canonical.push('\n');
    for (name, value) in headers {
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(value);
        canonical.push('\n');
    }
    canonical.push('\n');
    canonical.push_str(
        &headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";"),
    );
    canonical.push('\n');
    canonical.push_str(payload_hash);
    canonical
}
