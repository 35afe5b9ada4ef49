//! AWS Signature Version 4 verification.
//!
//! The flow for a request signed in the `Authorization` header:
//!
//! 1. Parse the header against the SigV4 grammar.
//! 2. Sort the signed header names.
//! 3. Look up the secret key through the [`Auth`] collaborator. An unknown key
//!    or a failed lookup continues with an empty secret, so the work done does
//!    not depend on whether the access key exists.
//! 4. Rebuild the canonical request and the string to sign.
//! 5. Derive the signing key and compare signatures in constant time.
//!
//! The main entry point is [`Verifier::verify`].

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::canonical::{build_canonical_request, canonical_header_value, parse_query};
use crate::credentials::Auth;
use crate::crypto::{SigningKey, constant_time_eq, derive_signing_key, sha256_hex};
use crate::error::AuthError;

/// The signing algorithm accepted in the `Authorization` header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

static AUTHORIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^AWS4-HMAC-SHA256 Credential=([^/]+)/([^/]+)/([^/]+)/s3/aws4_request,\s*SignedHeaders=([^,]+),\s*Signature=(.+)$",
    )
    .expect("AUTHORIZATION_RE")
});

/// Parsed components of a SigV4 `Authorization` header.
///
/// ```text
/// AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
///   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    /// The access key ID.
    pub access_key: String,
    /// The date of the credential scope (YYYYMMDD).
    pub date: String,
    /// The region of the credential scope.
    pub region: String,
    /// Signed header names, sorted.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse a SigV4 `Authorization` header value.
///
/// Signed header names are returned sorted, since their order feeds the
/// canonical request.
///
/// # Errors
///
/// Returns [`AuthError::MalformedHeader`] if the value does not follow the
/// grammar.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuthorization, AuthError> {
    let caps = AUTHORIZATION_RE
        .captures(header)
        .ok_or(AuthError::MalformedHeader)?;

    let mut signed_headers: Vec<String> = caps[4].split(';').map(ToOwned::to_owned).collect();
    signed_headers.sort();

    Ok(ParsedAuthorization {
        access_key: caps[1].to_owned(),
        date: caps[2].to_owned(),
        region: caps[3].to_owned(),
        signed_headers,
        signature: caps[5].trim_end().to_owned(),
    })
}

/// Build the credential scope `date/region/s3/aws4_request`.
#[must_use]
pub fn credential_scope(date: &str, region: &str) -> String {
    format!("{date}/{region}/s3/aws4_request")
}

/// Build the SigV4 string to sign.
///
/// # Examples
///
/// ```
/// use s3gate_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// What a verified request hands on to the chunked-body decoder.
#[derive(Debug, Clone)]
pub struct SigningContext {
    /// The derived signing key.
    pub signing_key: SigningKey,
    /// The request signature, which seeds the chunk signature chain.
    pub seed_signature: String,
    /// The `x-amz-date` timestamp.
    pub timestamp: String,
    /// The date of the credential scope.
    pub date: String,
    /// The region of the credential scope.
    pub region: String,
}

impl SigningContext {
    /// The credential scope of this request.
    #[must_use]
    pub fn scope(&self) -> String {
        credential_scope(&self.date, &self.region)
    }
}

/// The principal of a successfully verified request.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    /// The access key that signed the request.
    pub access_key: String,
    /// The region of the credential scope.
    pub region: String,
    /// Signing material for chunk-signed bodies.
    pub signing: SigningContext,
}

/// Verifies SigV4 `Authorization` headers against an [`Auth`] collaborator.
#[derive(Clone)]
pub struct Verifier {
    auth: Arc<dyn Auth>,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}

impl Verifier {
    /// Create a verifier that resolves secret keys through `auth`.
    pub fn new(auth: Arc<dyn Auth>) -> Self {
        Self { auth }
    }

    /// Verify the SigV4 signature of a request.
    ///
    /// The full signature computation runs whether or not the access key is
    /// known.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedHeader`] if the `Authorization` header is
    ///   missing or does not follow the grammar. No key lookup happens.
    /// - [`AuthError::SignatureDoesNotMatch`] otherwise.
    pub async fn verify(
        &self,
        parts: &http::request::Parts,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MalformedHeader)?;
        let parsed = parse_authorization_header(header)?;

        let secret_key = match self
            .auth
            .secret_key(parts, &parsed.access_key, &parsed.region)
            .await
        {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                debug!(access_key = %parsed.access_key, "unknown access key");
                String::new()
            }
            Err(e) => {
                warn!(access_key = %parsed.access_key, error = %e, "secret key lookup failed");
                String::new()
            }
        };

        let timestamp = header_text(parts, "x-amz-date");
        let payload_hash = header_text(parts, "x-amz-content-sha256");

        let headers: Vec<(&str, String)> = parsed
            .signed_headers
            .iter()
            .map(|name| (name.as_str(), signed_header_value(parts, name)))
            .collect();
        let query = parse_query(parts.uri.query().unwrap_or_default());

        let canonical_request = build_canonical_request(
            parts.method.as_str(),
            parts.uri.path(),
            &query,
            &headers,
            &payload_hash,
        );
        debug!(canonical_request, "built canonical request");

        let scope = credential_scope(&parsed.date, &parsed.region);
        let string_to_sign =
            build_string_to_sign(&timestamp, &scope, &sha256_hex(canonical_request.as_bytes()));
        debug!(string_to_sign, "built string to sign");

        let signing_key = derive_signing_key(&secret_key, &parsed.date, &parsed.region);
        let expected = signing_key.sign(&string_to_sign);

        if !constant_time_eq(expected.as_bytes(), parsed.signature.as_bytes()) {
            debug!(
                access_key = %parsed.access_key,
                provided = %parsed.signature,
                "signature mismatch"
            );
            return Err(AuthError::SignatureDoesNotMatch);
        }

        debug!(access_key = %parsed.access_key, region = %parsed.region, "signature verified");
        Ok(AuthenticatedIdentity {
            access_key: parsed.access_key,
            region: parsed.region.clone(),
            signing: SigningContext {
                signing_key,
                seed_signature: parsed.signature,
                timestamp,
                date: parsed.date,
                region: parsed.region,
            },
        })
    }
}

/// A single header as text, empty when absent.
fn header_text(parts: &http::request::Parts, name: &str) -> String {
    parts
        .headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// The canonical value of a signed header.
///
/// `host` falls back to the URI authority when the header is absent, as
/// with HTTP/2. A missing header contributes an empty value.
fn signed_header_value(parts: &http::request::Parts, name: &str) -> String {
    let values: Vec<String> = parts
        .headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();

    if values.is_empty() && name.eq_ignore_ascii_case("host") {
        return parts
            .uri
            .authority()
            .map(|a| a.as_str().to_owned())
            .unwrap_or_default();
    }

    canonical_header_value(values.iter().map(String::as_str))
}
