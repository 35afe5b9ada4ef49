//! HMAC-SHA256 and hashing primitives used by SigV4.

use std::fmt;

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex SHA-256 of the empty string.
///
/// Appears verbatim in every chunk string-to-sign.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compute HMAC-SHA256 of `data` under `key`.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Compute the SHA-256 of `data` and return it hex-encoded.
///
/// # Examples
///
/// ```
/// use s3gate_auth::crypto::{EMPTY_SHA256, sha256_hex};
///
/// assert_eq!(sha256_hex(b""), EMPTY_SHA256);
/// ```
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare two byte strings without short-circuiting on the first difference.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// A derived SigV4 signing key.
///
/// The bytes are never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey([u8; 32]);

impl SigningKey {
    /// Sign `data` and return the hex-encoded signature.
    #[must_use]
    pub fn sign(&self, data: &str) -> String {
        hex::encode(hmac_sha256(&self.0, data.as_bytes()))
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Derive the SigV4 signing key for S3.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, "s3")
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str) -> SigningKey {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, b"s3");
    SigningKey(hmac_sha256(&date_region_service_key, b"aws4_request"))
}
