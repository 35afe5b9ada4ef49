//! Gateway configuration.
//!
//! [`S3GateConfig`] holds the settings of the HTTP layer. Controllers and the
//! optional [`Auth`](s3gate_auth::Auth) collaborator are supplied through
//! [`S3Gate`](crate::controller::S3Gate) instead.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// HTTP layer configuration.
///
/// # Examples
///
/// ```
/// use s3gate_http::config::S3GateConfig;
///
/// let config = S3GateConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:4566");
/// assert_eq!(config.max_xml_body_size, 1_048_576);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct S3GateConfig {
    /// Bind address for [`serve`](crate::server::serve) callers.
    #[builder(default = String::from("0.0.0.0:4566"))]
    pub listen: String,

    /// Value of the `Server` response header.
    #[builder(default = String::from("s3gate"))]
    pub server_name: String,

    /// Log level filter string (e.g. `"info"`, `"s3gate_http=debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Largest XML request body accepted, in bytes.
    #[builder(default = 1_048_576)]
    pub max_xml_body_size: usize,

    /// Whether multi-object delete requests must carry `Content-MD5`.
    #[builder(default = false)]
    pub require_content_md5_for_delete: bool,
}

impl Default for S3GateConfig {
    fn default() -> Self {
        Self {
            listen: String::from("0.0.0.0:4566"),
            server_name: String::from("s3gate"),
            log_level: String::from("info"),
            max_xml_body_size: 1_048_576,
            require_content_md5_for_delete: false,
        }
    }
}

impl S3GateConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3GATE_LISTEN` | `0.0.0.0:4566` |
    /// | `S3GATE_SERVER_NAME` | `s3gate` |
    /// | `LOG_LEVEL` | `info` |
    /// | `S3GATE_MAX_XML_BODY_SIZE` | `1048576` |
    /// | `S3GATE_REQUIRE_CONTENT_MD5_FOR_DELETE` | `false` |
    ///
    /// Unparseable numbers keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("S3GATE_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("S3GATE_SERVER_NAME") {
            config.server_name = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("S3GATE_MAX_XML_BODY_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.max_xml_body_size = n;
            }
        }
        if let Ok(v) = std::env::var("S3GATE_REQUIRE_CONTENT_MD5_FOR_DELETE") {
            config.require_content_md5_for_delete = parse_bool(&v);
        }

        config
    }
}

/// Accepts `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
