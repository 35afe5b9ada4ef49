//! Per-request context handed to handlers and controllers.

use s3gate_auth::AuthenticatedIdentity;
use s3gate_model::S3Operation;

/// Everything known about a request once it has been routed and authenticated.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique ID of this request, echoed in `x-amz-request-id` and error bodies.
    pub request_id: String,
    /// The HTTP method.
    pub method: http::Method,
    /// The raw request path.
    pub path: String,
    /// The routed operation.
    pub operation: S3Operation,
    /// The bucket, for bucket and object operations.
    pub bucket: Option<String>,
    /// The decoded object key, for object operations.
    pub key: Option<String>,
    /// Decoded query parameters in request order.
    pub query: Vec<(String, String)>,
    /// The request headers.
    pub headers: http::HeaderMap,
    /// The verified signer, or `None` for anonymous requests.
    pub identity: Option<AuthenticatedIdentity>,
}

impl RequestContext {
    /// The bucket name, or an empty string at the service root.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or_default()
    }

    /// The object key, or an empty string outside object routes.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }

    /// The first value of a query parameter.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// A query parameter's value, or an empty string if absent.
    #[must_use]
    pub fn query_or_empty(&self, name: &str) -> &str {
        self.query_value(name).unwrap_or_default()
    }

    /// A header as UTF-8 text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The authenticated access key, if any.
    #[must_use]
    pub fn access_key(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.access_key.as_str())
    }
}
