//! The hyper `Service` tying routing, authentication and dispatch together.
//!
//! [`S3GateService`] runs every request through the same pipeline:
//!
//! 1. Assign a request ID
//! 2. Route by path shape, method and sub-resource
//! 3. Authenticate (when an [`Auth`](s3gate_auth::Auth) is configured)
//! 4. Wrap the body with chunk-signature and digest checks
//! 5. Dispatch to the operation's handler
//! 6. Render errors as XML and add the common response headers

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderValue, SERVER};
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use s3gate_auth::canonical::parse_query;
use s3gate_auth::sigv4::ALGORITHM;
use s3gate_auth::{AuthError, AuthenticatedIdentity, Verifier};
use s3gate_model::error::{S3Error, S3ErrorCode};

use crate::body::{RequestBody, S3ResponseBody};
use crate::config::S3GateConfig;
use crate::context::RequestContext;
use crate::controller::S3Gate;
use crate::handlers;
use crate::response::{S3Response, error_to_response, source_chain};
use crate::router::Router;

/// Map an authentication failure to the error the client sees.
#[must_use]
pub fn auth_error_to_s3(err: AuthError) -> S3Error {
    match err {
        AuthError::MalformedHeader => S3Error::authorization_header_malformed(),
        AuthError::SignatureDoesNotMatch => S3Error::signature_does_not_match(),
        AuthError::AccessDenied => S3Error::access_denied(),
        AuthError::Backend(source) => {
            let mut denied = S3Error::access_denied();
            denied.source = Some(source);
            denied
        }
    }
}

/// The S3 gateway as a hyper service.
///
/// Cheap to clone; all state is shared.
#[derive(Debug, Clone)]
pub struct S3GateService {
    gate: Arc<S3Gate>,
    router: Arc<Router>,
    config: Arc<S3GateConfig>,
}

impl S3GateService {
    /// Create a service from a gateway and its configuration.
    #[must_use]
    pub fn new(gate: S3Gate, config: S3GateConfig) -> Self {
        Self {
            gate: Arc::new(gate),
            router: Arc::new(Router::new()),
            config: Arc::new(config),
        }
    }

    /// The configuration this service was built with.
    #[must_use]
    pub fn config(&self) -> &S3GateConfig {
        &self.config
    }

    /// Handle one request. Never fails: errors become XML error responses.
    pub async fn handle<B>(&self, req: http::Request<B>) -> S3Response
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let (parts, body) = req.into_parts();
        debug!(request_id, method = %parts.method, uri = %parts.uri, "processing request");

        let response = match self.process(&parts, body, &request_id).await {
            Ok(response) => response,
            Err(err) => render_error(err, parts.uri.path(), &request_id),
        };

        let mut response = self.add_common_headers(response, &request_id);
        if parts.method == http::Method::HEAD {
            response = strip_body(response);
        }
        response
    }

    async fn process<B>(
        &self,
        parts: &http::request::Parts,
        body: B,
        request_id: &str,
    ) -> Result<S3Response, S3Error>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let query = parse_query(parts.uri.query().unwrap_or_default());
        let route = self
            .router
            .resolve(&parts.method, parts.uri.path(), &query, &parts.headers)?;
        info!(
            request_id,
            method = %parts.method,
            operation = %route.operation,
            bucket = ?route.bucket,
            key = ?route.key,
            "routed request"
        );

        let identity = self.authenticate(parts, request_id).await?;

        let ctx = RequestContext {
            request_id: request_id.to_owned(),
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            operation: route.operation,
            bucket: route.bucket,
            key: route.key,
            query,
            headers: parts.headers.clone(),
            identity,
        };

        let body = RequestBody::new(
            body,
            &parts.headers,
            ctx.identity.as_ref().map(|id| &id.signing),
        )?;
        handlers::dispatch(&self.gate, &self.config, &ctx, body).await
    }

    /// SigV4 headers go through the verifier; everything else is up to
    /// `custom_auth`.
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
        request_id: &str,
    ) -> Result<Option<AuthenticatedIdentity>, S3Error> {
        let Some(auth) = &self.gate.auth else {
            return Ok(None);
        };

        let is_sigv4 = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(ALGORITHM))
            .is_some_and(|rest| rest.starts_with(' '));

        if is_sigv4 {
            return match Verifier::new(Arc::clone(auth)).verify(parts).await {
                Ok(identity) => {
                    debug!(request_id, access_key = %identity.access_key, "signature verified");
                    Ok(Some(identity))
                }
                Err(err) => {
                    warn!(request_id, error = %err, "signature verification failed");
                    Err(auth_error_to_s3(err))
                }
            };
        }

        match auth.custom_auth(parts).await {
            Ok(true) => {
                debug!(request_id, "request admitted anonymously");
                Ok(None)
            }
            Ok(false) => {
                warn!(request_id, "unsigned request rejected");
                Err(S3Error::access_denied())
            }
            Err(err) => {
                warn!(request_id, error = %err, "custom authentication failed");
                Err(auth_error_to_s3(err))
            }
        }
    }

    fn add_common_headers(&self, mut response: S3Response, request_id: &str) -> S3Response {
        let headers = response.headers_mut();
        if let Ok(hv) = HeaderValue::from_str(request_id) {
            headers.insert("x-amz-request-id", hv.clone());
            headers.insert("x-amz-id-2", hv);
        }
        if let Ok(hv) = HeaderValue::from_str(&self.config.server_name) {
            headers.insert(SERVER, hv);
        }
        response
    }
}

/// Complete an error with its resource and request ID, log it, and render it.
fn render_error(err: S3Error, path: &str, request_id: &str) -> S3Response {
    let err = err.with_resource(path).with_request_id(request_id);
    match err.code {
        S3ErrorCode::InternalError => {
            error!(request_id, path, error = %source_chain(&err), "internal error");
        }
        S3ErrorCode::NoSuchKey
        | S3ErrorCode::NoSuchBucket
        | S3ErrorCode::NoSuchUpload
        | S3ErrorCode::NoSuchVersion
        | S3ErrorCode::MethodNotAllowed
        | S3ErrorCode::NotImplemented => {
            info!(request_id, path, code = %err.code, "request failed");
        }
        _ => {
            warn!(request_id, path, code = %err.code, message = %err.message, "request rejected");
        }
    }
    error_to_response(&err)
}

/// HEAD responses keep their headers, including the length of the body
/// they would have carried.
fn strip_body(response: S3Response) -> S3Response {
    let (mut parts, body) = response.into_parts();
    if !parts.headers.contains_key(CONTENT_LENGTH) {
        if let Some(length) = http_body::Body::size_hint(&body).exact() {
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        }
    }
    http::Response::from_parts(parts, S3ResponseBody::empty())
}

impl<B> Service<http::Request<B>> for S3GateService
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = S3Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
