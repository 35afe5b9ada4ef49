//! Request routing.
//!
//! A request is first classified by path shape:
//!
//! - `/` is the service root;
//! - `/{bucket}` and `/{bucket}/` address a bucket;
//! - `/{bucket}/{key...}` addresses an object.
//!
//! Each shape has an ordered route table. The first route whose methods and
//! predicate both match wins, so recognized-but-unsupported sub-resources are
//! declared ahead of the generic CRUD routes. A path that fits a shape but
//! matches no route is `MethodNotAllowed`.
//!
//! A path whose bucket segment is not a valid bucket name is
//! `InvalidBucketName`. Any validly-named bucket path reaches a route, so a
//! missing key is always reported by the object controller as `NoSuchKey`.
//! Segments must percent-decode to UTF-8; anything else is `InvalidURI`, so
//! two different raw keys never collapse onto the same decoded key.

use std::sync::LazyLock;

use http::Method;
use percent_encoding::percent_decode_str;
use regex::Regex;
use s3gate_model::S3Operation;
use s3gate_model::error::S3Error;
use tracing::{debug, info};

static BUCKET_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_.]{1,255}$").expect("BUCKET_NAME_RE"));

/// A condition on the request beyond its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Always satisfied.
    Always,
    /// The query string carries this parameter, with or without a value.
    Query(&'static str),
    /// The query string carries all of these parameters.
    Queries(&'static [&'static str]),
    /// The request carries this header.
    Header(&'static str),
}

impl Predicate {
    fn matches(self, query: &[(String, String)], headers: &http::HeaderMap) -> bool {
        match self {
            Self::Always => true,
            Self::Query(name) => has_query(query, name),
            Self::Queries(names) => names.iter().all(|name| has_query(query, name)),
            Self::Header(name) => headers.contains_key(name),
        }
    }
}

/// One entry of a route table.
#[derive(Debug, Clone)]
pub struct Route {
    /// Methods this route accepts.
    pub methods: Vec<Method>,
    /// Condition the request must satisfy.
    pub predicate: Predicate,
    /// The operation a matching request resolves to.
    pub operation: S3Operation,
}

impl Route {
    fn new(methods: &[Method], predicate: Predicate, operation: S3Operation) -> Self {
        Self {
            methods: methods.to_vec(),
            predicate,
            operation,
        }
    }

    fn stub(methods: &[Method], sub_resource: &'static str) -> Self {
        Self::new(
            methods,
            Predicate::Query(sub_resource),
            S3Operation::NotImplemented(sub_resource),
        )
    }
}

/// The shape of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathShape {
    /// `/`
    Service,
    /// `/{bucket}` or `/{bucket}/`
    Bucket {
        /// The bucket name.
        bucket: String,
    },
    /// `/{bucket}/{key...}`
    Object {
        /// The bucket name.
        bucket: String,
        /// The percent-decoded object key.
        key: String,
    },
}

impl PathShape {
    /// Classify a request path.
    ///
    /// # Errors
    ///
    /// - `InvalidURI` when a segment does not percent-decode to UTF-8.
    /// - `InvalidBucketName` when the path has no valid bucket segment.
    pub fn parse(path: &str) -> Result<Self, S3Error> {
        let Some(trimmed) = path.strip_prefix('/') else {
            return Err(S3Error::invalid_bucket_name());
        };
        if trimmed.is_empty() {
            return Ok(Self::Service);
        }

        let (raw_bucket, raw_key) = match trimmed.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (trimmed, ""),
        };

        let bucket = decode(raw_bucket)?;
        if !is_valid_bucket_name(&bucket) {
            return Err(S3Error::invalid_bucket_name());
        }

        if raw_key.is_empty() {
            Ok(Self::Bucket { bucket })
        } else {
            Ok(Self::Object {
                bucket,
                key: decode(raw_key)?,
            })
        }
    }
}

/// The outcome of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The resolved operation.
    pub operation: S3Operation,
    /// The bucket, for bucket and object routes.
    pub bucket: Option<String>,
    /// The object key, for object routes.
    pub key: Option<String>,
}

/// The route tables for the three path shapes.
#[derive(Debug, Clone)]
pub struct Router {
    service: Vec<Route>,
    bucket: Vec<Route>,
    object: Vec<Route>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Build the S3 route tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: service_routes(),
            bucket: bucket_routes(),
            object: object_routes(),
        }
    }

    /// Resolve a request to an operation.
    ///
    /// `query` holds the decoded query parameters.
    ///
    /// # Errors
    ///
    /// - `MethodNotAllowed` when the path shape matched but no route did.
    /// - `InvalidBucketName` or `InvalidURI` when no path shape matched.
    pub fn resolve(
        &self,
        method: &Method,
        path: &str,
        query: &[(String, String)],
        headers: &http::HeaderMap,
    ) -> Result<RouteMatch, S3Error> {
        let shape = PathShape::parse(path).inspect_err(|err| {
            info!(%method, path, code = %err.code, "unroutable path");
        })?;

        let (table, bucket, key) = match shape {
            PathShape::Service => (&self.service, None, None),
            PathShape::Bucket { bucket } => (&self.bucket, Some(bucket), None),
            PathShape::Object { bucket, key } => (&self.object, Some(bucket), Some(key)),
        };

        let route = table
            .iter()
            .find(|r| r.methods.contains(method) && r.predicate.matches(query, headers));

        match route {
            Some(route) => {
                debug!(%method, path, operation = %route.operation, "matched route");
                Ok(RouteMatch {
                    operation: route.operation,
                    bucket,
                    key,
                })
            }
            None => {
                info!(%method, path, "method not allowed");
                Err(S3Error::method_not_allowed())
            }
        }
    }
}

fn service_routes() -> Vec<Route> {
    vec![Route::new(
        &[Method::GET, Method::HEAD],
        Predicate::Always,
        S3Operation::ListBuckets,
    )]
}

fn bucket_routes() -> Vec<Route> {
    const GET_PUT: &[Method] = &[Method::GET, Method::PUT];
    const GET_PUT_DELETE: &[Method] = &[Method::GET, Method::PUT, Method::DELETE];

    vec![
        Route::stub(GET_PUT, "accelerate"),
        Route::stub(GET_PUT, "acl"),
        Route::stub(GET_PUT_DELETE, "analytics"),
        Route::stub(GET_PUT_DELETE, "cors"),
        Route::stub(GET_PUT_DELETE, "encryption"),
        Route::stub(GET_PUT_DELETE, "inventory"),
        Route::stub(GET_PUT_DELETE, "lifecycle"),
        Route::stub(GET_PUT, "logging"),
        Route::stub(GET_PUT_DELETE, "metrics"),
        Route::stub(GET_PUT, "notification"),
        Route::stub(GET_PUT, "object-lock"),
        Route::stub(GET_PUT_DELETE, "policy"),
        Route::stub(&[Method::GET], "policyStatus"),
        Route::stub(GET_PUT_DELETE, "publicAccessBlock"),
        Route::stub(&[Method::PUT, Method::DELETE], "replication"),
        Route::stub(GET_PUT, "requestPayment"),
        Route::stub(GET_PUT_DELETE, "tagging"),
        Route::stub(GET_PUT_DELETE, "website"),
        Route::new(
            &[Method::GET],
            Predicate::Query("versioning"),
            S3Operation::GetBucketVersioning,
        ),
        Route::new(
            &[Method::PUT],
            Predicate::Query("versioning"),
            S3Operation::PutBucketVersioning,
        ),
        Route::new(
            &[Method::GET],
            Predicate::Query("versions"),
            S3Operation::ListObjectVersions,
        ),
        Route::new(
            &[Method::POST],
            Predicate::Query("delete"),
            S3Operation::DeleteObjects,
        ),
        Route::new(
            &[Method::POST],
            Predicate::Always,
            S3Operation::NotImplemented("post"),
        ),
        Route::new(
            &[Method::GET],
            Predicate::Query("uploads"),
            S3Operation::ListMultipartUploads,
        ),
        Route::new(
            &[Method::GET, Method::HEAD],
            Predicate::Query("location"),
            S3Operation::GetBucketLocation,
        ),
        Route::new(
            &[Method::GET, Method::HEAD],
            Predicate::Always,
            S3Operation::ListObjects,
        ),
        Route::new(&[Method::PUT], Predicate::Always, S3Operation::CreateBucket),
        Route::new(&[Method::DELETE], Predicate::Always, S3Operation::DeleteBucket),
    ]
}

fn object_routes() -> Vec<Route> {
    const GET_PUT: &[Method] = &[Method::GET, Method::PUT];

    vec![
        Route::stub(GET_PUT, "acl"),
        Route::stub(GET_PUT, "legal-hold"),
        Route::stub(GET_PUT, "retention"),
        Route::stub(&[Method::GET, Method::PUT, Method::DELETE], "tagging"),
        Route::stub(&[Method::GET], "torrent"),
        Route::stub(&[Method::POST], "restore"),
        Route::stub(&[Method::POST], "select"),
        Route::new(
            &[Method::PUT],
            Predicate::Header("x-amz-copy-source"),
            S3Operation::NotImplemented("copy"),
        ),
        Route::new(
            &[Method::GET, Method::HEAD],
            Predicate::Query("uploadId"),
            S3Operation::ListParts,
        ),
        Route::new(
            &[Method::POST],
            Predicate::Query("uploads"),
            S3Operation::CreateMultipartUpload,
        ),
        Route::new(
            &[Method::POST],
            Predicate::Query("uploadId"),
            S3Operation::CompleteMultipartUpload,
        ),
        Route::new(
            &[Method::PUT],
            Predicate::Query("uploadId"),
            S3Operation::UploadPart,
        ),
        Route::new(
            &[Method::DELETE],
            Predicate::Queries(&["uploadId", "partNumber"]),
            S3Operation::DeletePart,
        ),
        Route::new(
            &[Method::DELETE],
            Predicate::Query("uploadId"),
            S3Operation::AbortMultipartUpload,
        ),
        Route::new(
            &[Method::GET, Method::HEAD],
            Predicate::Always,
            S3Operation::GetObject,
        ),
        Route::new(&[Method::PUT], Predicate::Always, S3Operation::PutObject),
        Route::new(&[Method::DELETE], Predicate::Always, S3Operation::DeleteObject),
    ]
}

/// Whether `name` is an acceptable bucket name.
#[must_use]
pub fn is_valid_bucket_name(name: &str) -> bool {
    BUCKET_NAME_RE.is_match(name)
}

fn has_query(query: &[(String, String)], name: &str) -> bool {
    query.iter().any(|(k, _)| k == name)
}

fn decode(s: &str) -> Result<String, S3Error> {
    percent_decode_str(s)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|err| S3Error::invalid_uri().with_source(err))
}
