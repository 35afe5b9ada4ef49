//! Per-resource request handlers.
//!
//! Each handler parses what it needs from the [`RequestContext`] and body,
//! calls one controller method, and renders the result.

mod bucket;
mod multipart;
mod object;
mod service;

use tracing::debug;

use s3gate_model::S3Operation;
use s3gate_model::error::S3Error;
use s3gate_xml::{S3Deserialize, from_xml};

use crate::body::RequestBody;
use crate::config::S3GateConfig;
use crate::context::RequestContext;
use crate::controller::S3Gate;
use crate::response::S3Response;

/// Route a request to the handler of its operation.
pub(crate) async fn dispatch(
    gate: &S3Gate,
    config: &S3GateConfig,
    ctx: &RequestContext,
    body: RequestBody,
) -> Result<S3Response, S3Error> {
    debug!(operation = %ctx.operation, bucket = ?ctx.bucket, key = ?ctx.key, "dispatching");

    match ctx.operation {
        S3Operation::ListBuckets => service::list_buckets(gate, ctx).await,

        S3Operation::GetBucketLocation => bucket::get_location(gate, ctx).await,
        S3Operation::ListObjects => bucket::list_objects(gate, ctx).await,
        S3Operation::ListObjectVersions => bucket::list_object_versions(gate, ctx).await,
        S3Operation::CreateBucket => bucket::create_bucket(gate, config, ctx, body).await,
        S3Operation::DeleteBucket => bucket::delete_bucket(gate, ctx).await,
        S3Operation::GetBucketVersioning => bucket::get_versioning(gate, ctx).await,
        S3Operation::PutBucketVersioning => bucket::put_versioning(gate, config, ctx, body).await,
        S3Operation::DeleteObjects => bucket::delete_objects(gate, config, ctx, body).await,

        S3Operation::GetObject => object::get_object(gate, ctx).await,
        S3Operation::PutObject => object::put_object(gate, ctx, body).await,
        S3Operation::DeleteObject => object::delete_object(gate, ctx).await,

        S3Operation::ListMultipartUploads => multipart::list_uploads(gate, ctx).await,
        S3Operation::CreateMultipartUpload => multipart::create_upload(gate, ctx).await,
        S3Operation::UploadPart => multipart::upload_part(gate, ctx, body).await,
        S3Operation::CompleteMultipartUpload => {
            multipart::complete_upload(gate, config, ctx, body).await
        }
        S3Operation::AbortMultipartUpload => multipart::abort_upload(gate, ctx).await,
        S3Operation::ListParts => multipart::list_parts(gate, ctx).await,
        S3Operation::DeletePart => multipart::delete_part(gate, ctx).await,

        S3Operation::NotImplemented(feature) => {
            debug!(feature, "sub-resource not implemented");
            Err(S3Error::not_implemented())
        }
    }
}

/// Read an integer query parameter.
///
/// An absent or empty parameter yields `default`.
///
/// # Errors
///
/// `InvalidArgument` if the value is not an integer in `min..=max`.
pub(crate) fn int_query_value(
    ctx: &RequestContext,
    name: &str,
    min: u32,
    max: u32,
    default: u32,
) -> Result<u32, S3Error> {
    let raw = ctx.query_or_empty(name);
    if raw.is_empty() {
        return Ok(default);
    }
    raw.parse::<i64>()
        .ok()
        .filter(|v| (i64::from(min)..=i64::from(max)).contains(v))
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            S3Error::invalid_argument(format!(
                "Argument {name} must be an integer between {min} and {max}"
            ))
        })
}

/// The `partNumber` parameter of part-level operations.
pub(crate) fn required_part_number(ctx: &RequestContext) -> Result<u32, S3Error> {
    if ctx.query_or_empty("partNumber").is_empty() {
        return Err(S3Error::invalid_argument("partNumber is required"));
    }
    int_query_value(ctx, "partNumber", 1, 10_000, 1)
}

/// A non-empty query parameter as an owned string.
pub(crate) fn optional_query(ctx: &RequestContext, name: &str) -> Option<String> {
    ctx.query_value(name)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// `Content-Length` may only be omitted for a non-identity transfer coding.
pub(crate) fn require_content_length(ctx: &RequestContext) -> Result<(), S3Error> {
    let codings: Vec<&str> = ctx
        .headers
        .get_all(http::header::TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let identity = codings.is_empty() || codings.iter().any(|c| c.trim() == "identity");
    if identity && !ctx.headers.contains_key(http::header::CONTENT_LENGTH) {
        return Err(S3Error::missing_content_length());
    }
    Ok(())
}

/// Finish an upload once the controller returned.
///
/// On success the rest of the body is drained so end-of-stream digest checks
/// run. Either way a recorded body failure replaces the controller's outcome.
pub(crate) async fn settle_upload<T>(
    body: &mut RequestBody,
    result: Result<T, S3Error>,
) -> Result<T, S3Error> {
    let probe = body.probe();
    let result = match result {
        Ok(value) => body.drain().await.map(|()| value),
        Err(err) => Err(err),
    };
    probe.settle(result)
}

/// Read and parse an XML request document, capped at `max_xml_body_size`.
pub(crate) async fn read_xml_body<T: S3Deserialize>(
    config: &S3GateConfig,
    body: &mut RequestBody,
) -> Result<T, S3Error> {
    let bytes = body.collect_limited(config.max_xml_body_size).await?;
    Ok(from_xml(&bytes)?)
}

/// Like [`read_xml_body`], but an empty body yields `None`.
pub(crate) async fn read_optional_xml_body<T: S3Deserialize>(
    config: &S3GateConfig,
    body: &mut RequestBody,
) -> Result<Option<T>, S3Error> {
    let bytes = body.collect_limited(config.max_xml_body_size).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(from_xml(&bytes)?))
}
