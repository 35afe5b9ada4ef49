use tracing::{debug, error};

use s3gate_model::error::{S3Error, S3ErrorCode};
use s3gate_model::input::{CreateBucketConfiguration, Delete, VersioningConfiguration};
use s3gate_model::output::{
    DeleteError, DeleteObjectsOutput, DeletedObject, GetBucketLocationOutput,
    GetBucketVersioningOutput, ListObjectVersionsOutput, ListObjectsOutput,
};
use s3gate_model::types::{CommonPrefix, VersioningStatus};

use super::{int_query_value, optional_query, read_optional_xml_body, read_xml_body};
use crate::body::{RequestBody, S3ResponseBody};
use crate::config::S3GateConfig;
use crate::context::RequestContext;
use crate::controller::{ListObjectVersionsRequest, ListObjectsRequest, S3Gate};
use crate::response::{
    S3Response, build_response, empty_response, source_chain, xml_response,
};

/// Most keys a single multi-delete request may name.
const MAX_DELETE_OBJECTS: usize = 1000;

/// The region that is reported as an empty location constraint.
const DEFAULT_REGION: &str = "us-east-1";

pub(super) async fn get_location(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let location = gate.bucket.get_location(ctx, ctx.bucket()).await?;
    let output = GetBucketLocationOutput {
        location_constraint: Some(location).filter(|l| !l.is_empty() && l != DEFAULT_REGION),
    };
    xml_response("LocationConstraint", &output)
}

fn to_common_prefixes(prefixes: Vec<String>) -> Vec<CommonPrefix> {
    prefixes
        .into_iter()
        .map(|prefix| CommonPrefix { prefix })
        .collect()
}

pub(super) async fn list_objects(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let request = ListObjectsRequest {
        prefix: ctx.query_or_empty("prefix").to_owned(),
        marker: ctx.query_or_empty("marker").to_owned(),
        delimiter: optional_query(ctx, "delimiter"),
        max_keys: int_query_value(ctx, "max-keys", 0, 1000, 1000)?,
    };
    let result = gate
        .bucket
        .list_objects(ctx, ctx.bucket(), request.clone())
        .await?;

    // Without a delimiter clients resume from the last key themselves.
    let next_marker = if result.is_truncated && request.delimiter.is_some() {
        let last_key = result.contents.last().map(|o| o.key.as_str());
        let last_prefix = result.common_prefixes.last().map(String::as_str);
        last_key.max(last_prefix).map(str::to_owned)
    } else {
        None
    };

    let output = ListObjectsOutput {
        name: ctx.bucket().to_owned(),
        prefix: request.prefix,
        marker: request.marker,
        next_marker,
        max_keys: request.max_keys,
        delimiter: request.delimiter,
        is_truncated: result.is_truncated,
        contents: result.contents,
        common_prefixes: to_common_prefixes(result.common_prefixes),
    };
    xml_response("ListBucketResult", &output)
}

pub(super) async fn list_object_versions(
    gate: &S3Gate,
    ctx: &RequestContext,
) -> Result<S3Response, S3Error> {
    let request = ListObjectVersionsRequest {
        prefix: ctx.query_or_empty("prefix").to_owned(),
        key_marker: ctx.query_or_empty("key-marker").to_owned(),
        version_id_marker: ctx.query_or_empty("version-id-marker").to_owned(),
        delimiter: optional_query(ctx, "delimiter"),
        max_keys: int_query_value(ctx, "max-keys", 0, 1000, 1000)?,
    };
    let result = gate
        .bucket
        .list_object_versions(ctx, ctx.bucket(), request.clone())
        .await?;

    let output = ListObjectVersionsOutput {
        name: ctx.bucket().to_owned(),
        prefix: request.prefix,
        key_marker: request.key_marker,
        version_id_marker: request.version_id_marker,
        next_key_marker: result.next_key_marker.filter(|_| result.is_truncated),
        next_version_id_marker: result.next_version_id_marker.filter(|_| result.is_truncated),
        max_keys: request.max_keys,
        delimiter: request.delimiter,
        is_truncated: result.is_truncated,
        versions: result.versions,
        delete_markers: result.delete_markers,
        common_prefixes: to_common_prefixes(result.common_prefixes),
    };
    xml_response("ListVersionsResult", &output)
}

pub(super) async fn create_bucket(
    gate: &S3Gate,
    config: &S3GateConfig,
    ctx: &RequestContext,
    mut body: RequestBody,
) -> Result<S3Response, S3Error> {
    let configuration: Option<CreateBucketConfiguration> =
        read_optional_xml_body(config, &mut body).await?;
    if let Some(location) = configuration.and_then(|c| c.location_constraint) {
        debug!(bucket = ctx.bucket(), location, "bucket location constraint requested");
    }

    gate.bucket.create_bucket(ctx, ctx.bucket()).await?;

    build_response(
        http::Response::builder()
            .status(http::StatusCode::OK)
            .header(http::header::LOCATION, format!("/{}", ctx.bucket())),
        S3ResponseBody::empty(),
    )
}

pub(super) async fn delete_bucket(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    gate.bucket.delete_bucket(ctx, ctx.bucket()).await?;
    empty_response(http::StatusCode::NO_CONTENT)
}

pub(super) async fn get_versioning(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let status = gate.bucket.get_versioning(ctx, ctx.bucket()).await?;
    xml_response("VersioningConfiguration", &GetBucketVersioningOutput { status })
}

pub(super) async fn put_versioning(
    gate: &S3Gate,
    config: &S3GateConfig,
    ctx: &RequestContext,
    mut body: RequestBody,
) -> Result<S3Response, S3Error> {
    let configuration: VersioningConfiguration = read_xml_body(config, &mut body).await?;
    let status = configuration
        .status
        .as_deref()
        .map(str::trim)
        .and_then(VersioningStatus::from_status)
        .ok_or_else(S3Error::illegal_versioning_configuration)?;

    gate.bucket.set_versioning(ctx, ctx.bucket(), status).await?;
    empty_response(http::StatusCode::OK)
}

pub(super) async fn delete_objects(
    gate: &S3Gate,
    config: &S3GateConfig,
    ctx: &RequestContext,
    mut body: RequestBody,
) -> Result<S3Response, S3Error> {
    if config.require_content_md5_for_delete && ctx.header("content-md5").is_none() {
        return Err(S3Error::with_message(
            S3ErrorCode::InvalidRequest,
            "Missing required header for this request: Content-MD5",
        ));
    }

    let request: Delete = read_xml_body(config, &mut body).await?;
    if request.objects.len() > MAX_DELETE_OBJECTS {
        return Err(S3Error::with_message(
            S3ErrorCode::MalformedXML,
            format!("A multi-object delete may name at most {MAX_DELETE_OBJECTS} keys."),
        ));
    }

    let mut output = DeleteObjectsOutput::default();
    for object in request.objects {
        let version = object.version_id.as_deref().filter(|v| !v.is_empty());
        match gate
            .object
            .delete_object(ctx, ctx.bucket(), &object.key, version)
            .await
        {
            Ok(result) => {
                if request.quiet {
                    continue;
                }
                let delete_marker_version_id = result.version.filter(|_| result.delete_marker);
                output.deleted.push(DeletedObject {
                    key: object.key,
                    version_id: object.version_id,
                    delete_marker: result.delete_marker,
                    delete_marker_version_id,
                });
            }
            Err(err) => {
                if err.is_internal() {
                    error!(
                        request_id = %ctx.request_id,
                        key = %object.key,
                        error = %source_chain(&err),
                        "multi-delete entry failed"
                    );
                } else {
                    debug!(key = %object.key, code = %err.code, "multi-delete entry failed");
                }
                output.errors.push(DeleteError {
                    key: object.key,
                    version_id: object.version_id,
                    code: err.code.as_str().to_owned(),
                    message: err.message,
                });
            }
        }
    }

    xml_response("DeleteResult", &output)
}
