use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use tracing::info;

use s3gate_model::error::S3Error;
use s3gate_xml::s3_error_to_xml;

use super::{optional_query, require_content_length, settle_upload};
use crate::body::{RequestBody, S3ResponseBody};
use crate::context::RequestContext;
use crate::controller::S3Gate;
use crate::response::{
    APPLICATION_XML, S3Response, build_response, http_date, set_delete_marker, set_etag,
    set_optional_header,
};

const VERSION_ID_HEADER: &str = "x-amz-version-id";

pub(super) async fn get_object(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let version = optional_query(ctx, "versionId");
    let result = gate
        .object
        .get_object(ctx, ctx.bucket(), ctx.key(), version.as_deref())
        .await?;

    let builder = set_etag(http::Response::builder(), &result.etag);
    let builder = set_optional_header(builder, VERSION_ID_HEADER, result.version.as_deref());

    if result.delete_marker {
        info!(bucket = ctx.bucket(), key = ctx.key(), "object resolved to a delete marker");
        let err = S3Error::no_such_key()
            .with_resource(ctx.path.clone())
            .with_request_id(ctx.request_id.clone());
        return build_response(
            set_delete_marker(builder, true)
                .status(err.status_code)
                .header(CONTENT_TYPE, APPLICATION_XML),
            S3ResponseBody::from_bytes(s3_error_to_xml(&err)),
        );
    }

    let mut builder = builder
        .status(http::StatusCode::OK)
        .header(CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref());
    if let Some(mod_time) = result.mod_time {
        builder = builder.header(LAST_MODIFIED, http_date(&mod_time));
    }
    if let Some(length) = result.content.length {
        builder = builder.header(CONTENT_LENGTH, length);
    }

    build_response(
        builder,
        S3ResponseBody::from_stream(result.content.stream, result.content.length),
    )
}

pub(super) async fn put_object(
    gate: &S3Gate,
    ctx: &RequestContext,
    mut body: RequestBody,
) -> Result<S3Response, S3Error> {
    require_content_length(ctx)?;

    let result = gate
        .object
        .put_object(ctx, ctx.bucket(), ctx.key(), &mut body)
        .await;
    let result = settle_upload(&mut body, result).await?;

    let builder = set_etag(http::Response::builder(), &result.etag);
    let builder = set_optional_header(builder, VERSION_ID_HEADER, result.version.as_deref());
    build_response(builder.status(http::StatusCode::OK), S3ResponseBody::empty())
}

pub(super) async fn delete_object(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let version = optional_query(ctx, "versionId");
    let result = gate
        .object
        .delete_object(ctx, ctx.bucket(), ctx.key(), version.as_deref())
        .await?;

    let builder = set_optional_header(
        http::Response::builder(),
        VERSION_ID_HEADER,
        result.version.as_deref(),
    );
    build_response(
        set_delete_marker(builder, result.delete_marker).status(http::StatusCode::NO_CONTENT),
        S3ResponseBody::empty(),
    )
}
