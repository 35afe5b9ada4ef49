use s3gate_model::error::{S3Error, S3ErrorCode};
use s3gate_model::input::CompleteMultipartUpload;
use s3gate_model::output::{
    CompleteMultipartUploadOutput, CreateMultipartUploadOutput, ListMultipartUploadsOutput,
    ListPartsOutput,
};
use s3gate_model::types::CompletedPart;

use super::{
    int_query_value, read_xml_body, require_content_length, required_part_number, settle_upload,
};
use crate::body::{RequestBody, S3ResponseBody};
use crate::config::S3GateConfig;
use crate::context::RequestContext;
use crate::controller::{ListMultipartRequest, ListPartsRequest, S3Gate};
use crate::response::{
    S3Response, build_response, empty_response, set_etag, set_optional_header, xml_response,
    xml_response_with,
};

pub(super) async fn list_uploads(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let request = ListMultipartRequest {
        key_marker: ctx.query_or_empty("key-marker").to_owned(),
        upload_id_marker: ctx.query_or_empty("upload-id-marker").to_owned(),
        max_uploads: int_query_value(ctx, "max-uploads", 0, 1000, 1000)?,
    };
    let result = gate
        .multipart
        .list_multipart(ctx, ctx.bucket(), request.clone())
        .await?;

    let last = result.uploads.last().filter(|_| result.is_truncated);
    let output = ListMultipartUploadsOutput {
        bucket: ctx.bucket().to_owned(),
        next_key_marker: last.map(|u| u.key.clone()),
        next_upload_id_marker: last.map(|u| u.upload_id.clone()),
        key_marker: request.key_marker,
        upload_id_marker: request.upload_id_marker,
        max_uploads: request.max_uploads,
        is_truncated: result.is_truncated,
        uploads: result.uploads,
    };
    xml_response("ListMultipartUploadsResult", &output)
}

pub(super) async fn create_upload(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let upload_id = gate
        .multipart
        .init_multipart(ctx, ctx.bucket(), ctx.key())
        .await?;
    let output = CreateMultipartUploadOutput {
        bucket: ctx.bucket().to_owned(),
        key: ctx.key().to_owned(),
        upload_id,
    };
    xml_response("InitiateMultipartUploadResult", &output)
}

pub(super) async fn upload_part(
    gate: &S3Gate,
    ctx: &RequestContext,
    mut body: RequestBody,
) -> Result<S3Response, S3Error> {
    require_content_length(ctx)?;
    let part_number = required_part_number(ctx)?;

    let result = gate
        .multipart
        .upload_multipart_chunk(
            ctx,
            ctx.bucket(),
            ctx.key(),
            ctx.query_or_empty("uploadId"),
            part_number,
            &mut body,
        )
        .await;
    let etag = settle_upload(&mut body, result).await?;

    build_response(
        set_etag(http::Response::builder(), &etag).status(http::StatusCode::OK),
        S3ResponseBody::empty(),
    )
}

/// Parts must be listed with strictly ascending part numbers.
fn check_part_order(parts: &[CompletedPart]) -> Result<(), S3Error> {
    if parts.is_empty() {
        return Err(S3Error::with_message(
            S3ErrorCode::MalformedXML,
            "The multipart upload must name at least one part.",
        ));
    }
    if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
        return Err(S3Error::invalid_part_order());
    }
    Ok(())
}

pub(super) async fn complete_upload(
    gate: &S3Gate,
    config: &S3GateConfig,
    ctx: &RequestContext,
    mut body: RequestBody,
) -> Result<S3Response, S3Error> {
    let request: CompleteMultipartUpload = read_xml_body(config, &mut body).await?;
    check_part_order(&request.parts)?;

    let result = gate
        .multipart
        .complete_multipart(
            ctx,
            ctx.bucket(),
            ctx.key(),
            ctx.query_or_empty("uploadId"),
            request.parts,
        )
        .await?;

    let output = CompleteMultipartUploadOutput {
        location: result.location,
        bucket: ctx.bucket().to_owned(),
        key: ctx.key().to_owned(),
        etag: result.etag,
    };
    let builder = set_optional_header(
        http::Response::builder(),
        "x-amz-version-id",
        result.version.as_deref(),
    );
    xml_response_with(builder, "CompleteMultipartUploadResult", &output)
}

pub(super) async fn abort_upload(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    gate.multipart
        .abort_multipart(ctx, ctx.bucket(), ctx.key(), ctx.query_or_empty("uploadId"))
        .await?;
    empty_response(http::StatusCode::NO_CONTENT)
}

pub(super) async fn list_parts(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let request = ListPartsRequest {
        part_number_marker: int_query_value(ctx, "part-number-marker", 0, 10_000, 0)?,
        max_parts: int_query_value(ctx, "max-parts", 0, 1000, 1000)?,
    };
    let upload_id = ctx.query_or_empty("uploadId");
    let result = gate
        .multipart
        .list_multipart_chunks(ctx, ctx.bucket(), ctx.key(), upload_id, request)
        .await?;

    let output = ListPartsOutput {
        bucket: ctx.bucket().to_owned(),
        key: ctx.key().to_owned(),
        upload_id: upload_id.to_owned(),
        initiator: result.initiator,
        owner: result.owner,
        storage_class: result.storage_class,
        part_number_marker: request.part_number_marker,
        next_part_number_marker: result
            .parts
            .last()
            .filter(|_| result.is_truncated)
            .map(|p| p.part_number),
        max_parts: request.max_parts,
        is_truncated: result.is_truncated,
        parts: result.parts,
    };
    xml_response("ListPartsResult", &output)
}

pub(super) async fn delete_part(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let part_number = required_part_number(ctx)?;
    gate.multipart
        .delete_multipart_chunk(
            ctx,
            ctx.bucket(),
            ctx.key(),
            ctx.query_or_empty("uploadId"),
            part_number,
        )
        .await?;
    empty_response(http::StatusCode::NO_CONTENT)
}
