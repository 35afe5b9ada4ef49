use s3gate_model::error::S3Error;
use s3gate_model::output::ListBucketsOutput;

use crate::context::RequestContext;
use crate::controller::S3Gate;
use crate::response::{S3Response, xml_response};

pub(super) async fn list_buckets(gate: &S3Gate, ctx: &RequestContext) -> Result<S3Response, S3Error> {
    let result = gate.service.list_buckets(ctx).await?;
    let output = ListBucketsOutput {
        owner: Some(result.owner),
        buckets: result.buckets,
    };
    xml_response("ListAllMyBucketsResult", &output)
}
