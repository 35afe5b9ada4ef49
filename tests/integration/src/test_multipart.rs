//! Multipart upload integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use md5::{Digest, Md5};

    use crate::store::MIN_PART_SIZE;
    use crate::{MemoryStore, Reply, call, request, service};

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new().with_bucket("mp"))
    }

    async fn initiate(svc: &s3gate_http::S3GateService, key: &str) -> String {
        let reply = call(svc, request("POST", &format!("/mp/{key}?uploads"), "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.text().contains("<InitiateMultipartUploadResult"));
        assert_eq!(reply.xml_value("Bucket").as_deref(), Some("mp"));
        assert_eq!(reply.xml_value("Key").as_deref(), Some(key));
        reply.xml_value("UploadId").expect("upload id")
    }

    async fn upload_part(
        svc: &s3gate_http::S3GateService,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Reply {
        let uri = format!("/mp/{key}?partNumber={part_number}&uploadId={upload_id}");
        call(svc, request("PUT", &uri, data)).await
    }

    fn complete_body(parts: &[(u32, &str)]) -> String {
        let mut body = String::from("<CompleteMultipartUpload>");
        for (number, etag) in parts {
            body.push_str(&format!(
                "<Part><PartNumber>{number}</PartNumber><ETag>{etag}</ETag></Part>"
            ));
        }
        body.push_str("</CompleteMultipartUpload>");
        body
    }

    #[tokio::test]
    async fn test_should_assemble_parts_into_object() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "big.bin").await;

        let first = vec![b'a'; MIN_PART_SIZE];
        let second = b"tail".to_vec();
        let reply = upload_part(&svc, "big.bin", &upload_id, 1, first.clone()).await;
        assert_eq!(reply.status, StatusCode::OK);
        let etag_1 = reply.header("etag").expect("etag").to_owned();
        assert!(etag_1.starts_with('"') && etag_1.ends_with('"'));
        let etag_2 = upload_part(&svc, "big.bin", &upload_id, 2, second.clone())
            .await
            .header("etag")
            .expect("etag")
            .to_owned();

        let body = complete_body(&[(1, &etag_1), (2, &etag_2)]);
        let reply = call(
            &svc,
            request("POST", &format!("/mp/big.bin?uploadId={upload_id}"), body),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.text().contains("<CompleteMultipartUploadResult"));
        assert_eq!(
            reply.xml_value("Location").as_deref(),
            Some("http://localhost/mp/big.bin")
        );

        let mut digests = Vec::new();
        digests.extend_from_slice(&Md5::digest(&first));
        digests.extend_from_slice(&Md5::digest(&second));
        let expected = format!("&quot;{}-2&quot;", hex::encode(Md5::digest(&digests)));
        assert_eq!(reply.xml_value("ETag"), Some(expected));

        let stored = store.object_data("mp", "big.bin").expect("assembled");
        assert_eq!(stored.len(), MIN_PART_SIZE + 4);
        assert!(stored.ends_with(b"tail"));
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_small_leading_part() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "small.bin").await;

        let etag_1 = upload_part(&svc, "small.bin", &upload_id, 1, b"one".to_vec())
            .await
            .header("etag")
            .expect("etag")
            .to_owned();
        let etag_2 = upload_part(&svc, "small.bin", &upload_id, 2, b"two".to_vec())
            .await
            .header("etag")
            .expect("etag")
            .to_owned();

        let body = complete_body(&[(1, &etag_1), (2, &etag_2)]);
        let reply = call(
            &svc,
            request("POST", &format!("/mp/small.bin?uploadId={upload_id}"), body),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("EntityTooSmall"));
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_should_reject_parts_out_of_order() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "order.bin").await;

        let body = complete_body(&[(2, "\"aa\""), (1, "\"bb\"")]);
        let reply = call(
            &svc,
            request("POST", &format!("/mp/order.bin?uploadId={upload_id}"), body),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("InvalidPartOrder"));
    }

    #[tokio::test]
    async fn test_should_reject_unknown_part_etag() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "etag.bin").await;
        upload_part(&svc, "etag.bin", &upload_id, 1, b"data".to_vec()).await;

        let body = complete_body(&[(1, "\"00000000000000000000000000000000\"")]);
        let reply = call(
            &svc,
            request("POST", &format!("/mp/etag.bin?uploadId={upload_id}"), body),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("InvalidPart"));
    }

    #[tokio::test]
    async fn test_should_list_parts_with_pagination() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "parts.bin").await;
        for number in 1..=3 {
            upload_part(&svc, "parts.bin", &upload_id, number, vec![b'x'; 10]).await;
        }

        let uri = format!("/mp/parts.bin?uploadId={upload_id}&max-parts=2");
        let reply = call(&svc, request("GET", &uri, "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.text().contains("<ListPartsResult"));
        assert_eq!(reply.xml_values("PartNumber"), vec!["1", "2"]);
        assert_eq!(reply.xml_value("IsTruncated").as_deref(), Some("true"));
        assert_eq!(reply.xml_value("NextPartNumberMarker").as_deref(), Some("2"));
        assert_eq!(reply.xml_value("StorageClass").as_deref(), Some("STANDARD"));

        let uri = format!("/mp/parts.bin?uploadId={upload_id}&part-number-marker=2");
        let reply = call(&svc, request("GET", &uri, "")).await;
        assert_eq!(reply.xml_values("PartNumber"), vec!["3"]);
        assert_eq!(reply.xml_value("IsTruncated").as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn test_should_list_uploads_in_progress() {
        let store = store();
        let svc = service(&store);
        initiate(&svc, "a.bin").await;
        initiate(&svc, "b.bin").await;
        initiate(&svc, "c.bin").await;

        let reply = call(&svc, request("GET", "/mp?uploads&max-uploads=2", "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.text().contains("<ListMultipartUploadsResult"));
        assert_eq!(reply.xml_values("Key"), vec!["a.bin", "b.bin"]);
        assert_eq!(reply.xml_value("IsTruncated").as_deref(), Some("true"));
        assert_eq!(reply.xml_value("NextKeyMarker").as_deref(), Some("b.bin"));
    }

    #[tokio::test]
    async fn test_should_abort_upload_and_forget_it() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "abort.bin").await;

        let uri = format!("/mp/abort.bin?uploadId={upload_id}");
        let reply = call(&svc, request("DELETE", &uri, "")).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);

        let reply = call(&svc, request("GET", &uri, "")).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("NoSuchUpload"));
    }

    #[tokio::test]
    async fn test_should_delete_single_part() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "del.bin").await;
        upload_part(&svc, "del.bin", &upload_id, 1, b"one".to_vec()).await;
        upload_part(&svc, "del.bin", &upload_id, 2, b"two".to_vec()).await;

        let uri = format!("/mp/del.bin?uploadId={upload_id}&partNumber=1");
        let reply = call(&svc, request("DELETE", &uri, "")).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);

        let uri = format!("/mp/del.bin?uploadId={upload_id}");
        let reply = call(&svc, request("GET", &uri, "")).await;
        assert_eq!(reply.xml_values("PartNumber"), vec!["2"]);
    }

    #[tokio::test]
    async fn test_should_reject_part_number_out_of_range() {
        let store = store();
        let svc = service(&store);
        let upload_id = initiate(&svc, "range.bin").await;

        let reply = upload_part(&svc, "range.bin", &upload_id, 10_001, b"x".to_vec()).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("InvalidArgument"));
    }
}
