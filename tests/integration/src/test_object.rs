//! Object round-trip integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use http::header::CONTENT_LENGTH;

    use crate::{MemoryStore, call, request, request_with, service};

    const HELLO_MD5_B64: &str = "XUFAKrxLKna5cZ2REBfFkg==";

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new().with_bucket("mybucket"))
    }

    #[tokio::test]
    async fn test_should_put_and_get_object() {
        let store = store();
        let svc = service(&store);

        let reply = call(
            &svc,
            request_with(
                "PUT",
                "/mybucket/foo.txt",
                &[("content-md5", HELLO_MD5_B64)],
                "hello",
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.header("etag"),
            Some("\"5d41402abc4b2a76b9719d911017c592\"")
        );
        assert!(reply.header("x-amz-version-id").is_none());
        assert!(reply.header("x-amz-request-id").is_some());
        assert_eq!(reply.header("server"), Some("s3gate"));

        let reply = call(&svc, request("GET", "/mybucket/foo.txt", "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.text(), "hello");
        assert_eq!(reply.header("content-length"), Some("5"));
        assert_eq!(reply.header("content-type"), Some("application/octet-stream"));
        assert_eq!(
            reply.header("etag"),
            Some("\"5d41402abc4b2a76b9719d911017c592\"")
        );
        assert!(reply.header("last-modified").is_some_and(|v| v.ends_with("GMT")));
    }

    #[tokio::test]
    async fn test_should_answer_head_without_body() {
        let store = store();
        let svc = service(&store);
        call(&svc, request("PUT", "/mybucket/foo.txt", "hello")).await;

        let reply = call(&svc, request("HEAD", "/mybucket/foo.txt", "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.header("content-length"), Some("5"));
        assert!(reply.body.is_empty());
    }

    #[tokio::test]
    async fn test_should_keep_keys_with_slashes_and_spaces() {
        let store = store();
        let svc = service(&store);

        let reply = call(&svc, request("PUT", "/mybucket/a/b/my%20file.txt", "nested")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            store.object_data("mybucket", "a/b/my file.txt").as_deref(),
            Some(&b"nested"[..])
        );
    }

    #[tokio::test]
    async fn test_should_reject_bad_digest_without_storing() {
        let store = store();
        let svc = service(&store);

        let reply = call(
            &svc,
            request_with(
                "PUT",
                "/mybucket/foo.txt",
                &[("content-md5", HELLO_MD5_B64)],
                "HELLO",
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("BadDigest"));
        assert!(store.object_data("mybucket", "foo.txt").is_none());
    }

    #[tokio::test]
    async fn test_should_reject_malformed_content_md5() {
        let store = store();
        let reply = call(
            &service(&store),
            request_with(
                "PUT",
                "/mybucket/foo.txt",
                &[("content-md5", "not-base64!")],
                "hello",
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("InvalidDigest"));
    }

    #[tokio::test]
    async fn test_should_reject_content_sha256_mismatch() {
        let store = store();
        let reply = call(
            &service(&store),
            request_with(
                "PUT",
                "/mybucket/foo.txt",
                &[(
                    "x-amz-content-sha256",
                    "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
                )],
                "HELLO",
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            reply.xml_value("Code").as_deref(),
            Some("XAmzContentSHA256Mismatch")
        );
        assert!(store.object_data("mybucket", "foo.txt").is_none());
    }

    #[tokio::test]
    async fn test_should_require_content_length() {
        let store = store();
        let mut req = request("PUT", "/mybucket/foo.txt", "hello");
        req.headers_mut().remove(CONTENT_LENGTH);

        let reply = call(&service(&store), req).await;
        assert_eq!(reply.status, StatusCode::LENGTH_REQUIRED);
        assert_eq!(
            reply.xml_value("Code").as_deref(),
            Some("MissingContentLength")
        );
    }

    #[tokio::test]
    async fn test_should_report_missing_key_with_request_id() {
        let store = store();
        let reply = call(&service(&store), request("GET", "/mybucket/missing.txt", "")).await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.header("content-type"), Some("application/xml"));
        assert_eq!(reply.xml_value("Code").as_deref(), Some("NoSuchKey"));
        assert_eq!(
            reply.xml_value("Resource").as_deref(),
            Some("/mybucket/missing.txt")
        );
        let request_id = reply.header("x-amz-request-id").map(str::to_owned);
        assert!(request_id.is_some());
        assert_eq!(reply.xml_value("RequestId"), request_id);
    }

    #[tokio::test]
    async fn test_should_report_missing_bucket() {
        let store = Arc::new(MemoryStore::new());
        let reply = call(&service(&store), request("PUT", "/ghost/file.txt", "data")).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.xml_value("Code").as_deref(), Some("NoSuchBucket"));
    }

    #[tokio::test]
    async fn test_should_delete_object() {
        let store = store();
        let svc = service(&store);
        call(&svc, request("PUT", "/mybucket/foo.txt", "hello")).await;

        let reply = call(&svc, request("DELETE", "/mybucket/foo.txt", "")).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert!(reply.header("x-amz-delete-marker").is_none());
        assert!(store.object_data("mybucket", "foo.txt").is_none());
    }

    #[tokio::test]
    async fn test_should_hide_object_behind_delete_marker() {
        let store = store();
        let svc = service(&store);
        call(
            &svc,
            request(
                "PUT",
                "/mybucket?versioning",
                "<VersioningConfiguration><Status>Enabled</Status></VersioningConfiguration>",
            ),
        )
        .await;

        let put = call(&svc, request("PUT", "/mybucket/foo.txt", "hello")).await;
        let first_version = put.header("x-amz-version-id").map(str::to_owned);
        assert!(first_version.is_some());

        let delete = call(&svc, request("DELETE", "/mybucket/foo.txt", "")).await;
        assert_eq!(delete.status, StatusCode::NO_CONTENT);
        assert_eq!(delete.header("x-amz-delete-marker"), Some("true"));
        let marker_version = delete.header("x-amz-version-id").map(str::to_owned);
        assert!(marker_version.is_some());
        assert_ne!(marker_version, first_version);

        let reply = call(&svc, request("GET", "/mybucket/foo.txt", "")).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.header("x-amz-delete-marker"), Some("true"));
        assert_eq!(reply.xml_value("Code").as_deref(), Some("NoSuchKey"));

        let uri = format!(
            "/mybucket/foo.txt?versionId={}",
            first_version.unwrap_or_default()
        );
        let reply = call(&svc, request("GET", &uri, "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.text(), "hello");
    }
}
