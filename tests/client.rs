mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{builder, client, error_body, success_body, write_image, SECRET_ID, SECRET_KEY};
use hunyuan_video::signing::SignedRequest;
use hunyuan_video::{
    ClientBuilder, Credentials, ErrorCategory, HunyuanError, UpstreamErrorKind,
    FAILED_ITEM_MARKER,
};
use serde_json::Value;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn analyze_image_sends_a_correctly_signed_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-tc-action", "ChatCompletions"))
        .and(header("x-tc-version", "2023-09-01"))
        .and(header("x-tc-region", "ap-guangzhou"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(header_exists("x-tc-timestamp"))
        .and(header_exists("authorization"))
        .and(body_string_contains("data:image/png;base64,"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success_body("a red bicycle", 120, 15)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "bike.png");
    let (client, _) = client(&server);

    let result = client.analyze_image(&image, "What is this?").await.unwrap();

    assert_eq!(result.content, "a red bicycle");
    assert_eq!(result.usage.prompt_tokens, 120);
    assert_eq!(result.usage.total_tokens, 135);
    assert_eq!(result.request_id.as_deref(), Some("req-ok"));

    // Recompute the signature over exactly what was sent.
    let requests = server.received_requests().await.unwrap();
    let req = &requests[0];
    let timestamp: i64 = req.headers["x-tc-timestamp"].to_str().unwrap().parse().unwrap();
    let host = server.address().to_string();
    let expected = SignedRequest::new(
        &host,
        "ChatCompletions",
        "2023-09-01",
        timestamp,
        req.body.clone(),
    )
    .authorization(SECRET_ID, SECRET_KEY, "hunyuan");
    assert_eq!(req.headers["authorization"].to_str().unwrap(), expected);
    assert!(expected.starts_with(&format!("TC3-HMAC-SHA256 Credential={SECRET_ID}/")));

    let body: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body["Model"], "hunyuan-vision");
    let parts = body["Messages"][0]["Contents"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["Type"], "image_url");
    assert_eq!(parts[1]["Type"], "text");
    assert_eq!(parts[1]["Text"], "What is this?");
}

#[tokio::test]
async fn generate_text_uses_flat_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success_body("Scene 1: ...", 40, 300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let result = client
        .generate_text("Write a script.", "hunyuan-standard")
        .await
        .unwrap();

    assert_eq!(result.content, "Scene 1: ...");
    let bodies = received_bodies(&server).await;
    assert_eq!(bodies[0]["Model"], "hunyuan-standard");
    assert_eq!(bodies[0]["Messages"][0]["Role"], "user");
    assert_eq!(bodies[0]["Messages"][0]["Content"], "Write a script.");
    assert!(bodies[0]["Messages"][0].get("Contents").is_none());
}

#[tokio::test]
async fn single_request_caps_images_and_reports_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("six frames", 900, 50)))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let images: Vec<_> = (0..6)
        .map(|i| write_image(dir.path(), &format!("f{i}.jpg")))
        .collect();
    let (client, _) = client(&server);

    let result = client
        .analyze_images_in_single_request(&images, "Describe the sequence.")
        .await
        .unwrap();

    assert_eq!(result.skipped_images, images[4..].to_vec());
    let bodies = received_bodies(&server).await;
    let parts = bodies[0]["Messages"][0]["Contents"].as_array().unwrap();
    let image_parts = parts.iter().filter(|p| p["Type"] == "image_url").count();
    assert_eq!(image_parts, 4);
    assert_eq!(parts.last().unwrap()["Type"], "text");
}

#[tokio::test]
async fn batch_isolates_a_missing_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok", 100, 10)))
        .expect(2)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write_image(dir.path(), "a.jpg"),
        dir.path().join("missing.jpg"),
        write_image(dir.path(), "c.jpg"),
    ];
    let (client, pacer) = client(&server);

    let batch = client.analyze_image_batch(&paths, "Describe.").await.unwrap();

    assert_eq!(batch.len(), 3);
    assert!(!batch.items[0].is_failed());
    assert!(batch.items[1].is_failed());
    assert!(!batch.items[2].is_failed());
    assert!(batch.items[1].result.content.starts_with(FAILED_ITEM_MARKER));
    assert_eq!(batch.items[1].result.usage.total_tokens, 0);
    assert_eq!(batch.items[1].path, paths[1]);
    assert_eq!(batch.items[0].result.content, "ok");
    assert_eq!(batch.total_usage().total_tokens, 220);
    assert_eq!(batch.failed().count(), 1);

    let pauses = pacer.pauses.lock().unwrap().clone();
    assert_eq!(pauses, vec![Duration::from_secs(1), Duration::from_secs(1)]);
}

#[tokio::test]
async fn upstream_error_does_not_abort_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(error_body("RequestLimitExceeded", "too many requests")),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("fine", 10, 1)))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![write_image(dir.path(), "a.jpg"), write_image(dir.path(), "b.jpg")];
    let (client, _) = client(&server);

    let batch = client.analyze_image_batch(&paths, "Describe.").await.unwrap();

    assert!(batch.items[0].is_failed());
    assert!(batch.items[0]
        .error
        .as_deref()
        .unwrap()
        .contains("RequestLimitExceeded"));
    assert_eq!(batch.items[1].result.content, "fine");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn upstream_error_codes_are_classified() {
    let server = MockServer::start().await;
    let (client, _) = client(&server);
    let cases = [
        ("FailedOperation.ServiceNotActivated", UpstreamErrorKind::ServiceNotActivated),
        ("AuthFailure.SignatureFailure", UpstreamErrorKind::AuthFailure),
        ("RequestLimitExceeded", UpstreamErrorKind::RateLimited),
        ("InvalidParameter", UpstreamErrorKind::InvalidParameter),
        ("ResourceNotFound", UpstreamErrorKind::ResourceNotFound),
        ("InternalError", UpstreamErrorKind::Unknown),
    ];

    for (code, kind) in cases {
        server.reset().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(error_body(code, "nope")))
            .mount(&server)
            .await;

        let err = client.generate_text("hello", "hunyuan-lite").await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::UpstreamApplication);
        match err {
            HunyuanError::Upstream(e) => {
                assert_eq!(e.kind, kind, "code {code}");
                assert_eq!(e.code, code);
                assert_eq!(e.message, "nope");
                assert_eq!(e.request_id.as_deref(), Some("req-err"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[tokio::test]
async fn upstream_messages_never_leak_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(error_body(
            "AuthFailure.SecretIdNotFound",
            &format!("SecretId {SECRET_ID} (key {SECRET_KEY}) not found"),
        )))
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let err = client.generate_text("hello", "hunyuan-lite").await.unwrap_err();
    let text = err.to_string();
    let report = err.report(&[
        ("prompt", "hello"),
        ("secret_id", SECRET_ID),
        ("secret_key", SECRET_KEY),
    ]);

    for output in [&text, &report] {
        assert!(!output.contains(SECRET_KEY), "{output}");
        assert!(!output.contains(SECRET_ID), "{output}");
        assert!(output.contains("****abcd"), "{output}");
    }
    assert!(report.contains("Suggestion:"));
}

#[tokio::test]
async fn http_errors_are_transport_errors_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let err = client.generate_text("hello", "hunyuan-lite").await.unwrap_err();

    match &err {
        HunyuanError::Api { status_code, message } => {
            assert_eq!(*status_code, 503);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Transport);
}

#[tokio::test]
async fn unexpected_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let err = client.generate_text("hello", "hunyuan-lite").await.unwrap_err();
    assert!(matches!(err, HunyuanError::InvalidResponse(_)));
}

#[tokio::test]
async fn oversized_image_fails_before_network() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("big.jpg");
    std::fs::write(&image, vec![0u8; 64]).unwrap();
    let pacer = Arc::new(common::RecordingPacer::default());
    let client = builder(&server, pacer).max_image_bytes(32).build().unwrap();

    let err = client.analyze_image(&image, "Describe.").await.unwrap_err();

    assert!(matches!(
        err,
        HunyuanError::SizeLimitExceeded { size: 64, limit: 32, .. }
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn connection_failure_is_transport_error() {
    let client = ClientBuilder::new()
        .credentials(Credentials::new(SECRET_ID, SECRET_KEY).with_endpoint("http://127.0.0.1:1"))
        .use_environment(false)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = client.generate_text("hello", "hunyuan-lite").await.unwrap_err();

    assert!(matches!(err, HunyuanError::Http(_)));
    assert_eq!(err.category(), ErrorCategory::Transport);
}

#[tokio::test]
async fn invalid_input_is_rejected_without_requests() {
    let server = MockServer::start().await;
    let (client, _) = client(&server);
    let none: Vec<std::path::PathBuf> = Vec::new();

    assert!(matches!(
        client.analyze_image_batch(&none, "Describe.").await,
        Err(HunyuanError::InvalidInput(_))
    ));
    assert!(matches!(
        client.analyze_images_in_single_request(&["a.jpg"], "  ").await,
        Err(HunyuanError::InvalidInput(_))
    ));
    assert!(matches!(
        client.generate_text("hello", "").await,
        Err(HunyuanError::InvalidInput(_))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn swapping_in_empty_credentials_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok", 1, 1)))
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    for (id, key) in [("", ""), (SECRET_ID, ""), ("", SECRET_KEY), ("  ", SECRET_KEY)] {
        let err = client
            .with_credentials(Credentials::new(id, key).with_endpoint(server.uri()))
            .err()
            .unwrap();
        assert!(matches!(err, HunyuanError::InvalidInput(_)), "{id:?}/{key:?}");
        assert_eq!(err.category(), ErrorCategory::InputValidation);
    }
    assert!(server.received_requests().await.unwrap().is_empty());

    // The original client is unaffected.
    client.generate_text("hello", "hunyuan-lite").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
