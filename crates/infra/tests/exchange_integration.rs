//! Commands executed end to end against a local HTTP server.

use std::time::Duration;

use curlkit_domain::{CurlError, ExecutionConfig};
use curlkit_infra::default_executor_with;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn all_bytes() -> Vec<u8> {
    (0..=255u8).cycle().take(4096).collect()
}

async fn run(command: &str) -> Result<curlkit_domain::CurlResponse, CurlError> {
    default_executor_with(ExecutionConfig::default()).unwrap().execute(command).await
}

async fn echo_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path("/echo"))
        .respond_with(|req: &Request| {
            ResponseTemplate::new(200).set_body_raw(req.body.clone(), "application/octet-stream")
        })
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn binary_file_survives_the_round_trip() {
    let server = echo_server().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("payload.bin");
    std::fs::write(&file, all_bytes()).unwrap();

    for flag in ["--data-binary", "-d"] {
        let command = format!("curl {flag} '@{}' {}/echo", file.display(), server.uri());

        let response = run(&command).await.unwrap();

        assert!(response.is_binary(), "{flag}");
        assert_eq!(response.binary_body(), Some(all_bytes().as_slice()), "{flag}");
    }
}

#[tokio::test]
async fn data_raw_is_sent_literally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_bytes(b"@file".to_vec()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = run(&format!("curl --data-raw @file {}", server.uri())).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn unreadable_file_fails_before_any_request() {
    let server = MockServer::start().await;

    let err = run(&format!("curl --json @missing.json {}", server.uri())).await.unwrap_err();

    assert_eq!(err.curl_code(), 26);
    assert!(matches!(err, CurlError::FileUnreadable { ref path, .. } if path == "missing.json"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn json_responses_are_classified_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"ok":true}"#, "application/json; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let response = run(&format!("curl -sS {}", server.uri())).await.unwrap();

    assert_eq!(response.text_body(), Some(r#"{"ok":true}"#));
    assert_eq!(response.content_type(), Some("application/json; charset=utf-8"));
}

#[tokio::test]
async fn get_flag_moves_data_into_the_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response =
        run(&format!("curl -G -d q=rust -d page=2 {}/search", server.uri())).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn retries_transient_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .mount(&server)
        .await;

    let response =
        run(&format!("curl --retry 3 --retry-delay 0.01 {}", server.uri())).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn fail_flag_turns_error_statuses_into_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let plain = run(&server.uri()).await.unwrap();
    assert_eq!(plain.status, 404);

    let err = run(&format!("curl -f {}", server.uri())).await.unwrap_err();
    assert_eq!(err.curl_code(), 22);
    assert!(matches!(err, CurlError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn output_flag_writes_the_body_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(all_bytes(), "image/png"))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("image.png");

    run(&format!("curl -o '{}' {}", out.display(), server.uri())).await.unwrap();

    assert_eq!(std::fs::read(&out).unwrap(), all_bytes());
}

#[tokio::test]
async fn redirects_are_followed_with_location_flag() {
    let server = MockServer::start().await;
    Mock::given(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/end"))
        .mount(&server)
        .await;
    Mock::given(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("arrived"))
        .mount(&server)
        .await;

    let stopped = run(&format!("curl {}/start", server.uri())).await.unwrap();
    assert_eq!(stopped.status, 302);

    let followed = run(&format!("curl -L {}/start", server.uri())).await.unwrap();
    assert_eq!(followed.status, 200);
    assert!(followed.url.ends_with("/end"));

    let err = run(&format!("curl -L --max-redirs 0 {}/start", server.uri())).await.unwrap_err();
    assert_eq!(err.curl_code(), 47);
}

#[tokio::test]
async fn refused_connection_reports_code_seven() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = run(&format!("curl http://127.0.0.1:{port}/")).await.unwrap_err();

    assert_eq!(err.curl_code(), 7);
    assert!(!err.is_pre_transmission());
    assert!(matches!(err, CurlError::ConnectionFailed { port: p, .. } if p == port));
}

#[tokio::test]
async fn max_time_bounds_a_slow_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = run(&format!("curl -m 0.2 {}", server.uri())).await.unwrap_err();

    assert_eq!(err.curl_code(), 28);
}

#[tokio::test]
async fn zero_max_time_means_no_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let response =
        run(&format!("curl -m 0 --connect-timeout 0 {}", server.uri())).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn emptied_content_type_is_not_defaulted() {
    let server = echo_server().await;

    run(&format!("curl -H 'Content-Type:' -d a=1 {}/echo", server.uri())).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("content-type"));
    assert_eq!(received[0].body, b"a=1");
}

#[tokio::test]
async fn scheme_less_url_may_carry_a_url_in_its_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("next", "http://x"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let authority = server.uri().trim_start_matches("http://").to_string();

    let response = run(&format!("curl '{authority}/?next=http://x'")).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn signed_requests_reach_the_server_with_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("x-amz-content-sha256", sha256_of_payload().as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    run(&format!(
        "curl -X PUT --aws-sigv4 'aws:amz:eu-west-1:s3' -u AKID:SECRET -d payload {}/bucket/key",
        server.uri()
    ))
    .await
    .unwrap();

    let received = server.received_requests().await.unwrap();
    let auth = received[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"), "{auth}");
    assert!(auth.contains("/eu-west-1/s3/aws4_request"), "{auth}");
    assert!(received[0].headers.contains_key("x-amz-date"));
}

// sha256("payload")
fn sha256_of_payload() -> String {
    "239f59ed55e737c77147cf55ad0c1b030b6d7ee748a7426952f9b852d5a935e5".to_string()
}
