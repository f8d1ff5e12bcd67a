//! End-to-end tests: command string in, wire request and classified
//! response out, with in-memory ports.

mod support;

use std::sync::Arc;
use std::time::Duration;

use curlkit_common::MockClock;
use curlkit_core::{parse_command, CurlExecutor};
use curlkit_domain::{CurlError, ExecutionConfig};
use support::ports::{EchoTransport, MemoryFileSystem};

fn all_bytes() -> Vec<u8> {
    (0..=255u8).cycle().take(1024).collect()
}

fn executor(transport: &EchoTransport, fs: &MemoryFileSystem) -> CurlExecutor {
    let config = ExecutionConfig::default();
    CurlExecutor::new(Arc::new(transport.clone()), Arc::new(fs.clone()), config).unwrap()
}

#[tokio::test]
async fn file_data_reaches_the_wire_byte_for_byte() {
    let payload = all_bytes();
    let fs = MemoryFileSystem::default().with_file("payload.bin", &payload);

    for flag in ["-d", "--json", "--data-binary"] {
        let transport = EchoTransport::new();
        let command = format!("curl {flag} @payload.bin http://example.test/upload");

        let response = executor(&transport, &fs).execute(&command).await.unwrap();

        assert_eq!(transport.last().body.as_deref(), Some(payload.as_slice()), "{flag}");
        assert_eq!(response.binary_body(), Some(payload.as_slice()), "{flag}");
    }
}

#[tokio::test]
async fn data_raw_sends_the_at_sign_literally() {
    let fs = MemoryFileSystem::default().with_file("file", b"should not be read");
    let transport = EchoTransport::new();

    executor(&transport, &fs).execute("curl --data-raw @file http://example.test").await.unwrap();

    assert_eq!(transport.last().body.as_deref(), Some(&b"@file"[..]));
}

#[tokio::test]
async fn missing_json_file_keeps_the_literal_path() {
    let transport = EchoTransport::new();
    let fs = MemoryFileSystem::default();

    let err = executor(&transport, &fs)
        .execute("curl --json @missing.json http://example.test")
        .await
        .unwrap_err();

    assert!(err.is_pre_transmission());
    match err {
        CurlError::FileUnreadable { path, .. } => assert_eq!(path, "missing.json"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn json_fragments_concatenate_into_one_document() {
    let transport = EchoTransport::new();
    let fs = MemoryFileSystem::default();

    executor(&transport, &fs)
        .execute(r#"curl --json '{"a":1,' --json '"b":[1,2]}' http://example.test"#)
        .await
        .unwrap();

    let sent = transport.last();
    let body: serde_json::Value = serde_json::from_slice(sent.body_bytes()).unwrap();
    assert_eq!(body, serde_json::json!({"a": 1, "b": [1, 2]}));
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.headers.get("content-type"), Some("application/json"));
    assert_eq!(sent.headers.get("accept"), Some("application/json"));
}

#[tokio::test]
async fn later_header_flags_win_on_the_wire() {
    let fs = MemoryFileSystem::default();

    let transport = EchoTransport::new();
    executor(&transport, &fs)
        .execute("curl -H 'Content-Type: text/plain' --json '{}' http://example.test")
        .await
        .unwrap();
    assert_eq!(transport.last().headers.get("Content-Type"), Some("application/json"));

    let transport = EchoTransport::new();
    executor(&transport, &fs)
        .execute("curl --json '{}' -H 'Content-Type: text/plain' -X PUT http://example.test")
        .await
        .unwrap();
    let sent = transport.last();
    assert_eq!(sent.headers.get("Content-Type"), Some("text/plain"));
    assert_eq!(sent.headers.get("Accept"), Some("application/json"));
    assert_eq!(sent.method, "PUT");
}

#[tokio::test]
async fn multiline_commands_execute_like_single_lines() {
    let transport = EchoTransport::new();
    let fs = MemoryFileSystem::default();

    executor(&transport, &fs)
        .execute("curl -X DELETE \\\n  -H 'X-Trace: 1' \\\n  http://example.test/items/7")
        .await
        .unwrap();

    let sent = transport.last();
    assert_eq!(sent.method, "DELETE");
    assert_eq!(sent.url.as_str(), "http://example.test/items/7");
    assert_eq!(sent.headers.get("x-trace"), Some("1"));
}

#[tokio::test]
async fn classification_follows_the_response_content_type() {
    let fs = MemoryFileSystem::default();
    let xlsx = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

    let cases = [
        (Some(xlsx), false, true),
        (Some("application/soap+xml"), false, false),
        (Some("application/json"), false, false),
        (Some("application/json"), true, true),
        (None, false, true),
    ];
    for (content_type, force_binary, expect_binary) in cases {
        let headers: Vec<(&str, &str)> =
            content_type.map(|ct| ("Content-Type", ct)).into_iter().collect();
        let transport = EchoTransport::replying(200, &headers, b"<doc/>");
        let mut options = parse_command("curl http://example.test").unwrap();
        options.force_binary = force_binary;

        let response = executor(&transport, &fs).execute_options(&options).await.unwrap();

        assert_eq!(response.is_binary(), expect_binary, "{content_type:?} force={force_binary}");
        assert_eq!(response.body.as_bytes(), b"<doc/>");
    }
}

#[tokio::test]
async fn cloned_options_execute_independently() {
    let transport = EchoTransport::new();
    let fs = MemoryFileSystem::default();
    let executor = Arc::new(executor(&transport, &fs));
    let base = parse_command("curl -H 'X-Base: 1' http://example.test/").unwrap();

    let runs = (0..8).map(|n| {
        let executor = Arc::clone(&executor);
        let mut options = base.clone();
        options.headers.set("X-Run", n.to_string());
        tokio::spawn(async move { executor.execute_options(&options).await })
    });
    for run in runs {
        run.await.unwrap().unwrap();
    }

    assert_eq!(base.headers.get("X-Run"), None);
    let mut seen: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| r.headers.get("x-run").unwrap_or_default().to_string())
        .collect();
    seen.sort();
    assert_eq!(seen, (0..8).map(|n| n.to_string()).collect::<Vec<_>>());
}

#[tokio::test]
async fn signed_requests_carry_provider_headers() {
    let transport = EchoTransport::new();
    let fs = MemoryFileSystem::default().with_file("object.bin", &all_bytes());
    let executor = CurlExecutor::builder(Arc::new(transport.clone()), Arc::new(fs))
        .clock(MockClock::at_epoch_offset(Duration::from_secs(1_700_000_000)))
        .build()
        .unwrap();

    executor
        .execute(
            "curl --aws-sigv4 'gcp:goog:us-central1:storage' -u ACCESS:SECRET \
             --data-binary @object.bin https://storage.googleapis.com/bucket/object",
        )
        .await
        .unwrap();

    let sent = transport.last();
    let auth = sent.headers.get("authorization").unwrap();
    assert!(auth.starts_with(
        "GCP4-HMAC-SHA256 Credential=ACCESS/20231114/us-central1/storage/gcp4_request"
    ));
    assert_eq!(sent.headers.get("x-goog-date"), Some("20231114T221320Z"));
    assert!(sent.headers.contains("x-goog-content-sha256"));
    assert_eq!(sent.body_bytes(), all_bytes().as_slice());
}
