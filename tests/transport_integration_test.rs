use deepl_translator::{
    AttemptRequest, AttemptResult, OutputSink, RequestBody, ReqwestTransport, Transport,
};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn attempt(url: &str, timeout: Duration) -> AttemptResult {
    let transport = ReqwestTransport::new(None).unwrap();
    let headers = HeaderMap::new();
    let body = RequestBody::Empty;
    let request = AttemptRequest {
        method: &Method::GET,
        url,
        timeout,
        headers: &headers,
        body: &body,
    };
    transport.attempt(&request, None).await
}

fn assert_retryable(result: AttemptResult, expected: bool) {
    match result {
        AttemptResult::ConnectionFailure { retryable, message } => {
            assert_eq!(retryable, expected, "unexpected classification for: {}", message)
        }
        other => panic!("expected a connection failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refused_connection_is_retryable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = attempt(&format!("http://{}/v2/usage", addr), Duration::from_secs(5)).await;
    assert_retryable(result, true);
}

#[tokio::test]
async fn test_silent_peer_times_out_retryable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });

    let result = attempt(&format!("http://{}/v2/usage", addr), Duration::from_millis(200)).await;
    assert_retryable(result, true);
    server.abort();
}

#[tokio::test]
async fn test_connection_closed_before_response_is_retryable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // read the whole request head, then hang up without answering
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        drop(socket);
    });

    let result = attempt(&format!("http://{}/v2/usage", addr), Duration::from_secs(5)).await;
    assert_retryable(result, true);
}

#[tokio::test]
async fn test_malformed_urls_are_fatal() {
    assert_retryable(attempt("not a url", Duration::from_secs(1)).await, false);
    assert_retryable(attempt("ftp://api.test/v2/usage", Duration::from_secs(1)).await, false);
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/usage"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let result = attempt(&format!("{}/v2/usage", mock_server.uri()), Duration::from_secs(5)).await;
    assert_eq!(
        result,
        AttemptResult::Success {
            status: 500,
            body: b"Internal Server Error".to_vec(),
        }
    );
}

#[tokio::test]
async fn test_sink_receives_only_successful_bodies() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"translated".to_vec()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&mock_server)
        .await;

    let transport = ReqwestTransport::new(None).unwrap();
    let headers = HeaderMap::new();
    let body = RequestBody::Empty;

    let ok_url = format!("{}/ok", mock_server.uri());
    let mut sink = b"stale".to_vec();
    let request = AttemptRequest {
        method: &Method::GET,
        url: &ok_url,
        timeout: Duration::from_secs(5),
        headers: &headers,
        body: &body,
    };
    let result = transport.attempt(&request, Some(&mut sink as &mut dyn OutputSink)).await;
    assert_eq!(result, AttemptResult::Success { status: 200, body: Vec::new() });
    assert_eq!(sink, b"translated");

    let busy_url = format!("{}/busy", mock_server.uri());
    let mut sink: Vec<u8> = Vec::new();
    let request = AttemptRequest {
        url: &busy_url,
        ..request
    };
    let result = transport.attempt(&request, Some(&mut sink as &mut dyn OutputSink)).await;
    assert_eq!(result, AttemptResult::Success { status: 503, body: b"busy".to_vec() });
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_multipart_upload_streams_file_contents() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/document"))
        .and(body_string_contains("name=\"target_lang\""))
        .and(body_string_contains("filename=\"large.txt\""))
        .and(body_string_contains("tail-marker"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // larger than one read chunk so the body spans several stream items
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("large.txt");
    let mut contents = "lorem ipsum ".repeat(20_000);
    contents.push_str("tail-marker");
    std::fs::write(&file, &contents).unwrap();

    let transport = ReqwestTransport::new(None).unwrap();
    let headers = HeaderMap::new();
    let body = RequestBody::Multipart {
        params: vec![("target_lang".to_string(), "de".to_string())],
        file,
    };
    let url = format!("{}/v2/document", mock_server.uri());
    let request = AttemptRequest {
        method: &Method::POST,
        url: &url,
        timeout: Duration::from_secs(5),
        headers: &headers,
        body: &body,
    };

    let result = transport.attempt(&request, None).await;
    assert_eq!(result, AttemptResult::Success { status: 200, body: b"{}".to_vec() });

    let received = mock_server.received_requests().await.unwrap();
    assert!(received[0].body.len() > contents.len());
}

#[tokio::test]
async fn test_missing_upload_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ReqwestTransport::new(None).unwrap();
    let headers = HeaderMap::new();
    let body = RequestBody::Multipart {
        params: Vec::new(),
        file: dir.path().join("gone.txt"),
    };
    let request = AttemptRequest {
        method: &Method::POST,
        url: "http://127.0.0.1:9/v2/document",
        timeout: Duration::from_secs(1),
        headers: &headers,
        body: &body,
    };

    let result = transport.attempt(&request, None).await;
    assert_retryable(result, false);
}
