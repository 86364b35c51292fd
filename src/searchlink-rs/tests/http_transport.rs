use httpmock::prelude::*;
use searchlink::{
    build_request, format_duration, Client, ClientError, Config, Context, HeaderMap, Request, Response,
    CancellationToken, TransportError,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn client_for(server: &MockServer) -> Client {
    Client::new(&Config {
        addresses: vec![server.base_url()],
        ..Config::default()
    })
    .unwrap()
}

fn get(path: &str) -> Request {
    build_request(http::Method::GET, path, None, &HashMap::new(), HeaderMap::new()).unwrap()
}

/// One-shot server that sends the status line, headers and part of the
/// promised body, then keeps the connection open without sending more
async fn stalling_server(status_line: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{{\"status\":"
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    addr
}

fn stalling_client(addr: SocketAddr) -> Client {
    Client::new(&Config {
        addresses: vec![format!("http://{addr}")],
        request_timeout_secs: 10,
        ..Config::default()
    })
    .unwrap()
}

#[derive(Debug, Default, Deserialize)]
struct ClusterHealth {
    status: String,
    number_of_nodes: u32,
}

#[tokio::test]
async fn test_success_decodes_target() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET).path("/_cluster/health");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"status": "green", "number_of_nodes": 3}));
    });

    let client = client_for(&server);
    let mut health = ClusterHealth::default();
    let mut response = client
        .execute(&Context::background(), get("/_cluster/health"), Some(&mut health))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(health.status, "green");
    assert_eq!(health.number_of_nodes, 3);
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.status(), "200 OK");
    assert_eq!(response.headers().get("content-type").unwrap(), "application/json");

    // body stays readable after the transport decoded it
    let body = response.body().unwrap().read_all().await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "green");
}

#[tokio::test]
async fn test_request_parts_reach_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/logs/_search")
            .query_param("size", "10")
            .query_param("timeout", "1500ms")
            .query_param("pretty", "")
            .header("content-type", "application/json")
            .header("x-opaque-id", "search-42")
            .json_body(json!({"query": {"match": {"level": "error"}}}));
        then.status(200).json_body(json!({"hits": {"total": {"value": 0}, "hits": []}}));
    });

    let params = HashMap::from([
        ("size".to_string(), "10".to_string()),
        ("timeout".to_string(), format_duration(Duration::from_millis(1500))),
    ]);
    let mut headers = HeaderMap::new();
    headers.insert("x-opaque-id", "search-42".parse().unwrap());
    headers.insert("content-type", "text/plain".parse().unwrap());
    let body = serde_json::to_vec(&json!({"query": {"match": {"level": "error"}}})).unwrap();
    let request = build_request(
        http::Method::POST,
        "/logs/_search?pretty",
        Some(body.into()),
        &params,
        headers,
    )
    .unwrap();

    let client = client_for(&server);
    client.send(&Context::background(), request).await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_not_found_returns_api_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/missing/_doc/1");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"error":{"root_cause":[{"type":"index_not_found_exception","reason":"no such index [missing]"}],"type":"index_not_found_exception","reason":"no such index [missing]","index":"missing"},"status":404}"#);
    });

    let client = client_for(&server);
    let err = client
        .send(&Context::background(), get("/missing/_doc/1"))
        .await
        .unwrap_err();

    let api_error = err.api_error().expect("expected API error");
    assert_eq!(api_error.status, Some(404));
    assert_eq!(api_error.error_type(), Some("index_not_found_exception"));
    assert_eq!(api_error.reason(), Some("no such index [missing]"));
}

#[tokio::test]
async fn test_non_json_error_body() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/_nodes");
        then.status(502).body("<html>Bad Gateway</html>");
    });

    let client = client_for(&server);
    let err = client.send(&Context::background(), get("/_nodes")).await.unwrap_err();

    assert!(matches!(err, ClientError::UnparseableBody { status: 502, .. }));
}

#[tokio::test]
async fn test_empty_error_body_is_unparseable() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::DELETE).path("/logs");
        then.status(500);
    });

    let client = client_for(&server);
    let request = build_request(http::Method::DELETE, "/logs", None, &HashMap::new(), HeaderMap::new()).unwrap();
    let err = client.send(&Context::background(), request).await.unwrap_err();

    assert!(matches!(err, ClientError::UnparseableBody { status: 500, .. }));
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/_cat/health")
            .header("authorization", "Basic YWRtaW46YWRtaW4=");
        then.status(200).body("green\n");
    });

    let client = Client::new(&Config {
        addresses: vec![server.base_url()],
        username: Some("admin".to_string()),
        password: Some("admin".to_string()),
        ..Config::default()
    })
    .unwrap();
    client.send(&Context::background(), get("/_cat/health")).await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_base_path_prefix() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET).path("/proxy/_cat/indices");
        then.status(200).body("");
    });

    let client = Client::new(&Config {
        addresses: vec![server.url("/proxy")],
        ..Config::default()
    })
    .unwrap();
    client.send(&Context::background(), get("/_cat/indices")).await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_absolute_url_bypasses_base_address() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET).path("/direct");
        then.status(200).body("");
    });

    // nothing listens on the configured address
    let client = Client::new(&Config {
        addresses: vec!["http://127.0.0.1:9".to_string()],
        ..Config::default()
    })
    .unwrap();
    client
        .send(&Context::background(), get(&server.url("/direct")))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_credentials_not_sent_to_foreign_origin() {
    let server = MockServer::start();
    let leaked = server.mock(|when, then| {
        when.method(Method::GET).path("/direct").header_exists("authorization");
        then.status(500);
    });
    let direct = server.mock(|when, then| {
        when.method(Method::GET).path("/direct");
        then.status(200).body("");
    });

    let client = Client::new(&Config {
        addresses: vec!["http://127.0.0.1:9".to_string()],
        username: Some("admin".to_string()),
        password: Some("admin".to_string()),
        ..Config::default()
    })
    .unwrap();
    client
        .send(&Context::background(), get(&server.url("/direct")))
        .await
        .unwrap();

    leaked.assert_hits(0);
    direct.assert();
}

#[tokio::test]
async fn test_deadline_aborts_exchange() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/slow");
        then.status(200).delay(Duration::from_secs(2)).body("{}");
    });

    let client = client_for(&server);
    let ctx = Context::with_timeout(Duration::from_millis(100));
    let err = client.send(&ctx, get("/slow")).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::DeadlineExceeded)));
}

#[tokio::test]
async fn test_deadline_while_decoding_stalled_body() {
    let addr = stalling_server("200 OK").await;
    let client = stalling_client(addr);
    let ctx = Context::with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let mut health = ClusterHealth::default();
    let err = client
        .execute(&ctx, get("/_cluster/health"), Some(&mut health))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::DeadlineExceeded)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(health.status.is_empty());
}

#[tokio::test]
async fn test_deadline_while_reading_stalled_error_body() {
    let addr = stalling_server("500 Internal Server Error").await;
    let client = stalling_client(addr);
    let ctx = Context::with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = client.send(&ctx, get("/_cluster/health")).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::DeadlineExceeded)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_while_decoding_stalled_body() {
    let addr = stalling_server("200 OK").await;
    let client = stalling_client(addr);
    let token = CancellationToken::new();
    let ctx = Context::with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let started = Instant::now();
    let mut health = ClusterHealth::default();
    let err = client
        .execute(&ctx, get("/_cluster/health"), Some(&mut health))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::Cancelled)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_cancel_while_reading_stalled_error_body() {
    let addr = stalling_server("503 Service Unavailable").await;
    let client = stalling_client(addr);
    let token = CancellationToken::new();
    let ctx = Context::with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let err = client.send(&ctx, get("/_cluster/health")).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::Cancelled)), "{err:?}");
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let client = Client::new(&Config {
        addresses: vec!["http://127.0.0.1:9".to_string()],
        connect_timeout_secs: 1,
        ..Config::default()
    })
    .unwrap();

    let err = client
        .send(&Context::background(), get("/_cluster/health"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::Connection(_))));
}

#[tokio::test]
async fn test_shared_client_concurrent_calls() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET).path("/_cluster/health");
        then.status(200).json_body(json!({"status": "yellow", "number_of_nodes": 1}));
    });

    let client = client_for(&server);
    let ctx = Context::background();

    let calls = (0..4).map(|_| {
        let client = client.clone();
        let ctx = ctx.clone();
        async move {
            let mut health = ClusterHealth::default();
            client
                .execute(&ctx, get("/_cluster/health"), Some(&mut health))
                .await
                .map(|_| health.status)
        }
    });
    let results = futures::future::join_all(calls).await;

    mock.assert_hits(4);
    for result in results {
        assert_eq!(result.unwrap(), "yellow");
    }
}
