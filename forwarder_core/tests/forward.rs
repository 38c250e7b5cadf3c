use std::sync::Arc;
use std::time::Duration;

use forwarder_core::{DispatchOptions, Dispatcher, EndpointConfig, ForwardError, Timeouts};
use rstest::rstest;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PATH: &str = "/api/chat/results";

async fn collector(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

/// `send` blocks, so run it off the async runtime driving the mock server.
async fn send_blocking(config: EndpointConfig, payload: Value) -> bool {
    tokio::task::spawn_blocking(move || forwarder_core::send(&config, &payload))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_200_without_token_forwards_body_and_no_authorization() {
    let server = collector(200).await;
    let config = EndpointConfig::new(server.uri(), RESULTS_PATH).with_auth_token("");

    assert!(send_blocking(config, json!({"ok": true})).await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert_eq!(String::from_utf8_lossy(&request.body), r#"{"ok":true}"#);
    assert!(request.headers.get("authorization").is_none());
    assert_eq!(
        request.headers.get("content-type").unwrap().to_str().unwrap(),
        "application/json"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESULTS_PATH))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = EndpointConfig::new(server.uri(), RESULTS_PATH).with_auth_token("s3cret");
    assert!(send_blocking(config, json!({"score": 0.93, "tags": ["a", "b"]})).await);

    let requests = server.received_requests().await.unwrap();
    let values: Vec<_> = requests[0].headers.get_all("authorization").iter().collect();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].to_str().unwrap(), "Bearer s3cret");
}

#[rstest]
#[case(201)]
#[case(204)]
#[case(404)]
#[case(500)]
#[tokio::test(flavor = "multi_thread")]
async fn test_non_200_status_is_false(#[case] status: u16) {
    let server = collector(status).await;
    let config = EndpointConfig::new(server.uri(), RESULTS_PATH);

    assert!(!send_blocking(config, json!({"ok": true})).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_try_send_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("collector down"))
        .mount(&server)
        .await;

    let config = EndpointConfig::new(server.uri(), RESULTS_PATH);
    let result = tokio::task::spawn_blocking(move || {
        forwarder_core::try_send(&config, &json!({"ok": true}))
    })
    .await
    .unwrap();

    let err = result.unwrap_err();
    assert_eq!(err.status(), Some(500));
    match err {
        ForwardError::Status { body, .. } => assert_eq!(body, "collector down"),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_global_timeout_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = EndpointConfig::new(server.uri(), RESULTS_PATH).with_timeouts(Timeouts {
        global: Duration::from_millis(300),
        ..Default::default()
    });

    let (sent, result, elapsed) = tokio::task::spawn_blocking(move || {
        let sent = forwarder_core::send(&config, &json!({"ok": true}));
        let started = std::time::Instant::now();
        let result = forwarder_core::try_send(&config, &json!({"ok": true}));
        (sent, result, started.elapsed())
    })
    .await
    .unwrap();

    assert!(!sent);
    assert!(matches!(result, Err(ForwardError::Transport(_))));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_path_is_false() {
    let server = collector(200).await;
    let config = EndpointConfig::new(server.uri(), "/api/other");

    // No mock matches, wiremock answers 404.
    assert!(!send_blocking(config, json!({"ok": true})).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatcher_delivers_in_order_after_flush() {
    let server = collector(200).await;
    let config = EndpointConfig::new(server.uri(), RESULTS_PATH).with_auth_token("t0k");

    let stats = tokio::task::spawn_blocking(move || {
        let options = DispatchOptions {
            before_send: Some(Arc::new(|mut payload: Value| -> Option<Value> {
                if payload["skip"] == json!(true) {
                    return None;
                }
                payload["forwarded"] = json!(true);
                Some(payload)
            })),
            flush_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let dispatcher = Dispatcher::start(&config, options).unwrap();

        assert!(dispatcher.submit(&json!({"seq": 1})));
        assert!(!dispatcher.submit(&json!({"seq": 2, "skip": true})));
        assert!(dispatcher.submit(&json!({"seq": 3})));
        assert!(dispatcher.flush());
        dispatcher.stats()
    })
    .await
    .unwrap();

    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.dropped, 1);

    let requests = server.received_requests().await.unwrap();
    let bodies: Vec<Value> = requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(
        bodies,
        vec![
            json!({"seq": 1, "forwarded": true}),
            json!({"seq": 3, "forwarded": true}),
        ]
    );
    for request in &requests {
        assert_eq!(
            request.headers.get("authorization").unwrap().to_str().unwrap(),
            "Bearer t0k"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatcher_counts_rejected_deliveries() {
    let server = collector(503).await;
    let config = EndpointConfig::new(server.uri(), RESULTS_PATH);

    let stats = tokio::task::spawn_blocking(move || {
        let options = DispatchOptions {
            flush_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let dispatcher = Dispatcher::start(&config, options).unwrap();
        dispatcher.submit(&json!({"ok": true}));
        dispatcher.flush();
        dispatcher.stats()
    })
    .await
    .unwrap();

    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 1);
}
