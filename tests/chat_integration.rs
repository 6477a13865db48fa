//! Integration tests for the exchange pipeline end to end.
//!
//! A wiremock server stands in for the upstream completion API. The real
//! proxy router is bound to an ephemeral port and driven through
//! `ProxyTransport`, so the whole path runs without API keys or network access.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use grok_chat::client::{ChatTransport, DirectTransport, ProxyTransport};
use grok_chat::config::Config;
use grok_chat::conversation::{Content, ContentPart, Role, Turn};
use grok_chat::exchange::{Exchange, ExchangeOutcome, UserInput};
use grok_chat::gateway::GatewayState;
use grok_chat::media::ImageLimits;
use grok_chat::providers::resolve_provider;
use grok_chat::ExchangeError;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_config(upstream_url: &str) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = upstream_url.to_string();
    config.upstream.api_key = Some("test-key".to_string());
    config
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "system_fingerprint": "fp_test"
    })
}

/// Start the proxy with its upstream pointed at the mock server.
async fn start_proxy(config: Config) -> (String, broadcast::Sender<()>) {
    let provider = resolve_provider(&config.upstream).unwrap();
    let state = GatewayState::new(config, provider);
    let app = grok_chat::gateway::routes::build_routes(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, _) = broadcast::channel(1);
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (format!("http://{}", addr), shutdown_tx)
}

async fn mock_completion(server: &MockServer, model: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": model, "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .mount(server)
        .await;
}

fn exchange(config: &Config) -> Exchange {
    Exchange::new(config.deployment.clone(), ImageLimits::default())
}

fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

async fn upstream_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn text_exchange_round_trip() {
    let upstream = MockServer::start().await;
    mock_completion(&upstream, "grok-beta", "Hi there").await;

    let config = test_config(&upstream.uri());
    let (url, shutdown) = start_proxy(config.clone()).await;
    let transport = ProxyTransport::new(&url);
    let mut ex = exchange(&config);

    let outcome = ex.submit(UserInput::text("Hello"), &transport).await;
    assert!(outcome.is_completed(), "unexpected outcome: {:?}", outcome);

    let turns = ex.log().turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].role(), Role::System);
    assert_eq!(turns[1], Turn::user("Hello"));
    assert_eq!(turns[2], Turn::assistant("Hi there"));

    let bodies = upstream_bodies(&upstream).await;
    assert_eq!(bodies.len(), 1);
    let messages = bodies[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1], json!({"role": "user", "content": "Hello"}));
    assert_eq!(bodies[0]["temperature"], json!(0.7));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn image_exchange_sends_two_part_content() {
    let upstream = MockServer::start().await;
    mock_completion(&upstream, "grok-vision-beta", "A colorful gradient").await;

    let config = test_config(&upstream.uri());
    let (url, shutdown) = start_proxy(config.clone()).await;
    let transport = ProxyTransport::new(&url);
    let mut ex = exchange(&config);

    let outcome = ex
        .submit(UserInput::with_image("", noisy_png(96, 96)), &transport)
        .await;
    assert!(outcome.is_completed(), "unexpected outcome: {:?}", outcome);

    let bodies = upstream_bodies(&upstream).await;
    let last = bodies[0]["messages"].as_array().unwrap().last().unwrap().clone();
    let parts = last["content"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["type"], "image_url");
    assert_eq!(parts[0]["image_url"]["detail"], "high");
    assert!(parts[0]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(parts[1], json!({"type": "text", "text": "What's in this image?"}));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn oversized_image_never_reaches_network() {
    let upstream = MockServer::start().await;
    mock_completion(&upstream, "grok-vision-beta", "unreachable").await;

    let config = test_config(&upstream.uri());
    let (url, shutdown) = start_proxy(config.clone()).await;
    let transport = ProxyTransport::new(&url);
    let mut ex = exchange(&config);
    let before = ex.log().len();

    let in_flight = ex
        .begin(Turn::user_with_image("", "A".repeat(60_000)))
        .expect("exchange should start");
    let result = match in_flight.request {
        Ok(request) => transport.send(&request).await,
        Err(e) => Err(e),
    };
    let outcome = ex.complete(result);

    assert!(matches!(
        outcome,
        ExchangeOutcome::Failed {
            error: ExchangeError::PayloadTooLarge { len: 60_000, limit: 50_000 },
            ..
        }
    ));
    assert_eq!(ex.log().len(), before + 1);
    assert!(!ex.log().has_pending());
    assert!(upstream_bodies(&upstream).await.is_empty());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn proxy_rejects_oversized_image_with_413() {
    let upstream = MockServer::start().await;
    let config = test_config(&upstream.uri());
    let (url, shutdown) = start_proxy(config).await;

    let resp = reqwest::Client::new()
        .post(format!("{url}/chat"))
        .json(&json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": format!("data:image/jpeg;base64,{}", "A".repeat(50_001))}},
                    {"type": "text", "text": "hi"}
                ]
            }]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 413);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("50001"));
    assert!(upstream_bodies(&upstream).await.is_empty());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn upstream_error_rolls_back_pending_turn() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&upstream)
        .await;

    let config = test_config(&upstream.uri());
    let (url, shutdown) = start_proxy(config.clone()).await;
    let transport = ProxyTransport::new(&url);
    let mut ex = exchange(&config);

    let outcome = ex.submit(UserInput::text("Hello"), &transport).await;

    match outcome {
        ExchangeOutcome::Failed {
            error: ExchangeError::Status { status, message },
            notice,
        } => {
            assert_eq!(status, 502);
            assert_eq!(message, "Failed to process chat request");
            assert_eq!(notice, "Failed to send message. Please try again.");
        }
        other => panic!("expected status failure, got {:?}", other),
    }
    assert_eq!(ex.log().len(), 2);
    assert_eq!(ex.log().last(), Some(&Turn::user("Hello")));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn malformed_proxy_reply_is_a_failure() {
    // A server that answers 200 without the `message` field.
    let fake_proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&fake_proxy)
        .await;

    let config = Config::default();
    let transport = ProxyTransport::new(&fake_proxy.uri());
    let mut ex = exchange(&config);

    let outcome = ex.submit(UserInput::text("Hello"), &transport).await;
    assert!(matches!(
        outcome,
        ExchangeOutcome::Failed {
            error: ExchangeError::MalformedResponse(_),
            ..
        }
    ));
    assert_eq!(ex.log().len(), 2);
}

#[tokio::test]
async fn unreachable_proxy_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = ProxyTransport::new(&format!("http://{addr}"));
    let mut ex = exchange(&Config::default());

    let outcome = ex.submit(UserInput::text("anyone?"), &transport).await;
    assert!(matches!(
        outcome,
        ExchangeOutcome::Failed {
            error: ExchangeError::Transport(_),
            ..
        }
    ));
}

#[tokio::test]
async fn proxy_replaces_client_system_prompt() {
    let upstream = MockServer::start().await;
    mock_completion(&upstream, "grok-beta", "ok").await;

    let mut config = test_config(&upstream.uri());
    config.deployment.supports_images = false;
    let (url, shutdown) = start_proxy(config.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("{url}/chat"))
        .json(&json!({
            "messages": [
                {"role": "system", "content": "You are a pirate."},
                {"role": "user", "content": "Hello"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"message": "ok", "system_fingerprint": "fp_test"}));

    let bodies = upstream_bodies(&upstream).await;
    let messages = bodies[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0]["content"],
        json!(config.deployment.system_prompt)
    );

    let _ = shutdown.send(());
}

#[tokio::test]
async fn proxy_rejects_unreadable_bodies() {
    let upstream = MockServer::start().await;
    let (url, shutdown) = start_proxy(test_config(&upstream.uri())).await;

    let resp = reqwest::Client::new()
        .post(format!("{url}/chat"))
        .header("content-type", "application/json")
        .body("{\"messages\": 42}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = reqwest::Client::new()
        .post(format!("{url}/chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = reqwest::Client::new()
        .post(format!("{url}/chat"))
        .body("{\"messages\": []}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 415);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let upstream = MockServer::start().await;
    let (url, shutdown) = start_proxy(test_config(&upstream.uri())).await;

    let body: serde_json::Value = reqwest::get(format!("{url}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn direct_transport_uses_builder_routing() {
    let upstream = MockServer::start().await;
    mock_completion(&upstream, "grok-beta", "direct answer").await;

    let config = test_config(&upstream.uri());
    let transport = DirectTransport::new(resolve_provider(&config.upstream).unwrap());
    let mut ex = exchange(&config);

    ex.submit(UserInput::text("first"), &transport).await;
    let outcome = ex.submit(UserInput::text("second"), &transport).await;
    assert!(outcome.is_completed());

    let bodies = upstream_bodies(&upstream).await;
    assert_eq!(bodies.len(), 2);
    let messages = bodies[1]["messages"].as_array().unwrap();
    let roles: Vec<&str> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);

    let texts: Vec<String> = ex.log().visible_turns().iter().map(Turn::text).collect();
    assert_eq!(texts, vec!["first", "direct answer", "second", "direct answer"]);
}

#[test]
fn wire_content_parts_deserialize_from_proxy_json() {
    let content: Content = serde_json::from_value(json!([
        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,QUJD", "detail": "low"}},
        {"type": "text", "text": "hi"}
    ]))
    .unwrap();
    let Content::Parts(parts) = content else {
        panic!("expected parts");
    };
    assert!(matches!(&parts[1], ContentPart::Text { text } if text == "hi"));
}
