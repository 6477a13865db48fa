use crate::error::ExchangeError;
use crate::gateway::protocol::*;
use crate::gateway::server::GatewayState;
use crate::providers::{ProviderError, ProviderRequest};

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Generic failure message; details go to the log only.
const CHAT_FAILURE_MESSAGE: &str = "Failed to process chat request";

/// Build all routes for the proxy.
pub fn build_routes(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/api/chat", post(chat_handler));

    let router = match state.config.gateway.static_root.as_deref() {
        Some(root) => router.fallback_service(ServeDir::new(root)),
        None => router,
    };

    router
        .layer(RequestBodyLimitLayer::new(state.config.gateway.max_request_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health
// ============================================================================

async fn health_handler(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime,
    })
}

// ============================================================================
// Chat
// ============================================================================

type ChatResult = Result<Json<ChatResponseBody>, (StatusCode, Json<ErrorBody>)>;

fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

async fn chat_handler(
    State(state): State<GatewayState>,
    body: Result<Json<ChatRequestBody>, JsonRejection>,
) -> ChatResult {
    let Json(body) = body.map_err(|e| {
        warn!("Rejected chat body: {}", e);
        reject(e.status(), e.body_text())
    })?;

    let request = state.builder.route_wire(body.messages).map_err(|e| {
        warn!("Chat request failed validation: {}", e);
        match e {
            ExchangeError::PayloadTooLarge { .. } => {
                reject(StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            _ => reject(StatusCode::BAD_REQUEST, e.to_string()),
        }
    })?;

    info!(
        "Forwarding {} messages to {} (image={})",
        request.messages.len(),
        request.model,
        request.has_image()
    );

    let response = state
        .provider
        .chat(ProviderRequest {
            model: request.model,
            messages: request.messages,
            temperature: Some(request.temperature),
        })
        .await
        .map_err(|e| {
            error!("Error in chat API: {}", e);
            match e {
                ProviderError::Request { .. } | ProviderError::Status { .. } => {
                    reject(StatusCode::BAD_GATEWAY, CHAT_FAILURE_MESSAGE)
                }
                ProviderError::InvalidResponse { .. } => {
                    reject(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILURE_MESSAGE)
                }
            }
        })?;

    Ok(Json(ChatResponseBody {
        message: response.content,
        system_fingerprint: response.system_fingerprint,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::conversation::Role;
    use crate::providers::{ModelProvider, ProviderResponse};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<ProviderRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl ModelProvider for Recorder {
        async fn chat(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            if self.fail {
                return Err(ProviderError::InvalidResponse {
                    provider: "stub".into(),
                    reason: "no choices".into(),
                });
            }
            Ok(ProviderResponse {
                content: "pong".into(),
                system_fingerprint: None,
                finish_reason: Some("stop".into()),
            })
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn app(provider: Arc<Recorder>) -> Router {
        app_with(Config::default(), provider)
    }

    fn app_with(config: Config, provider: Arc<Recorder>) -> Router {
        build_routes(GatewayState::new(config, provider))
    }

    async fn post_chat(app: Router, body: Value) -> (StatusCode, Value) {
        send_chat(app, Body::from(body.to_string())).await
    }

    async fn send_chat(app: Router, body: Body) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::post("/chat")
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn forwards_text_chat_with_server_prompt() {
        let provider = Arc::new(Recorder::default());
        let (status, body) = post_chat(
            app(provider.clone()),
            json!({"messages": [{"role": "user", "content": "ping"}]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "pong"}));

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].model, "grok-beta");
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert_eq!(seen[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn empty_conversation_is_bad_request() {
        let provider = Arc::new(Recorder::default());
        let (status, body) = post_chat(app(provider.clone()), json!({"messages": []})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_on_text_only_deployment_is_bad_request() {
        let mut config = Config::default();
        config.deployment.supports_images = false;
        let provider = Arc::new(Recorder::default());

        let (status, body) = post_chat(
            app_with(config, provider.clone()),
            json!({"messages": [{
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,QUJD"}},
                    {"type": "text", "text": "what is it?"}
                ]
            }]}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], ExchangeError::ImagesUnsupported.to_string());
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn streamed_body_over_limit_keeps_413() {
        let mut config = Config::default();
        config.gateway.max_request_bytes = 64;
        let provider = Arc::new(Recorder::default());

        let payload = json!({"messages": [{"role": "user", "content": "x".repeat(256)}]}).to_string();
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = payload
            .into_bytes()
            .chunks(32)
            .map(|c| Ok(c.to_vec()))
            .collect();
        let body = Body::from_stream(futures::stream::iter(chunks));

        let (status, body) = send_chat(app_with(config, provider.clone()), body).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unusable_upstream_reply_is_generic_500() {
        let provider = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let (status, body) = post_chat(
            app(provider),
            json!({"messages": [{"role": "user", "content": "ping"}]}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": CHAT_FAILURE_MESSAGE}));
    }

    #[tokio::test]
    async fn unknown_route_is_404_without_static_root() {
        let resp = app(Arc::new(Recorder::default()))
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
