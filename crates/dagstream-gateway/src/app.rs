use std::{sync::Arc, time::Duration};

use axum::{http::Method, routing::get, Router};
use chrono::{DateTime, Utc};
use dagstream_core::config::{CorsConfig, DagstreamConfig};
use dagstream_hub::HubHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeFile,
    trace::TraceLayer,
};
use tracing::warn;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: DagstreamConfig,
    /// Injected rather than global, so tests can run their own hub.
    pub hub: HubHandle,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: DagstreamConfig, hub: HubHandle) -> Self {
        Self {
            config,
            hub,
            started_at: Utc::now(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let index = ServeFile::new(&state.config.gateway.index_path);
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/stream", get(crate::http::stream::stream_handler))
        .route_service("/", index)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Any origin, any request header, every response header exposed.
fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = cfg
        .allow_methods
        .iter()
        .filter_map(|m| match m.to_ascii_uppercase().parse::<Method>() {
            Ok(method) => Some(method),
            Err(_) => {
                warn!(method = %m, "ignoring invalid CORS method");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods)
        .allow_headers(Any)
        .expose_headers(Any)
        .max_age(Duration::from_secs(cfg.max_age_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use dagstream_hub::spawn_hub;
    use futures_util::StreamExt;
    use tokio::time::{sleep, timeout};
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let mut config = DagstreamConfig::default();
        config.gateway.index_path = "/nonexistent/index.html".to_string();
        let hub = spawn_hub(&config.hub);
        Arc::new(AppState::new(config, hub))
    }

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = axum::body::to_bytes(body, 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_hub_stats() {
        let state = test_state();
        let _sub = state.hub.subscribe().await.unwrap();
        state.hub.publish("x").await.unwrap();

        let res = build_router(state.clone())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = body_json(res.into_body()).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["subscribers"], 1);
        assert_eq!(json["published"], 1);
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn health_is_unavailable_without_hub() {
        let config = DagstreamConfig::default();
        let (hub_loop, hub) = dagstream_hub::BroadcastHub::new(&config.hub);
        drop(hub_loop);
        let state = Arc::new(AppState::new(config, hub));

        let res = build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(res.into_body()).await["status"], "hub_closed");
    }

    #[tokio::test]
    async fn stream_forwards_published_messages() {
        let state = test_state();
        let res = build_router(state.clone())
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");

        state.hub.publish(r#"{"type":"state"}"#).await.unwrap();

        let mut body = res.into_body().into_data_stream();
        let mut seen = String::new();
        while !seen.contains("\n\n") {
            let chunk = timeout(Duration::from_secs(1), body.next())
                .await
                .expect("no SSE frame")
                .unwrap()
                .unwrap();
            seen.push_str(&String::from_utf8_lossy(&chunk));
        }
        assert!(seen.contains("event: message"));
        assert!(seen.contains(r#"data: {"type":"state"}"#));
    }

    #[tokio::test]
    async fn closing_stream_unregisters_client() {
        let state = test_state();
        let res = build_router(state.clone())
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(state.hub.stats().await.unwrap().subscribers, 1);

        drop(res);

        let mut subscribers = usize::MAX;
        for _ in 0..50 {
            subscribers = state.hub.stats().await.unwrap().subscribers;
            if subscribers == 0 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(subscribers, 0);
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let res = build_router(test_state())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/stream")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = res.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "43200");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap();
        assert!(methods.contains("GET"));
        assert!(methods.contains("OPTIONS"));
    }

    #[tokio::test]
    async fn missing_index_is_not_found() {
        let res = build_router(test_state())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_cors_method_is_skipped() {
        let cfg = CorsConfig {
            max_age_secs: 60,
            allow_methods: vec!["get".into(), "NOT A METHOD".into()],
        };
        // builds without panicking; the bad entry is dropped
        let _ = cors_layer(&cfg);
    }
}
