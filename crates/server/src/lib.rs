//! Helper utilities to launch the swapscope API server.
#![allow(clippy::uninlined_format_args)]

use std::{net::SocketAddr, sync::Arc};

use api::ApiState;
use api_types::HealthResponse;
use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    routing::get,
};
use eyre::Result;
mod rate_limit;
use rate_limit::RateLimitLayer;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

/// Version prefix for all API routes.
pub const API_VERSION: &str = "v1";

/// Health check handler returning `{ "status": "ok" }`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_owned() })
}

/// Build the API router with CORS and tracing layers.
pub fn router(state: ApiState, allowed_origins: Vec<String>) -> Router {
    let allowed = Arc::new(allowed_origins);
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate({
            let allowed = Arc::clone(&allowed);
            move |origin: &HeaderValue, _| match origin.to_str() {
                Ok(origin) => {
                    allowed.iter().any(|o| o == origin)
                        || origin.ends_with(".vercel.app")
                        || origin.starts_with("http://localhost:")
                        || origin.starts_with("http://127.0.0.1:")
                }
                Err(_) => false,
            }
        }))
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .expose_headers(Any);
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let max_requests = state.max_requests();
    let rate_period = state.rate_period();
    let api_service = tower::ServiceBuilder::new()
        .layer(RateLimitLayer::new(max_requests, rate_period))
        .service(api::router(state));

    Router::new()
        .route("/health", get(health))
        .nest_service(&format!("/{API_VERSION}"), api_service)
        .layer(cors)
        .layer(trace)
}

/// Run the API server on the given address.
pub async fn run(addr: SocketAddr, state: ApiState, allowed_origins: Vec<String>) -> Result<()> {
    let app = router(state, allowed_origins);

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{ApiState, DEFAULT_MAX_REQUESTS, DEFAULT_RATE_PERIOD};
    use async_trait::async_trait;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
    };
    use blocks::BlockResolver;
    use serde_json::{Map, Value, json};
    use subgraph::{CachePolicy, DynExecutor, QueryDocument, QueryExecutor, TransportError};
    use tower::util::ServiceExt;

    /// Backend that resolves every block and prices the bundle at 2.0.
    struct StubDex;

    #[async_trait]
    impl QueryExecutor for StubDex {
        async fn execute(
            &self,
            query: &QueryDocument,
            _policy: CachePolicy,
        ) -> Result<Map<String, Value>, TransportError> {
            let mut data = Map::new();
            match query.name.as_str() {
                "blocksAtTimestamps" => {
                    for alias in &query.aliases {
                        let ts: u64 = alias.trim_start_matches('t').parse().unwrap();
                        data.insert(alias.clone(), json!([{ "number": 9, "timestamp": ts + 1 }]));
                    }
                }
                "bundle" | "bundleAtBlock" => {
                    data.insert(query.aliases[0].clone(), json!({ "nativePrice": "2.0" }));
                }
                _ => {
                    for alias in &query.aliases {
                        data.insert(alias.clone(), Value::Null);
                    }
                }
            }
            Ok(data)
        }
    }

    fn build_app(allowed: Vec<String>) -> Router {
        let executor: DynExecutor = std::sync::Arc::new(StubDex);
        let resolver = BlockResolver::new(std::sync::Arc::clone(&executor));
        let state = ApiState::new(
            executor,
            resolver,
            "0xfactory".to_owned(),
            Vec::new(),
            100,
            DEFAULT_MAX_REQUESTS,
            DEFAULT_RATE_PERIOD,
        );
        router(state, allowed)
    }

    async fn send_request(app: Router, uri: &str, origin: &str) -> (StatusCode, Option<String>) {
        let response = app
            .oneshot(
                Request::builder().uri(uri).header("Origin", origin).body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let cors = response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        (status, cors)
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = build_app(Vec::new());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn allows_configured_origin() {
        let app = build_app(
            config::DEFAULT_ALLOWED_ORIGINS.split(',').map(|s| s.to_owned()).collect(),
        );
        let (status, cors) =
            send_request(app, &format!("/{API_VERSION}/native-price"), "https://swapscope.xyz")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cors.as_deref(), Some("https://swapscope.xyz"));
    }

    #[tokio::test]
    async fn allows_localhost_origin() {
        let app = build_app(Vec::new());
        let (status, cors) =
            send_request(app, &format!("/{API_VERSION}/native-price"), "http://localhost:5173")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cors.as_deref(), Some("http://localhost:5173"));
    }

    #[tokio::test]
    async fn denies_other_origin() {
        let app = build_app(
            config::DEFAULT_ALLOWED_ORIGINS.split(',').map(|s| s.to_owned()).collect(),
        );
        let (status, cors) =
            send_request(app, &format!("/{API_VERSION}/native-price"), "https://notallowed.com")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cors.is_none());
    }
}
