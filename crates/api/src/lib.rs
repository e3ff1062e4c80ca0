//! Thin HTTP API over the subgraph fetch pipeline.

pub mod routes;
pub mod state;
pub mod validation;

use axum::{Router, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::{ApiState, DEFAULT_MAX_REQUESTS, DEFAULT_RATE_PERIOD};

/// `OpenAPI` documentation structure
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        routes::pairs,
        routes::pair_daily,
        routes::pair_hourly_rates,
        routes::pair_transactions_feed,
        routes::token_prices,
        routes::global,
        routes::global_daily,
        routes::native_price,
        routes::resolve_blocks
    ),
    components(
        schemas(
            api_types::PairsResponse,
            api_types::FailedPairItem,
            api_types::DailySeriesResponse,
            api_types::HourlyRatesResponse,
            api_types::TokenPricesResponse,
            api_types::TransactionsResponse,
            api_types::GlobalResponse,
            api_types::NativePriceResponse,
            api_types::ResolveBlocksResponse,
            api_types::ResolvedBlock,
            api_types::HealthResponse,
            api_types::ErrorResponse,
            aggregator::models::EnrichedPairSnapshot,
            aggregator::models::PairSnapshot,
            aggregator::models::TokenInfo,
            aggregator::models::TimeSeriesPoint,
            aggregator::models::OpenClosePoint,
            aggregator::models::TokenPricePoint,
            aggregator::models::GlobalSnapshot,
            aggregator::models::FactorySnapshot,
            aggregator::models::NativePrice,
            aggregator::models::TransactionsFeed,
            aggregator::models::MintRow,
            aggregator::models::BurnRow,
            aggregator::models::SwapRow,
            aggregator::models::PairTokens,
            aggregator::models::TokenRef
        )
    ),
    tags(
        (name = "swapscope", description = "Swapscope API endpoints")
    ),
    info(
        title = "Swapscope API",
        description = "API for DEX pair, token and protocol statistics",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

/// Build the router with all API endpoints.
pub fn router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/pairs", get(routes::pairs))
        .route("/pairs/:id/daily", get(routes::pair_daily))
        .route("/pairs/:id/hourly-rates", get(routes::pair_hourly_rates))
        .route("/pairs/:id/transactions", get(routes::pair_transactions_feed))
        .route("/tokens/:id/prices", get(routes::token_prices))
        .route("/global", get(routes::global))
        .route("/global/daily", get(routes::global_daily))
        .route("/native-price", get(routes::native_price))
        .route("/blocks/resolve", get(routes::resolve_blocks));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
    };
    use blocks::BlockResolver;
    use serde_json::{Map, Value, json};
    use std::sync::Arc;
    use subgraph::{CachePolicy, DynExecutor, QueryDocument, QueryExecutor, TransportError};
    use tower::util::ServiceExt;

    /// Minimal backend: resolves blocks, serves a bundle, and returns empty
    /// lists for everything else.
    struct EmptyDex;

    #[async_trait]
    impl QueryExecutor for EmptyDex {
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
                        data.insert(alias.clone(), json!([{ "number": 77, "timestamp": ts + 3 }]));
                    }
                }
                "bundle" | "bundleAtBlock" => {
                    data.insert(query.aliases[0].clone(), json!({ "nativePrice": "2.0" }));
                }
                "pairsBulk" => {
                    data.insert("pairs".to_owned(), json!([]));
                }
                "pairDayDatas" => {
                    data.insert("pairDayDatas".to_owned(), json!([]));
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

    fn app() -> Router {
        let executor: DynExecutor = Arc::new(EmptyDex);
        let resolver = BlockResolver::new(Arc::clone(&executor));
        let state = ApiState::new(
            executor,
            resolver,
            "0xfactory".to_owned(),
            Vec::new(),
            100,
            DEFAULT_MAX_REQUESTS,
            DEFAULT_RATE_PERIOD,
        );
        router(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response =
            app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    const PAIR: &str = "0x742d35cc6634c0532925a3b844bc9e7595f8e3a1";

    #[tokio::test]
    async fn pairs_rejects_malformed_ids() {
        let (status, body) = get_json(app(), "/pairs?ids=not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "invalid-params");
    }

    #[tokio::test]
    async fn pairs_with_unknown_ids_returns_empty_lists() {
        let (status, body) = get_json(app(), &format!("/pairs?ids={PAIR}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pairs"], json!([]));
        assert_eq!(body["failed"], json!([]));
    }

    #[tokio::test]
    async fn daily_series_degrades_to_empty_points() {
        let (status, body) = get_json(app(), &format!("/pairs/{PAIR}/daily")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"], json!([]));
    }

    #[tokio::test]
    async fn native_price_round_trips() {
        let (status, body) = get_json(app(), "/native-price").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["native_price"]["priceUsd"], json!(2.0));
    }

    #[tokio::test]
    async fn resolve_blocks_reports_sentinels_and_hits() {
        let (status, body) = get_json(app(), "/blocks/resolve?timestamps=1700000000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blocks"][0]["number"], json!(77));
        assert_eq!(body["blocks"][0]["resolved"], json!(true));
    }
}
