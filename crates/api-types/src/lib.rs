//! Data types for the swapscope API.
//!
//! These structs define the JSON responses returned by the API server. They
//! are provided in a separate crate so that consumers such as the dashboard
//! can depend on them without pulling in the rest of the server
//! implementation.

#![allow(missing_docs)]

use aggregator::models::{
    EnrichedPairSnapshot, GlobalSnapshot, NativePrice, OpenClosePoint, TimeSeriesPoint,
    TokenPricePoint, TransactionsFeed,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Summary of a pair that could not be enriched.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailedPairItem {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PairsResponse {
    pub pairs: Vec<EnrichedPairSnapshot>,
    pub failed: Vec<FailedPairItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySeriesResponse {
    pub points: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HourlyRatesResponse {
    pub rate0: Vec<OpenClosePoint>,
    pub rate1: Vec<OpenClosePoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPricesResponse {
    pub points: Vec<TokenPricePoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionsResponse {
    pub transactions: TransactionsFeed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GlobalResponse {
    pub global: Option<GlobalSnapshot>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NativePriceResponse {
    pub native_price: NativePrice,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolvedBlock {
    pub timestamp: u64,
    pub number: u64,
    pub block_timestamp: u64,
    pub resolved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveBlocksResponse {
    pub blocks: Vec<ResolvedBlock>,
}

/// Problem-details style error body shared by all endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Short machine-readable error type.
    pub r#type: String,
    /// Human-readable summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Human-readable detail.
    pub detail: String,
}

impl ErrorResponse {
    /// Create an error body.
    pub fn new(
        r#type: &str,
        title: &str,
        status: StatusCode,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            r#type: r#type.to_owned(),
            title: title.to_owned(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    /// Standard body for an upstream subgraph failure.
    pub fn upstream_error() -> Self {
        Self::new(
            "upstream-unavailable",
            "Bad Gateway",
            StatusCode::BAD_GATEWAY,
            "The indexing service did not return a usable response",
        )
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serializes_problem_fields() {
        let body = ErrorResponse::new(
            "invalid-params",
            "Bad Request",
            StatusCode::BAD_REQUEST,
            "ids must be hex addresses",
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "invalid-params");
        assert_eq!(json["status"], 400);
    }

    #[test]
    fn upstream_error_is_bad_gateway() {
        assert_eq!(ErrorResponse::upstream_error().status, 502);
    }
}
