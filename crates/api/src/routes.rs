//! API endpoint handlers.

use aggregator::get_pair_transactions;
use api_types::{
    DailySeriesResponse, ErrorResponse, FailedPairItem, GlobalResponse, HourlyRatesResponse,
    NativePriceResponse, PairsResponse, ResolveBlocksResponse, ResolvedBlock, TokenPricesResponse,
    TransactionsResponse,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use primitives::time::{DAY_SECONDS, HOUR_SECONDS, WEEK_SECONDS, now_timestamp};
use tracing::warn;

use crate::state::{ApiState, MAX_BULK_PAIRS, MAX_RESOLVE_TIMESTAMPS};
use crate::validation::{
    HourlyRatesQuery, PairsQuery, ResolveBlocksQuery, TokenPricesQuery, parse_entity_id,
    parse_id_list, parse_timestamp_list,
};

#[utoipa::path(
    get,
    path = "/pairs",
    params(PairsQuery),
    responses(
        (status = 200, description = "Enriched pair snapshots", body = PairsResponse),
        (status = 400, description = "Invalid pair ids", body = ErrorResponse),
        (status = 502, description = "Indexing service unavailable", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Get enriched snapshots for a list of pairs
pub async fn pairs(
    State(state): State<ApiState>,
    Query(query): Query<PairsQuery>,
) -> Result<Json<PairsResponse>, ErrorResponse> {
    let ids = parse_id_list(&query.ids, MAX_BULK_PAIRS)?;
    let native_price = state.global.get_native_price().await.map_err(|e| {
        warn!(error = %e, "native price fetch failed");
        ErrorResponse::upstream_error()
    })?;

    let snapshots = state.pairs.get_bulk_snapshots(&ids, native_price.price_usd).await;
    Ok(Json(PairsResponse {
        pairs: snapshots.succeeded,
        failed: snapshots
            .failed
            .into_iter()
            .map(|f| FailedPairItem { id: f.id, reason: f.reason })
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/pairs/{id}/daily",
    params(("id" = String, Path, description = "Pair id")),
    responses(
        (status = 200, description = "Gap-free daily series", body = DailySeriesResponse),
        (status = 400, description = "Invalid pair id", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Get the daily volume/liquidity series for a pair
pub async fn pair_daily(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<DailySeriesResponse>, ErrorResponse> {
    let id = parse_entity_id(&id)?;
    let points = state.charts.get_daily_series(&id).await;
    Ok(Json(DailySeriesResponse { points }))
}

#[utoipa::path(
    get,
    path = "/pairs/{id}/hourly-rates",
    params(("id" = String, Path, description = "Pair id"), HourlyRatesQuery),
    responses(
        (status = 200, description = "Hourly open/close rate series", body = HourlyRatesResponse),
        (status = 400, description = "Invalid pair id", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Get hourly open/close rates for both sides of a pair
pub async fn pair_hourly_rates(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<HourlyRatesQuery>,
) -> Result<Json<HourlyRatesResponse>, ErrorResponse> {
    let id = parse_entity_id(&id)?;
    let start = query.start.unwrap_or_else(|| now_timestamp().saturating_sub(WEEK_SECONDS));
    let (rate0, rate1) = state.rates.get_hourly_rates(&id, start, query.latest_block).await;
    Ok(Json(HourlyRatesResponse { rate0, rate1 }))
}

#[utoipa::path(
    get,
    path = "/pairs/{id}/transactions",
    params(("id" = String, Path, description = "Pair id")),
    responses(
        (status = 200, description = "Recent mints, burns and swaps", body = TransactionsResponse),
        (status = 400, description = "Invalid pair id", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Get the recent transaction feed for a pair
pub async fn pair_transactions_feed(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionsResponse>, ErrorResponse> {
    let id = parse_entity_id(&id)?;
    let transactions = match get_pair_transactions(&state.executor, &id).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!(pair = %id, error = %e, "transaction feed fetch failed; returning empty feed");
            Default::default()
        }
    };
    Ok(Json(TransactionsResponse { transactions }))
}

#[utoipa::path(
    get,
    path = "/tokens/{id}/prices",
    params(("id" = String, Path, description = "Token id"), TokenPricesQuery),
    responses(
        (status = 200, description = "Token USD price series", body = TokenPricesResponse),
        (status = 400, description = "Invalid token id", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Get a block-sampled USD price series for a token
pub async fn token_prices(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<TokenPricesQuery>,
) -> Result<Json<TokenPricesResponse>, ErrorResponse> {
    let id = parse_entity_id(&id)?;
    let start = query.start.unwrap_or_else(|| now_timestamp().saturating_sub(DAY_SECONDS));
    let interval = query.interval.unwrap_or(HOUR_SECONDS);
    let points = state.rates.get_token_prices(&id, start, interval, query.latest_block).await;
    Ok(Json(TokenPricesResponse { points }))
}

#[utoipa::path(
    get,
    path = "/global",
    responses(
        (status = 200, description = "Protocol totals with derived changes", body = GlobalResponse)
    ),
    tag = "swapscope"
)]
/// Get protocol-wide totals with 1d/1w changes
pub async fn global(State(state): State<ApiState>) -> Json<GlobalResponse> {
    let global = match state.global.get_global_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "global snapshot fetch failed; returning no data");
            None
        }
    };
    Json(GlobalResponse { global })
}

#[utoipa::path(
    get,
    path = "/global/daily",
    responses(
        (status = 200, description = "Protocol-wide daily series", body = DailySeriesResponse)
    ),
    tag = "swapscope"
)]
/// Get the protocol-wide daily volume/liquidity series
pub async fn global_daily(State(state): State<ApiState>) -> Json<DailySeriesResponse> {
    let points = state.charts.get_global_daily_series().await;
    Json(DailySeriesResponse { points })
}

#[utoipa::path(
    get,
    path = "/native-price",
    responses(
        (status = 200, description = "Native coin price with 1d change", body = NativePriceResponse),
        (status = 502, description = "Indexing service unavailable", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Get the native coin reference price
pub async fn native_price(
    State(state): State<ApiState>,
) -> Result<Json<NativePriceResponse>, ErrorResponse> {
    let native_price = state.global.get_native_price().await.map_err(|e| {
        warn!(error = %e, "native price fetch failed");
        ErrorResponse::upstream_error()
    })?;
    Ok(Json(NativePriceResponse { native_price }))
}

#[utoipa::path(
    get,
    path = "/blocks/resolve",
    params(ResolveBlocksQuery),
    responses(
        (status = 200, description = "Blocks resolved from timestamps", body = ResolveBlocksResponse),
        (status = 400, description = "Invalid timestamps", body = ErrorResponse),
        (status = 502, description = "Block index unavailable", body = ErrorResponse)
    ),
    tag = "swapscope"
)]
/// Resolve unix timestamps to block numbers (diagnostic)
pub async fn resolve_blocks(
    State(state): State<ApiState>,
    Query(query): Query<ResolveBlocksQuery>,
) -> Result<Json<ResolveBlocksResponse>, ErrorResponse> {
    let timestamps = parse_timestamp_list(&query.timestamps, MAX_RESOLVE_TIMESTAMPS)?;
    let blocks = state.resolver.resolve_many(&timestamps).await.map_err(|e| {
        warn!(error = %e, "block resolution failed");
        ErrorResponse::upstream_error()
    })?;
    let blocks = timestamps
        .into_iter()
        .zip(blocks)
        .map(|(timestamp, block)| ResolvedBlock {
            timestamp,
            number: block.number,
            block_timestamp: block.timestamp,
            resolved: block.is_resolved(),
        })
        .collect();
    Ok(Json(ResolveBlocksResponse { blocks }))
}
