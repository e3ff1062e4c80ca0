//! Row types decoded from subgraph responses.
//!
//! The subgraph encodes big decimals and counters as JSON strings; the
//! deserializers here accept both strings and plain numbers so the same types
//! also round-trip through the API layer.

#![allow(missing_docs)]

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};
use subgraph::TransportError;
use utoipa::ToSchema;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Num(f64),
    Text(String),
}

/// Decode a decimal that may arrive as a string or a number.
pub(crate) fn decimal_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match RawNumber::deserialize(deserializer)? {
        RawNumber::Num(n) => Ok(n),
        RawNumber::Text(s) => s.parse().map_err(D::Error::custom),
    }
}

/// Decode an integer counter that may arrive as a string or a number.
pub(crate) fn decimal_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match RawNumber::deserialize(deserializer)? {
        RawNumber::Num(n) => Ok(n as u64),
        RawNumber::Text(s) => s.parse().map_err(D::Error::custom),
    }
}

/// Decode a list field from a response `data` object. A missing or `null`
/// field is an empty list, not an error.
pub(crate) fn decode_list<T: serde::de::DeserializeOwned>(
    data: &Map<String, Value>,
    key: &str,
) -> Result<Vec<T>, TransportError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| TransportError::Decode(format!("{key}: {e}"))),
    }
}

/// Decode a nullable single-object field from a response `data` object.
pub(crate) fn decode_optional<T: serde::de::DeserializeOwned>(
    data: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, TransportError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| TransportError::Decode(format!("{key}: {e}"))),
    }
}

/// Token metadata embedded in pair rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(deserialize_with = "decimal_f64")]
    pub total_liquidity: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub derived_native: f64,
}

/// Full current snapshot of a trading pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PairSnapshot {
    pub id: String,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
    #[serde(deserialize_with = "decimal_f64")]
    pub reserve0: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub reserve1: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub reserve_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub total_supply: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub tracked_reserve_native: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub untracked_volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub token0_price: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub token1_price: f64,
    #[serde(deserialize_with = "decimal_u64")]
    pub tx_count: u64,
    #[serde(deserialize_with = "decimal_u64")]
    pub created_at_timestamp: u64,
    #[serde(deserialize_with = "decimal_u64")]
    pub created_at_block_number: u64,
}

/// Reduced historical snapshot of a pair at one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPairSnapshot {
    pub id: String,
    #[serde(deserialize_with = "decimal_f64")]
    pub reserve_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub tracked_reserve_native: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub untracked_volume_usd: f64,
}

/// A pair snapshot enriched with derived dashboard metrics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPairSnapshot {
    /// Current subgraph state of the pair.
    pub pair: PairSnapshot,
    /// Tracked volume over the last day.
    pub one_day_volume_usd: f64,
    /// Tracked volume over the last week (absolute delta, not a percent).
    pub one_week_volume_usd: f64,
    /// Percent change of the one-day tracked volume vs the day before.
    pub volume_change_usd: f64,
    /// Untracked volume over the last day.
    pub one_day_volume_untracked: f64,
    /// Untracked volume over the last week.
    pub one_week_volume_untracked: f64,
    /// Percent change of the one-day untracked volume vs the day before.
    pub volume_change_untracked: f64,
    /// Tracked reserve converted to USD via the native reference price.
    pub tracked_reserve_usd: f64,
    /// Percent change of reserveUSD over the last day.
    pub liquidity_change_usd: f64,
}

/// One day bucket of a chart series. Gap-filled buckets carry zero volume and
/// the last known reserve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Day-start unix timestamp.
    #[serde(deserialize_with = "decimal_u64")]
    pub date: u64,
    #[serde(deserialize_with = "decimal_f64")]
    pub daily_volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub reserve_usd: f64,
}

/// One day bucket of the protocol-wide chart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDayRow {
    #[serde(deserialize_with = "decimal_u64")]
    pub date: u64,
    #[serde(deserialize_with = "decimal_f64")]
    pub daily_volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub total_liquidity_usd: f64,
}

/// One hourly candle of a pair-side exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenClosePoint {
    pub timestamp: u64,
    pub open: f64,
    pub close: f64,
}

/// One point of a token's USD price series.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPricePoint {
    pub timestamp: u64,
    /// Token price denominated in the native coin.
    pub derived_native: f64,
    /// Native coin price in USD at the same block.
    pub native_price: f64,
    /// Product of the two.
    pub price_usd: f64,
}

/// Current factory-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FactorySnapshot {
    #[serde(deserialize_with = "decimal_f64")]
    pub total_volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub untracked_volume_usd: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub total_liquidity_usd: f64,
    #[serde(deserialize_with = "decimal_u64")]
    pub tx_count: u64,
    #[serde(deserialize_with = "decimal_u64")]
    pub pair_count: u64,
}

/// Factory totals enriched with derived dashboard metrics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSnapshot {
    pub factory: FactorySnapshot,
    pub one_day_volume_usd: f64,
    pub one_week_volume_usd: f64,
    pub volume_change_usd: f64,
    pub one_day_volume_untracked: f64,
    pub volume_change_untracked: f64,
    pub liquidity_change_usd: f64,
}

/// Native coin reference price with its one-day move.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NativePrice {
    pub price_usd: f64,
    pub one_day_change_percent: f64,
}

/// Token pair referenced by a transaction row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PairTokens {
    pub token0: TokenRef,
    pub token1: TokenRef,
}

/// Minimal token reference inside transaction rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRef {
    pub id: String,
    pub symbol: String,
}

/// A liquidity mint event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MintRow {
    pub transaction_id: String,
    #[serde(deserialize_with = "decimal_u64")]
    pub timestamp: u64,
    pub pair: PairTokens,
    pub to: String,
    #[serde(deserialize_with = "decimal_f64")]
    pub liquidity: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount0: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount1: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount_usd: f64,
}

/// A liquidity burn event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BurnRow {
    pub transaction_id: String,
    #[serde(deserialize_with = "decimal_u64")]
    pub timestamp: u64,
    pub pair: PairTokens,
    pub sender: String,
    #[serde(deserialize_with = "decimal_f64")]
    pub liquidity: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount0: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount1: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount_usd: f64,
}

/// A swap event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapRow {
    pub transaction_id: String,
    #[serde(deserialize_with = "decimal_u64")]
    pub timestamp: u64,
    pub pair: PairTokens,
    pub to: String,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount0_in: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount0_out: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount1_in: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount1_out: f64,
    #[serde(deserialize_with = "decimal_f64")]
    pub amount_usd: f64,
}

/// Recent activity feed for one pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsFeed {
    pub mints: Vec<MintRow>,
    pub burns: Vec<BurnRow>,
    pub swaps: Vec<SwapRow>,
}
