//! Block-sampled rate series: hourly pair candles and token USD prices.

use std::collections::BTreeMap;

use primitives::{Block, time};
use serde_json::Value;
use subgraph::{DynExecutor, TransportError, split_query};
use tracing::warn;

use blocks::BlockResolver;

use crate::models::{OpenClosePoint, TokenPricePoint};
use crate::queries;

/// Blocks per round trip when sampling rates.
pub const RATE_CHUNK_SIZE: usize = 100;

struct RateValue {
    timestamp: u64,
    rate0: f64,
    rate1: f64,
}

/// Builds open/close candle series by sampling pair state at resolved blocks.
#[derive(Clone)]
pub struct RateSeriesBuilder {
    executor: DynExecutor,
    resolver: BlockResolver,
    chunk_size: usize,
}

impl std::fmt::Debug for RateSeriesBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateSeriesBuilder")
            .field("resolver", &self.resolver)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl RateSeriesBuilder {
    /// Create a builder with the default chunk size.
    pub const fn new(executor: DynExecutor, resolver: BlockResolver) -> Self {
        Self::with_chunk_size(executor, resolver, RATE_CHUNK_SIZE)
    }

    /// Create a builder with an explicit chunk size.
    pub const fn with_chunk_size(
        executor: DynExecutor,
        resolver: BlockResolver,
        chunk_size: usize,
    ) -> Self {
        Self { executor, resolver, chunk_size }
    }

    /// Hourly open/close series for both sides of a pair, degraded to empty
    /// series on failure.
    pub async fn get_hourly_rates(
        &self,
        pair_id: &str,
        start: u64,
        latest_block: Option<u64>,
    ) -> (Vec<OpenClosePoint>, Vec<OpenClosePoint>) {
        match self.fetch_hourly_rates(pair_id, start, latest_block).await {
            Ok(series) => series,
            Err(e) => {
                warn!(pair = pair_id, error = %e, "hourly rate fetch failed; returning empty series");
                (Vec::new(), Vec::new())
            }
        }
    }

    /// Hourly open/close series with transport failures surfaced.
    ///
    /// `latest_block` caps sampling at the indexer's confirmed head so a
    /// lagging index does not produce phantom trailing candles.
    pub async fn fetch_hourly_rates(
        &self,
        pair_id: &str,
        start: u64,
        latest_block: Option<u64>,
    ) -> Result<(Vec<OpenClosePoint>, Vec<OpenClosePoint>), TransportError> {
        let timestamps = time::hourly_timestamps(start, time::now_timestamp());
        let jobs = self.sample_blocks(&timestamps, latest_block).await?;
        if jobs.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let merged = split_query(
            queries::hourly_rates_template,
            &self.executor,
            pair_id,
            &jobs,
            self.chunk_size,
        )
        .await?;

        let mut values = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let Some(value) = merged.get(&format!("t{}", job.timestamp)) else {
                continue;
            };
            let (Some(rate0), Some(rate1)) =
                (decimal(value, "token0Price"), decimal(value, "token1Price"))
            else {
                continue;
            };
            values.push(RateValue { timestamp: job.timestamp, rate0, rate1 });
        }

        let mut series0 = Vec::with_capacity(values.len().saturating_sub(1));
        let mut series1 = Vec::with_capacity(values.len().saturating_sub(1));
        for window in values.windows(2) {
            series0.push(OpenClosePoint {
                timestamp: window[0].timestamp,
                open: window[0].rate0,
                close: window[1].rate0,
            });
            series1.push(OpenClosePoint {
                timestamp: window[0].timestamp,
                open: window[0].rate1,
                close: window[1].rate1,
            });
        }
        Ok((series0, series1))
    }

    /// USD price series for one token, degraded to an empty series on
    /// failure.
    pub async fn get_token_prices(
        &self,
        token_id: &str,
        start: u64,
        interval: u64,
        latest_block: Option<u64>,
    ) -> Vec<TokenPricePoint> {
        match self.fetch_token_prices(token_id, start, interval, latest_block).await {
            Ok(series) => series,
            Err(e) => {
                warn!(token = token_id, error = %e, "token price fetch failed; returning empty series");
                Vec::new()
            }
        }
    }

    /// USD price series with transport failures surfaced. Each point combines
    /// the token's native-denominated price and the bundle's native price at
    /// the same block; points missing either sample are dropped.
    pub async fn fetch_token_prices(
        &self,
        token_id: &str,
        start: u64,
        interval: u64,
        latest_block: Option<u64>,
    ) -> Result<Vec<TokenPricePoint>, TransportError> {
        let timestamps = time::interval_timestamps(start, time::now_timestamp(), interval);
        let jobs = self.sample_blocks(&timestamps, latest_block).await?;
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let merged = split_query(
            queries::token_prices_template,
            &self.executor,
            token_id,
            &jobs,
            self.chunk_size,
        )
        .await?;
        let samples = decode_price_samples(&merged);

        let mut points = Vec::new();
        for job in &jobs {
            if let Some((Some(derived_native), Some(native_price))) = samples.get(&job.timestamp) {
                points.push(TokenPricePoint {
                    timestamp: job.timestamp,
                    derived_native: *derived_native,
                    native_price: *native_price,
                    price_usd: derived_native * native_price,
                });
            }
        }
        Ok(points)
    }

    /// Resolve a timestamp grid to query jobs.
    ///
    /// Each job keeps its grid timestamp as the alias tag and carries the
    /// resolved block number; grid timestamps are unique even when indexer
    /// sync lag resolves adjacent hours to the same block. Sentinels and
    /// blocks above `latest_block` are dropped.
    async fn sample_blocks(
        &self,
        timestamps: &[u64],
        latest_block: Option<u64>,
    ) -> Result<Vec<Block>, TransportError> {
        if timestamps.is_empty() {
            return Ok(Vec::new());
        }
        let resolved = self.resolver.resolve_many(timestamps).await?;
        let mut jobs: Vec<Block> = timestamps
            .iter()
            .zip(resolved)
            .filter(|(_, block)| block.is_resolved())
            .map(|(grid_ts, block)| Block { number: block.number, timestamp: *grid_ts })
            .collect();
        if let Some(ceiling) = latest_block {
            jobs.retain(|job| job.number <= ceiling);
        }
        Ok(jobs)
    }
}

fn decimal(value: &Value, key: &str) -> Option<f64> {
    let field = value.get(key)?;
    field.as_f64().or_else(|| field.as_str().and_then(|s| s.parse().ok()))
}

enum PriceSample {
    Token(f64),
    Bundle(f64),
}

/// Classify one aliased result by its prefix: `t<ts>` token rows, `b<ts>`
/// bundle rows. Anything else (or a null entity) is skipped.
fn decode_price_sample(alias: &str, value: &Value) -> Option<(u64, PriceSample)> {
    if let Some(ts) = alias.strip_prefix('t') {
        let ts = ts.parse().ok()?;
        Some((ts, PriceSample::Token(decimal(value, "derivedNative")?)))
    } else if let Some(ts) = alias.strip_prefix('b') {
        let ts = ts.parse().ok()?;
        Some((ts, PriceSample::Bundle(decimal(value, "nativePrice")?)))
    } else {
        None
    }
}

fn decode_price_samples(
    merged: &serde_json::Map<String, Value>,
) -> BTreeMap<u64, (Option<f64>, Option<f64>)> {
    let mut samples: BTreeMap<u64, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (alias, value) in merged {
        match decode_price_sample(alias, value) {
            Some((ts, PriceSample::Token(derived))) => {
                samples.entry(ts).or_default().0 = Some(derived);
            }
            Some((ts, PriceSample::Bundle(price))) => {
                samples.entry(ts).or_default().1 = Some(price);
            }
            None => {}
        }
    }
    samples
}
