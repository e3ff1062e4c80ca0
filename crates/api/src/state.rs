//! Shared state for API handlers and constants

use std::{sync::Arc, time::Duration as StdDuration};

use aggregator::{
    ChartSeriesBuilder, GlobalAggregator, HistoricalAggregator, RateSeriesBuilder,
};
use blocks::BlockResolver;
use subgraph::DynExecutor;

/// Default maximum number of requests allowed during the rate limiting period.
pub const DEFAULT_MAX_REQUESTS: u64 = u64::MAX;
/// Default duration for the rate limiting window.
pub const DEFAULT_RATE_PERIOD: StdDuration = StdDuration::from_secs(1);
/// Maximum number of pair ids accepted by the `/pairs` endpoint.
pub const MAX_BULK_PAIRS: usize = 200;
/// Maximum number of timestamps accepted by the `/blocks/resolve` endpoint.
pub const MAX_RESOLVE_TIMESTAMPS: usize = 100;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) executor: DynExecutor,
    pub(crate) resolver: BlockResolver,
    pub(crate) pairs: HistoricalAggregator,
    pub(crate) charts: ChartSeriesBuilder,
    pub(crate) rates: RateSeriesBuilder,
    pub(crate) global: GlobalAggregator,
    max_requests: u64,
    rate_period: StdDuration,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState").finish_non_exhaustive()
    }
}

impl ApiState {
    /// Create a new [`ApiState`] wiring all aggregators to `executor` and
    /// `resolver`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor: DynExecutor,
        resolver: BlockResolver,
        factory_id: String,
        tracked_overrides: Vec<String>,
        rate_chunk_size: usize,
        max_requests: u64,
        rate_period: StdDuration,
    ) -> Self {
        let pairs = HistoricalAggregator::new(
            Arc::clone(&executor),
            resolver.clone(),
            tracked_overrides,
        );
        let charts = ChartSeriesBuilder::new(Arc::clone(&executor));
        let rates = RateSeriesBuilder::with_chunk_size(
            Arc::clone(&executor),
            resolver.clone(),
            rate_chunk_size,
        );
        let global = GlobalAggregator::new(Arc::clone(&executor), resolver.clone(), factory_id);
        Self { executor, resolver, pairs, charts, rates, global, max_requests, rate_period }
    }

    /// Maximum number of requests allowed per [`Self::rate_period`].
    pub const fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Time window for rate limiting.
    pub const fn rate_period(&self) -> StdDuration {
        self.rate_period
    }
}
