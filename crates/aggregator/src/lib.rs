//! Historical aggregation over the DEX subgraph.
//!
//! Orchestrates the block resolver and batched queries into the shapes the
//! dashboard renders: enriched pair snapshots with 1d/2d/1w deltas, gap-free
//! daily chart series, hourly rate candles, token price series, and
//! protocol-level figures.

/// Daily chart series with carry-forward gap filling
pub mod chart;
/// Protocol-level snapshot and native reference price
pub mod global;
/// Row types decoded from subgraph responses
pub mod models;
/// Query document catalog
pub mod queries;
/// Hourly rate candles and token price series
pub mod rates;
/// Bulk enriched pair snapshots
pub mod snapshots;
/// Recent mint/burn/swap feed
pub mod transactions;

pub use chart::ChartSeriesBuilder;
pub use global::GlobalAggregator;
pub use rates::RateSeriesBuilder;
pub use snapshots::{BulkSnapshots, FailedPair, HistoricalAggregator};
pub use transactions::get_pair_transactions;
