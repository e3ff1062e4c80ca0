//! Bulk enriched pair snapshots: current state plus 1-day/2-day/1-week
//! historical deltas.

use std::collections::HashMap;

use futures::future::join_all;
use primitives::{Block, math, time};
use subgraph::{CachePolicy, DynExecutor, QueryExecutor, TransportError};
use tracing::{debug, warn};

use blocks::BlockResolver;

use crate::models::{
    EnrichedPairSnapshot, HistoricalPairSnapshot, PairSnapshot, decode_list, decode_optional,
};
use crate::queries;

/// A pair that could not be enriched because a query on its path failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPair {
    /// Pair id.
    pub id: String,
    /// Human-readable failure cause.
    pub reason: String,
}

/// Best-effort result of a bulk snapshot fetch. Pairs that errored are listed
/// in `failed` instead of silently disappearing; pairs unknown to the subgraph
/// appear in neither list.
#[derive(Debug, Clone, Default)]
pub struct BulkSnapshots {
    /// Fully enriched snapshots, in current-bulk order.
    pub succeeded: Vec<EnrichedPairSnapshot>,
    /// Pairs dropped by per-pair failures.
    pub failed: Vec<FailedPair>,
}

/// Fetches current and historical pair state and computes derived metrics.
#[derive(Clone)]
pub struct HistoricalAggregator {
    executor: DynExecutor,
    resolver: BlockResolver,
    /// Pairs whose tracked metrics are replaced by untracked counterparts.
    overrides: Vec<String>,
}

impl std::fmt::Debug for HistoricalAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalAggregator")
            .field("resolver", &self.resolver)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl HistoricalAggregator {
    /// Create an aggregator over the given executor and block resolver.
    ///
    /// `overrides` lists pair ids the indexer's whitelist logic does not
    /// track reliably; their tracked metrics are rewritten from the
    /// untracked figures.
    pub const fn new(
        executor: DynExecutor,
        resolver: BlockResolver,
        overrides: Vec<String>,
    ) -> Self {
        Self { executor, resolver, overrides }
    }

    /// Fetch enriched snapshots for `pair_ids`.
    ///
    /// Never fails as a whole: a transport failure before any pair could be
    /// processed marks every requested pair as failed, and per-pair failures
    /// only drop that pair.
    pub async fn get_bulk_snapshots(
        &self,
        pair_ids: &[String],
        native_price: f64,
    ) -> BulkSnapshots {
        match self.fetch_bulk(pair_ids, native_price).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(error = %e, pairs = pair_ids.len(), "bulk snapshot fetch failed");
                BulkSnapshots {
                    succeeded: Vec::new(),
                    failed: pair_ids
                        .iter()
                        .map(|id| FailedPair { id: id.clone(), reason: e.to_string() })
                        .collect(),
                }
            }
        }
    }

    async fn fetch_bulk(
        &self,
        pair_ids: &[String],
        native_price: f64,
    ) -> Result<BulkSnapshots, TransportError> {
        let now = time::now_timestamp();
        let (t1, t2, t_week) = time::change_timestamps(now);
        let resolved = self.resolver.resolve_many(&[t1, t2, t_week]).await?;
        let (b1, b2, b_week) = (resolved[0], resolved[1], resolved[2]);

        let data = self
            .executor
            .execute(&queries::pairs_bulk(pair_ids), CachePolicy::CacheFirst)
            .await?;
        let pairs: Vec<PairSnapshot> = decode_list(&data, "pairs")?;

        let (one_day, two_day, one_week) = futures::future::join3(
            self.historical_map(pair_ids, b1),
            self.historical_map(pair_ids, b2),
            self.historical_map(pair_ids, b_week),
        )
        .await;

        let outcomes = join_all(pairs.into_iter().map(|pair| {
            self.enrich(pair, &one_day, &two_day, &one_week, b1, b2, b_week, native_price)
        }))
        .await;

        let mut snapshots = BulkSnapshots::default();
        for outcome in outcomes {
            match outcome {
                Ok(snapshot) => snapshots.succeeded.push(snapshot),
                Err(failed) => {
                    warn!(pair = %failed.id, reason = %failed.reason, "dropping pair from bulk snapshot");
                    snapshots.failed.push(failed);
                }
            }
        }
        Ok(snapshots)
    }

    /// Reduced snapshots of all `ids` at one historical block, keyed by pair
    /// id. A sentinel block or a failed bulk fetch yields an empty map; the
    /// per-pair repair path fills the holes.
    async fn historical_map(
        &self,
        ids: &[String],
        block: Block,
    ) -> HashMap<String, HistoricalPairSnapshot> {
        if block.is_sentinel() {
            return HashMap::new();
        }
        let result: Result<Vec<HistoricalPairSnapshot>, TransportError> = async {
            let data = self
                .executor
                .execute(&queries::pairs_at_block(ids, block.number), CachePolicy::CacheFirst)
                .await?;
            decode_list(&data, "pairsAtBlock")
        }
        .await;

        match result {
            Ok(rows) => rows.into_iter().map(|row| (row.id.clone(), row)).collect(),
            Err(e) => {
                warn!(
                    block = block.number,
                    error = %e,
                    "bulk historical fetch failed; per-pair repair queries will fill in"
                );
                HashMap::new()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn enrich(
        &self,
        pair: PairSnapshot,
        one_day_map: &HashMap<String, HistoricalPairSnapshot>,
        two_day_map: &HashMap<String, HistoricalPairSnapshot>,
        one_week_map: &HashMap<String, HistoricalPairSnapshot>,
        b1: Block,
        b2: Block,
        b_week: Block,
        native_price: f64,
    ) -> Result<EnrichedPairSnapshot, FailedPair> {
        // All three repairs for this pair run concurrently and must settle
        // before metrics are derived.
        let result = futures::future::try_join3(
            self.history_for(&pair.id, one_day_map, b1),
            self.history_for(&pair.id, two_day_map, b2),
            self.history_for(&pair.id, one_week_map, b_week),
        )
        .await;
        match result {
            Ok((one_day, two_day, one_week)) => {
                Ok(derive_metrics(pair, one_day, two_day, one_week, native_price, &self.overrides))
            }
            Err(e) => Err(FailedPair { id: pair.id, reason: e.to_string() }),
        }
    }

    /// Look one pair up in a bulk historical result, issuing an exact-block
    /// repair query on a miss. `None` means the pair genuinely has no state
    /// at that block (or the block itself never resolved).
    async fn history_for(
        &self,
        id: &str,
        map: &HashMap<String, HistoricalPairSnapshot>,
        block: Block,
    ) -> Result<Option<HistoricalPairSnapshot>, TransportError> {
        if let Some(hit) = map.get(id) {
            return Ok(Some(hit.clone()));
        }
        if block.is_sentinel() {
            return Ok(None);
        }
        debug!(pair = id, block = block.number, "bulk history missing; issuing repair query");
        let data = self
            .executor
            .execute(&queries::pair_at_block(id, block.number), CachePolicy::CacheFirst)
            .await?;
        decode_optional(&data, "pairAtBlock")
    }
}

/// Compute derived dashboard metrics from the current snapshot and up to
/// three historical samples.
///
/// Pairs created after a reference block have no historical row there, so the
/// no-history fallbacks below also cover the new-pair case. The override-list
/// rewrite runs last and replaces tracked figures wholesale, including any
/// fallback value just assigned.
pub(crate) fn derive_metrics(
    pair: PairSnapshot,
    one_day: Option<HistoricalPairSnapshot>,
    two_day: Option<HistoricalPairSnapshot>,
    one_week: Option<HistoricalPairSnapshot>,
    native_price: f64,
    overrides: &[String],
) -> EnrichedPairSnapshot {
    let (mut one_day_volume_usd, mut volume_change_usd) = math::two_period_change(
        pair.volume_usd,
        one_day.as_ref().map_or(0.0, |s| s.volume_usd),
        two_day.as_ref().map_or(0.0, |s| s.volume_usd),
    );
    let (one_day_volume_untracked, volume_change_untracked) = math::two_period_change(
        pair.untracked_volume_usd,
        one_day.as_ref().map_or(0.0, |s| s.untracked_volume_usd),
        two_day.as_ref().map_or(0.0, |s| s.untracked_volume_usd),
    );

    let mut one_week_volume_usd =
        one_week.as_ref().map_or(pair.volume_usd, |s| pair.volume_usd - s.volume_usd);
    let one_week_volume_untracked = one_week
        .as_ref()
        .map_or(pair.untracked_volume_usd, |s| pair.untracked_volume_usd - s.untracked_volume_usd);

    let mut tracked_reserve_usd = pair.tracked_reserve_native * native_price;
    let liquidity_change_usd =
        math::percent_change(pair.reserve_usd, one_day.as_ref().map_or(0.0, |s| s.reserve_usd));

    if one_day.is_none() {
        one_day_volume_usd = pair.volume_usd;
    }
    if one_week.is_none() {
        one_week_volume_usd = pair.volume_usd;
    }

    if overrides.iter().any(|o| o.eq_ignore_ascii_case(&pair.id)) {
        one_day_volume_usd = one_day_volume_untracked;
        one_week_volume_usd = one_week_volume_untracked;
        volume_change_usd = volume_change_untracked;
        tracked_reserve_usd = pair.reserve_usd;
    }

    EnrichedPairSnapshot {
        pair,
        one_day_volume_usd,
        one_week_volume_usd,
        volume_change_usd,
        one_day_volume_untracked,
        one_week_volume_untracked,
        volume_change_untracked,
        tracked_reserve_usd,
        liquidity_change_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use std::sync::Arc;
    use subgraph::{QueryDocument, QueryExecutor};

    fn pair(id: &str, volume: f64, untracked: f64, reserve: f64, tracked_native: f64) -> PairSnapshot {
        serde_json::from_value(json!({
            "id": id,
            "txCount": "10",
            "token0": { "id": "0xt0", "symbol": "AAA", "name": "Token A", "totalLiquidity": "1", "derivedNative": "1" },
            "token1": { "id": "0xt1", "symbol": "BBB", "name": "Token B", "totalLiquidity": "1", "derivedNative": "1" },
            "reserve0": "5",
            "reserve1": "5",
            "reserveUSD": reserve.to_string(),
            "totalSupply": "1",
            "trackedReserveNative": tracked_native.to_string(),
            "volumeUSD": volume.to_string(),
            "untrackedVolumeUSD": untracked.to_string(),
            "token0Price": "1",
            "token1Price": "1",
            "createdAtTimestamp": "1600000000",
            "createdAtBlockNumber": "1"
        }))
        .unwrap()
    }

    fn history(id: &str, volume: f64, untracked: f64, reserve: f64) -> HistoricalPairSnapshot {
        HistoricalPairSnapshot {
            id: id.to_owned(),
            reserve_usd: reserve,
            tracked_reserve_native: reserve / 2.0,
            volume_usd: volume,
            untracked_volume_usd: untracked,
        }
    }

    #[test]
    fn derives_volume_and_liquidity_changes() {
        let enriched = derive_metrics(
            pair("0xp", 250.0, 300.0, 220.0, 50.0),
            Some(history("0xp", 160.0, 200.0, 200.0)),
            Some(history("0xp", 100.0, 140.0, 180.0)),
            Some(history("0xp", 50.0, 80.0, 150.0)),
            2.0,
            &[],
        );
        // Tracked counter 100 -> 160 -> 250: one-day 90, previous period 60.
        assert!((enriched.one_day_volume_usd - 90.0).abs() < 1e-9);
        assert!((enriched.volume_change_usd - 50.0).abs() < 1e-9);
        assert!((enriched.one_week_volume_usd - 200.0).abs() < 1e-9);
        assert!((enriched.one_day_volume_untracked - 100.0).abs() < 1e-9);
        assert!((enriched.tracked_reserve_usd - 100.0).abs() < 1e-9);
        assert!((enriched.liquidity_change_usd - 10.0).abs() < 1e-9);
    }

    #[test]
    fn new_pair_uses_lifetime_volume() {
        // No history anywhere: one-day and one-week both equal the lifetime
        // counter.
        let enriched = derive_metrics(pair("0xp", 500.0, 600.0, 100.0, 10.0), None, None, None, 1.0, &[]);
        assert!((enriched.one_day_volume_usd - 500.0).abs() < 1e-9);
        assert!((enriched.one_week_volume_usd - 500.0).abs() < 1e-9);
        assert_eq!(enriched.volume_change_usd, 0.0);
        assert_eq!(enriched.liquidity_change_usd, 0.0);
    }

    #[test]
    fn override_pair_takes_untracked_metrics() {
        let overrides = vec!["0xOVERRIDE".to_owned()];
        let enriched = derive_metrics(
            pair("0xoverride", 250.0, 300.0, 220.0, 50.0),
            Some(history("0xoverride", 160.0, 180.0, 200.0)),
            Some(history("0xoverride", 100.0, 120.0, 180.0)),
            Some(history("0xoverride", 50.0, 60.0, 150.0)),
            2.0,
            &overrides,
        );
        assert!((enriched.one_day_volume_usd - enriched.one_day_volume_untracked).abs() < 1e-12);
        assert!((enriched.one_week_volume_usd - enriched.one_week_volume_untracked).abs() < 1e-12);
        assert!((enriched.volume_change_usd - enriched.volume_change_untracked).abs() < 1e-12);
        // Exact equality required: the override replaces, it does not derive.
        assert_eq!(enriched.tracked_reserve_usd, enriched.pair.reserve_usd);
    }

    #[test]
    fn override_applies_after_new_pair_fallback() {
        // An override pair with no history at all: the fallback assigns the
        // lifetime tracked counter first, then the override stomps it with
        // the untracked figure.
        let enriched =
            derive_metrics(pair("0xo", 500.0, 620.0, 100.0, 10.0), None, None, None, 1.0, &["0xo".to_owned()]);
        assert!((enriched.one_day_volume_usd - 620.0).abs() < 1e-9);
        assert!((enriched.one_week_volume_usd - 620.0).abs() < 1e-9);
    }

    /// Scripted subgraph backend for aggregator flows.
    #[derive(Default)]
    struct MockDex {
        /// Block numbers answered positionally for the resolver's batch, so
        /// the table does not depend on wall-clock timestamps.
        blocks: Vec<u64>,
        /// Current bulk rows, pre-encoded.
        pairs: Vec<Value>,
        /// (pair id, block number) -> historical row.
        history: Vec<((String, u64), Value)>,
        /// Bulk historical queries fail at the transport level.
        fail_bulk_history: bool,
        /// Repair queries fail at the transport level.
        fail_repairs: bool,
        /// The current bulk query fails at the transport level.
        fail_current: bool,
    }

    impl MockDex {
        fn history_row(&self, id: &str, block: u64) -> Option<Value> {
            self.history
                .iter()
                .find(|((hid, hblock), _)| hid == id && *hblock == block)
                .map(|(_, row)| row.clone())
        }
    }

    #[async_trait]
    impl QueryExecutor for MockDex {
        async fn execute(
            &self,
            query: &QueryDocument,
            _policy: subgraph::CachePolicy,
        ) -> Result<Map<String, Value>, TransportError> {
            let mut data = Map::new();
            match query.name.as_str() {
                "blocksAtTimestamps" => {
                    for (i, alias) in query.aliases.iter().enumerate() {
                        let ts: u64 = alias.trim_start_matches('t').parse().unwrap();
                        let rows = self
                            .blocks
                            .get(i)
                            .map_or(json!([]), |n| json!([{ "number": n, "timestamp": ts + 2 }]));
                        data.insert(alias.clone(), rows);
                    }
                }
                "pairsBulk" => {
                    if self.fail_current {
                        return Err(TransportError::MissingData);
                    }
                    data.insert("pairs".to_owned(), Value::Array(self.pairs.clone()));
                }
                "pairsAtBlock" => {
                    if self.fail_bulk_history {
                        return Err(TransportError::MissingData);
                    }
                    let ids: Vec<String> =
                        serde_json::from_value(query.variables["v0"].clone()).unwrap();
                    let block = query.variables["v1"].as_u64().unwrap();
                    let rows: Vec<Value> =
                        ids.iter().filter_map(|id| self.history_row(id, block)).collect();
                    data.insert("pairsAtBlock".to_owned(), Value::Array(rows));
                }
                "pairAtBlock" => {
                    if self.fail_repairs {
                        return Err(TransportError::MissingData);
                    }
                    let id = query.variables["v0"].as_str().unwrap();
                    let block = query.variables["v1"].as_u64().unwrap();
                    data.insert(
                        "pairAtBlock".to_owned(),
                        self.history_row(id, block).unwrap_or(Value::Null),
                    );
                }
                other => panic!("unexpected query {other}"),
            }
            Ok(data)
        }
    }

    fn pair_row(id: &str, volume: f64, untracked: f64, reserve: f64) -> Value {
        serde_json::to_value(pair(id, volume, untracked, reserve, reserve / 2.0)).unwrap()
    }

    fn history_json(id: &str, volume: f64, untracked: f64, reserve: f64) -> Value {
        json!({
            "id": id,
            "reserveUSD": reserve,
            "trackedReserveNative": reserve / 2.0,
            "volumeUSD": volume,
            "untrackedVolumeUSD": untracked,
        })
    }

    fn aggregator(mock: MockDex, overrides: Vec<String>) -> HistoricalAggregator {
        let executor: DynExecutor = Arc::new(mock);
        let resolver = BlockResolver::new(Arc::clone(&executor));
        HistoricalAggregator::new(executor, resolver, overrides)
    }

    /// Blocks answered for the 1-day/2-day/1-week resolution batch, in order.
    fn change_blocks() -> Vec<u64> {
        vec![100, 200, 300]
    }

    #[tokio::test]
    async fn enriches_pairs_with_bulk_history() {
        let mock = MockDex {
            blocks: change_blocks(),
            pairs: vec![pair_row("0xa", 250.0, 300.0, 220.0)],
            history: vec![
                (("0xa".to_owned(), 100), history_json("0xa", 160.0, 200.0, 200.0)),
                (("0xa".to_owned(), 200), history_json("0xa", 100.0, 140.0, 180.0)),
                (("0xa".to_owned(), 300), history_json("0xa", 50.0, 80.0, 150.0)),
            ],
            ..Default::default()
        };
        let result =
            aggregator(mock, Vec::new()).get_bulk_snapshots(&["0xa".to_owned()], 1.0).await;
        assert!(result.failed.is_empty());
        assert_eq!(result.succeeded.len(), 1);
        assert!((result.succeeded[0].one_day_volume_usd - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn repair_queries_fill_bulk_holes() {
        // The bulk historical path is down entirely; exact-block repair
        // queries carry every pair instead.
        let mock = MockDex {
            blocks: change_blocks(),
            pairs: vec![pair_row("0xa", 250.0, 300.0, 220.0), pair_row("0xb", 80.0, 90.0, 40.0)],
            history: vec![
                (("0xa".to_owned(), 100), history_json("0xa", 160.0, 200.0, 200.0)),
                (("0xb".to_owned(), 100), history_json("0xb", 30.0, 35.0, 20.0)),
            ],
            fail_bulk_history: true,
            ..Default::default()
        };

        let result = aggregator(mock, Vec::new())
            .get_bulk_snapshots(&["0xa".to_owned(), "0xb".to_owned()], 1.0)
            .await;
        assert!(result.failed.is_empty());
        assert_eq!(result.succeeded.len(), 2);
        let b = &result.succeeded[1];
        assert_eq!(b.pair.id, "0xb");
        // 0xb has only a one-day sample: delta 50 against a zero two-day base.
        assert!((b.one_day_volume_usd - 50.0).abs() < 1e-9);
        // No one-week sample: falls back to lifetime volume.
        assert!((b.one_week_volume_usd - 80.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn pair_absent_from_all_history_gets_lifetime_volume() {
        let mock = MockDex {
            blocks: change_blocks(),
            pairs: vec![pair_row("0xnew", 500.0, 600.0, 100.0)],
            history: Vec::new(),
            ..Default::default()
        };
        let result =
            aggregator(mock, Vec::new()).get_bulk_snapshots(&["0xnew".to_owned()], 1.0).await;
        let snapshot = &result.succeeded[0];
        assert!((snapshot.one_day_volume_usd - 500.0).abs() < 1e-9);
        assert!((snapshot.one_week_volume_usd - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_repair_drops_only_that_pair() {
        let mock = MockDex {
            blocks: change_blocks(),
            pairs: vec![pair_row("0xa", 250.0, 300.0, 220.0), pair_row("0xb", 80.0, 90.0, 40.0)],
            history: vec![
                (("0xa".to_owned(), 100), history_json("0xa", 160.0, 200.0, 200.0)),
                (("0xa".to_owned(), 200), history_json("0xa", 100.0, 140.0, 180.0)),
                (("0xa".to_owned(), 300), history_json("0xa", 50.0, 80.0, 150.0)),
            ],
            fail_repairs: true,
            ..Default::default()
        };
        let result = aggregator(mock, Vec::new())
            .get_bulk_snapshots(&["0xa".to_owned(), "0xb".to_owned()], 1.0)
            .await;
        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.succeeded[0].pair.id, "0xa");
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, "0xb");
    }

    #[tokio::test]
    async fn current_bulk_failure_fails_every_requested_pair() {
        let mock = MockDex {
            blocks: change_blocks(),
            fail_current: true,
            ..Default::default()
        };
        let ids = vec!["0xa".to_owned(), "0xb".to_owned()];
        let result = aggregator(mock, Vec::new()).get_bulk_snapshots(&ids, 1.0).await;
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.len(), 2);
    }
}
