//! Protocol-level figures: the native reference price and factory totals.

use primitives::{Block, math, time};
use subgraph::{CachePolicy, DynExecutor, QueryExecutor, TransportError};
use tracing::warn;

use blocks::BlockResolver;

use crate::models::{FactorySnapshot, GlobalSnapshot, NativePrice, decode_optional};
use crate::queries;

/// Fetches protocol-wide state from the subgraph.
#[derive(Clone)]
pub struct GlobalAggregator {
    executor: DynExecutor,
    resolver: BlockResolver,
    factory_id: String,
}

impl std::fmt::Debug for GlobalAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalAggregator")
            .field("resolver", &self.resolver)
            .field("factory_id", &self.factory_id)
            .finish_non_exhaustive()
    }
}

impl GlobalAggregator {
    /// Create an aggregator for the factory entity at `factory_id`.
    pub const fn new(executor: DynExecutor, resolver: BlockResolver, factory_id: String) -> Self {
        Self { executor, resolver, factory_id }
    }

    /// Current native coin price in USD with its one-day percent move.
    ///
    /// When the one-day-ago block cannot be resolved, the change is reported
    /// as 0 rather than failing the price fetch.
    pub async fn get_native_price(&self) -> Result<NativePrice, TransportError> {
        let now = time::now_timestamp();
        let (t1, _, _) = time::change_timestamps(now);

        let data = self.executor.execute(&queries::bundle(), CachePolicy::CacheFirst).await?;
        let current: Option<BundleRow> = decode_optional(&data, "bundle")?;
        let price_usd = current.map_or(0.0, |b| b.native_price);

        let one_day_block = self.resolver.resolve_one(t1).await?;
        let one_day_price = self.bundle_price_at(one_day_block).await?;

        let one_day_change_percent =
            one_day_price.map_or(0.0, |previous| math::percent_change(price_usd, previous));
        Ok(NativePrice { price_usd, one_day_change_percent })
    }

    async fn bundle_price_at(&self, block: Block) -> Result<Option<f64>, TransportError> {
        if block.is_sentinel() {
            return Ok(None);
        }
        let data = self
            .executor
            .execute(&queries::bundle_at_block(block.number), CachePolicy::CacheFirst)
            .await?;
        let row: Option<BundleRow> = decode_optional(&data, "bundleAtBlock")?;
        Ok(row.map(|b| b.native_price))
    }

    /// Factory totals enriched with 1d/2d/1w derived metrics. `None` when the
    /// factory entity is unknown to the subgraph.
    pub async fn get_global_snapshot(&self) -> Result<Option<GlobalSnapshot>, TransportError> {
        let now = time::now_timestamp();
        let (t1, t2, t_week) = time::change_timestamps(now);
        let resolved = self.resolver.resolve_many(&[t1, t2, t_week]).await?;
        let (b1, b2, b_week) = (resolved[0], resolved[1], resolved[2]);

        let data = self
            .executor
            .execute(&queries::factory(&self.factory_id), CachePolicy::CacheFirst)
            .await?;
        let factory: Option<FactorySnapshot> = decode_optional(&data, "factory")?;
        let Some(factory) = factory else {
            return Ok(None);
        };

        let (one_day, two_day, one_week) = futures::future::join3(
            self.factory_at(b1),
            self.factory_at(b2),
            self.factory_at(b_week),
        )
        .await;

        Ok(Some(derive_global(factory, one_day, two_day, one_week)))
    }

    /// Factory totals at one historical block; failures degrade to `None`
    /// with a warning, like missing history.
    async fn factory_at(&self, block: Block) -> Option<FactorySnapshot> {
        if block.is_sentinel() {
            return None;
        }
        let result: Result<Option<FactorySnapshot>, TransportError> = async {
            let data = self
                .executor
                .execute(
                    &queries::factory_at_block(&self.factory_id, block.number),
                    CachePolicy::CacheFirst,
                )
                .await?;
            decode_optional(&data, "factoryAtBlock")
        }
        .await;
        match result {
            Ok(row) => row,
            Err(e) => {
                warn!(block = block.number, error = %e, "historical factory fetch failed");
                None
            }
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleRow {
    #[serde(deserialize_with = "crate::models::decimal_f64")]
    native_price: f64,
}

fn derive_global(
    factory: FactorySnapshot,
    one_day: Option<FactorySnapshot>,
    two_day: Option<FactorySnapshot>,
    one_week: Option<FactorySnapshot>,
) -> GlobalSnapshot {
    let (one_day_volume_usd, volume_change_usd) = math::two_period_change(
        factory.total_volume_usd,
        one_day.as_ref().map_or(0.0, |f| f.total_volume_usd),
        two_day.as_ref().map_or(0.0, |f| f.total_volume_usd),
    );
    let (one_day_volume_untracked, volume_change_untracked) = math::two_period_change(
        factory.untracked_volume_usd,
        one_day.as_ref().map_or(0.0, |f| f.untracked_volume_usd),
        two_day.as_ref().map_or(0.0, |f| f.untracked_volume_usd),
    );
    let one_week_volume_usd = one_week
        .as_ref()
        .map_or(factory.total_volume_usd, |f| factory.total_volume_usd - f.total_volume_usd);
    let liquidity_change_usd = math::percent_change(
        factory.total_liquidity_usd,
        one_day.as_ref().map_or(0.0, |f| f.total_liquidity_usd),
    );

    GlobalSnapshot {
        factory,
        one_day_volume_usd,
        one_week_volume_usd,
        volume_change_usd,
        one_day_volume_untracked,
        volume_change_untracked,
        liquidity_change_usd,
    }
}
