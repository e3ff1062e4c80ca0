//! Daily chart series: paginated fetch plus carry-forward gap filling.

use std::collections::BTreeMap;

use primitives::time::{DAY_SECONDS, day_bucket, now_timestamp};
use subgraph::{CachePolicy, DynExecutor, QueryDocument, QueryExecutor, TransportError};
use tracing::warn;

use crate::models::{GlobalDayRow, TimeSeriesPoint, decode_list};
use crate::queries;

/// Rows per page when walking daily rollups.
pub const DAY_DATA_PAGE_SIZE: usize = 1000;

/// Builds gap-free daily time series from subgraph day-data tables.
#[derive(Clone)]
pub struct ChartSeriesBuilder {
    executor: DynExecutor,
    page_size: usize,
}

impl std::fmt::Debug for ChartSeriesBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartSeriesBuilder")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl ChartSeriesBuilder {
    /// Create a builder with the default page size.
    pub fn new(executor: DynExecutor) -> Self {
        Self::with_page_size(executor, DAY_DATA_PAGE_SIZE)
    }

    /// Create a builder with an explicit page size.
    pub const fn with_page_size(executor: DynExecutor, page_size: usize) -> Self {
        Self { executor, page_size }
    }

    /// Daily series for one pair, degraded to an empty series on failure.
    pub async fn get_daily_series(&self, pair_id: &str) -> Vec<TimeSeriesPoint> {
        match self.fetch_daily_series(pair_id).await {
            Ok(series) => series,
            Err(e) => {
                warn!(pair = pair_id, error = %e, "daily series fetch failed; returning empty series");
                Vec::new()
            }
        }
    }

    /// Daily series for one pair, with transport failures surfaced.
    pub async fn fetch_daily_series(
        &self,
        pair_id: &str,
    ) -> Result<Vec<TimeSeriesPoint>, TransportError> {
        let rows: Vec<TimeSeriesPoint> = self
            .paginate(|skip| queries::pair_day_datas(pair_id, self.page_size, skip), "pairDayDatas")
            .await?;
        Ok(gap_fill(rows, now_timestamp()))
    }

    /// Protocol-wide daily series, degraded to an empty series on failure.
    pub async fn get_global_daily_series(&self) -> Vec<TimeSeriesPoint> {
        match self.fetch_global_daily_series().await {
            Ok(series) => series,
            Err(e) => {
                warn!(error = %e, "global daily series fetch failed; returning empty series");
                Vec::new()
            }
        }
    }

    /// Protocol-wide daily series, with transport failures surfaced.
    pub async fn fetch_global_daily_series(
        &self,
    ) -> Result<Vec<TimeSeriesPoint>, TransportError> {
        let rows: Vec<GlobalDayRow> = self
            .paginate(|skip| queries::global_day_datas(self.page_size, skip), "dexDayDatas")
            .await?;
        let points = rows
            .into_iter()
            .map(|row| TimeSeriesPoint {
                date: row.date,
                daily_volume_usd: row.daily_volume_usd,
                reserve_usd: row.total_liquidity_usd,
            })
            .collect();
        Ok(gap_fill(points, now_timestamp()))
    }

    /// Walk a paged list field to completion. The last page is the first one
    /// shorter than the page size.
    async fn paginate<T: serde::de::DeserializeOwned>(
        &self,
        make_page: impl Fn(usize) -> QueryDocument,
        key: &str,
    ) -> Result<Vec<T>, TransportError> {
        let mut rows = Vec::new();
        let mut skip = 0;
        loop {
            let data = self.executor.execute(&make_page(skip), CachePolicy::CacheFirst).await?;
            let page: Vec<T> = decode_list(&data, key)?;
            let fetched = page.len();
            rows.extend(page);
            if fetched < self.page_size {
                return Ok(rows);
            }
            skip += self.page_size;
        }
    }
}

/// Fill day gaps between the first fetched point and yesterday.
///
/// Days without a row get a zero-volume point carrying the most recently seen
/// reserve forward; liquidity persists across quiet days, volume does not.
/// Output is ascending by date with one point per day bucket.
pub fn gap_fill(rows: Vec<TimeSeriesPoint>, now: u64) -> Vec<TimeSeriesPoint> {
    let mut by_day: BTreeMap<u64, TimeSeriesPoint> =
        rows.into_iter().map(|row| (day_bucket(row.date), row)).collect();
    let Some(first) = by_day.first_key_value().map(|(_, row)| row.clone()) else {
        return Vec::new();
    };

    let mut carry = first.reserve_usd;
    let mut timestamp = first.date;
    while timestamp + DAY_SECONDS < now {
        let next = timestamp + DAY_SECONDS;
        match by_day.get(&day_bucket(next)) {
            Some(present) => carry = present.reserve_usd,
            None => {
                by_day.insert(
                    day_bucket(next),
                    TimeSeriesPoint { date: next, daily_volume_usd: 0.0, reserve_usd: carry },
                );
            }
        }
        timestamp = next;
    }

    by_day.into_values().collect()
}
