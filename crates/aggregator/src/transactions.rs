//! Recent activity feed for a pair.

use subgraph::{CachePolicy, DynExecutor, QueryExecutor, TransportError};

use crate::models::{TransactionsFeed, decode_list};
use crate::queries;

/// Fetch the latest mints, burns and swaps for one pair.
///
/// Always bypasses the cache: the feed changes between calls.
pub async fn get_pair_transactions(
    executor: &DynExecutor,
    pair_id: &str,
) -> Result<TransactionsFeed, TransportError> {
    let data = executor.execute(&queries::pair_transactions(pair_id), CachePolicy::NoCache).await?;
    Ok(TransactionsFeed {
        mints: decode_list(&data, "mints")?,
        burns: decode_list(&data, "burns")?,
        swaps: decode_list(&data, "swaps")?,
    })
}
