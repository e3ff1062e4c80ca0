//! Chunked execution of oversized batch queries.

use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{CachePolicy, QueryExecutor, TransportError};
use crate::query::QueryDocument;

/// Execute one logical batch over as many round trips as `chunk_size` demands
/// and merge the aliased results into a single flat mapping.
///
/// `jobs` is partitioned into consecutive chunks of at most `chunk_size`
/// elements, preserving order. `template` builds one composite document per
/// chunk from the shared `static_args` and that chunk; aliases must embed each
/// job's own identity so keys never collide across chunks. Chunks execute
/// concurrently with no ordering constraint between them.
///
/// Results are cache-first: chunked batches are historical reads that never
/// change once indexed. The first failing chunk's error propagates; callers
/// that want partial results catch it at their level.
pub async fn split_query<E, S, J, F>(
    template: F,
    executor: &E,
    static_args: &S,
    jobs: &[J],
    chunk_size: usize,
) -> Result<Map<String, Value>, TransportError>
where
    E: QueryExecutor + ?Sized,
    S: ?Sized,
    F: Fn(&S, &[J]) -> QueryDocument,
{
    let mut merged = Map::new();
    if jobs.is_empty() {
        return Ok(merged);
    }

    let chunk_size = chunk_size.max(1);
    let documents: Vec<QueryDocument> =
        jobs.chunks(chunk_size).map(|chunk| template(static_args, chunk)).collect();
    debug!(jobs = jobs.len(), chunks = documents.len(), "splitting batch query");

    let results = try_join_all(
        documents.iter().map(|doc| executor.execute(doc, CachePolicy::CacheFirst)),
    )
    .await?;

    for data in results {
        merged.extend(data);
    }
    Ok(merged)
}
