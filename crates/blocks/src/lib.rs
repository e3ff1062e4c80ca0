//! Timestamp-to-block resolution against the block-index subgraph.

use primitives::Block;
use serde_json::{Value, json};
use subgraph::{DynExecutor, QueryBuilder, QueryDocument, TransportError, split_query};
use tracing::debug;

/// Width of the lookup window after each timestamp, in seconds. A block whose
/// indexed time falls in `[t, t + interval)` resolves the timestamp.
pub const DEFAULT_SKIP_INTERVAL: u64 = 600;

/// Timestamps per round trip when resolving in bulk.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Resolves UTC timestamps to on-chain block numbers.
#[derive(Clone)]
pub struct BlockResolver {
    executor: DynExecutor,
    skip_interval: u64,
    chunk_size: usize,
}

impl std::fmt::Debug for BlockResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockResolver")
            .field("skip_interval", &self.skip_interval)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl BlockResolver {
    /// Create a resolver with default window and chunk size.
    pub fn new(executor: DynExecutor) -> Self {
        Self::with_limits(executor, DEFAULT_SKIP_INTERVAL, DEFAULT_CHUNK_SIZE)
    }

    /// Create a resolver with explicit lookup window and chunk size.
    pub const fn with_limits(
        executor: DynExecutor,
        skip_interval: u64,
        chunk_size: usize,
    ) -> Self {
        Self { executor, skip_interval, chunk_size }
    }

    /// Resolve every timestamp to a [`Block`], preserving input order and
    /// length.
    ///
    /// A timestamp with no indexed block in its window — including timestamps
    /// beyond the indexed chain head — resolves to [`Block::SENTINEL`] rather
    /// than an error. Only a failure of the batch transport itself errors,
    /// since that means the index is unavailable, not that data is missing.
    pub async fn resolve_many(&self, timestamps: &[u64]) -> Result<Vec<Block>, TransportError> {
        if timestamps.is_empty() {
            return Ok(Vec::new());
        }

        let merged = split_query(
            blocks_template,
            &self.executor,
            &self.skip_interval,
            timestamps,
            self.chunk_size,
        )
        .await?;

        let blocks: Vec<Block> = timestamps
            .iter()
            .map(|ts| decode_block(merged.get(&format!("t{ts}"))))
            .collect();
        debug!(
            requested = timestamps.len(),
            resolved = blocks.iter().filter(|b| b.is_resolved()).count(),
            "resolved timestamps to blocks"
        );
        Ok(blocks)
    }

    /// Resolve a single timestamp.
    pub async fn resolve_one(&self, timestamp: u64) -> Result<Block, TransportError> {
        let mut blocks = self.resolve_many(&[timestamp]).await?;
        Ok(blocks.pop().unwrap_or(Block::SENTINEL))
    }
}

/// One aliased lookup per timestamp: `t<ts>: blocks(from: $a, to: $b)`.
fn blocks_template(skip_interval: &u64, chunk: &[u64]) -> QueryDocument {
    let mut builder = QueryBuilder::new("blocksAtTimestamps");
    for ts in chunk {
        let from = builder.bind("Int!", json!(ts));
        let to = builder.bind("Int!", json!(ts + skip_interval));
        let alias = format!("t{ts}");
        builder.field(
            Some(alias.as_str()),
            "blocks",
            &[("from", &from), ("to", &to)],
            "number timestamp",
        );
    }
    builder.build()
}

/// Decode one aliased result into a [`Block`], substituting the sentinel for
/// anything that is not a well-formed block row.
fn decode_block(value: Option<&Value>) -> Block {
    let Some(row) = value.and_then(|v| v.as_array()).and_then(|rows| rows.first()) else {
        return Block::SENTINEL;
    };
    match (field_u64(row, "number"), field_u64(row, "timestamp")) {
        (Some(number), Some(timestamp)) if number > 0 => Block { number, timestamp },
        _ => Block::SENTINEL,
    }
}

/// Subgraph numeric fields arrive either as JSON numbers or decimal strings.
fn field_u64(row: &Value, field: &str) -> Option<u64> {
    let value = row.get(field)?;
    value.as_u64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
