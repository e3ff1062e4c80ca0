//! GraphQL query layer for the swapscope indexing service.
//!
//! The pipeline builds aliased batch documents with [`query::QueryBuilder`],
//! executes them through a [`client::QueryExecutor`] and fans oversized job
//! lists out over multiple round trips with [`batch::split_query`]. The
//! executor owns all caching; callers pick a [`client::CachePolicy`] per call.

/// Chunked batch execution
pub mod batch;
/// Query executor trait and HTTP client
pub mod client;
/// Aliased query document construction
pub mod query;

pub use batch::split_query;
pub use client::{CachePolicy, DynExecutor, QueryExecutor, SubgraphClient, TransportError};
pub use query::{Binding, QueryBuilder, QueryDocument};
