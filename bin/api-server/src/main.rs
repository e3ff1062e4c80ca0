//! API server binary

use std::{net::SocketAddr, sync::Arc, time::Duration};

use api::ApiState;
use blocks::BlockResolver;
use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use subgraph::{DynExecutor, SubgraphClient};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let executor: DynExecutor = Arc::new(SubgraphClient::new(opts.subgraph.url));
    let block_executor: DynExecutor = Arc::new(SubgraphClient::new(opts.subgraph.block_index_url));
    let resolver = BlockResolver::with_limits(
        block_executor,
        opts.pipeline.skip_interval_secs,
        opts.pipeline.block_chunk_size,
    );

    let state = ApiState::new(
        executor,
        resolver,
        opts.subgraph.factory_id,
        opts.pipeline.tracked_overrides,
        opts.pipeline.rate_chunk_size,
        opts.api.max_requests,
        Duration::from_secs(opts.api.rate_period_secs),
    );

    let addr: SocketAddr = format!("{}:{}", opts.api.host, opts.api.port).parse()?;
    server::run(addr, state, opts.api.allowed_origins).await
}
