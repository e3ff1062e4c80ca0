//! Swapscope configuration
use clap::Parser;
use url::Url;

/// Origins allowed by default when none are configured.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "https://swapscope.xyz,https://www.swapscope.xyz";

/// Subgraph endpoint configuration options
#[derive(Debug, Clone, Parser)]
pub struct SubgraphOpts {
    /// DEX subgraph URL
    #[clap(long, env = "SUBGRAPH_URL")]
    pub url: Url,
    /// Block index subgraph URL
    #[clap(long, env = "BLOCK_SUBGRAPH_URL")]
    pub block_index_url: Url,
    /// Id of the factory entity holding protocol totals
    #[clap(long, env = "FACTORY_ID")]
    pub factory_id: String,
}

/// Fetch pipeline tuning options
#[derive(Debug, Clone, Parser)]
pub struct PipelineOpts {
    /// Block lookup window after each timestamp, in seconds
    #[clap(long, env = "BLOCK_SKIP_INTERVAL_SECS", default_value = "600")]
    pub skip_interval_secs: u64,
    /// Timestamps per block-resolution round trip
    #[clap(long, env = "BLOCK_CHUNK_SIZE", default_value = "100")]
    pub block_chunk_size: usize,
    /// Blocks per rate-sampling round trip
    #[clap(long, env = "RATE_CHUNK_SIZE", default_value = "100")]
    pub rate_chunk_size: usize,
    /// Pairs whose tracked metrics are replaced by untracked counterparts
    /// (comma-separated pair ids)
    #[clap(long, env = "TRACKED_OVERRIDES", value_delimiter = ',', num_args = 0..)]
    pub tracked_overrides: Vec<String>,
}

/// API server configuration options
#[derive(Debug, Clone, Parser)]
pub struct ApiOpts {
    /// API server host
    #[clap(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// API server port
    #[clap(long, env = "API_PORT", default_value = "3000")]
    pub port: u16,
    /// Origins allowed to call the API (comma-separated)
    #[clap(
        long,
        env = "API_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,
    /// Maximum requests per rate limiting window
    #[clap(long, env = "API_MAX_REQUESTS", default_value = "1000")]
    pub max_requests: u64,
    /// Rate limiting window in seconds
    #[clap(long, env = "API_RATE_PERIOD_SECS", default_value = "1")]
    pub rate_period_secs: u64,
}

/// CLI options for swapscope
#[derive(Debug, Clone, Parser)]
pub struct Opts {
    /// Subgraph endpoint configuration
    #[clap(flatten)]
    pub subgraph: SubgraphOpts,

    /// Fetch pipeline tuning
    #[clap(flatten)]
    pub pipeline: PipelineOpts,

    /// API server configuration
    #[clap(flatten)]
    pub api: ApiOpts,
}
