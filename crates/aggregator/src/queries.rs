//! Query document catalog for the DEX subgraph.
//!
//! Every argument is bound as a variable through [`QueryBuilder`]; entity ids
//! and block numbers never appear in query text. Historical variants take a
//! `block` argument and read the entity state as of that block.

use primitives::Block;
use serde_json::json;
use subgraph::{QueryBuilder, QueryDocument};

/// Shared selection for full pair snapshots.
pub const PAIR_FIELDS_FRAGMENT: &str = "fragment PairFields on Pair { \
     id txCount \
     token0 { id symbol name totalLiquidity derivedNative } \
     token1 { id symbol name totalLiquidity derivedNative } \
     reserve0 reserve1 reserveUSD totalSupply trackedReserveNative \
     volumeUSD untrackedVolumeUSD token0Price token1Price \
     createdAtTimestamp createdAtBlockNumber }";

/// Reduced selection for historical pair snapshots.
const HISTORICAL_PAIR_SELECTION: &str =
    "id reserveUSD trackedReserveNative volumeUSD untrackedVolumeUSD";

/// Current full snapshots for a set of pairs, keyed `pairs`.
pub fn pairs_bulk(ids: &[String]) -> QueryDocument {
    let mut builder = QueryBuilder::new("pairsBulk");
    let ids = builder.bind("[ID!]!", json!(ids));
    builder.field(None, "pairs", &[("ids", &ids)], "...PairFields");
    builder.fragment(PAIR_FIELDS_FRAGMENT);
    builder.build()
}

/// Reduced snapshots for a set of pairs at one historical block, keyed
/// `pairs`.
pub fn pairs_at_block(ids: &[String], block: u64) -> QueryDocument {
    let mut builder = QueryBuilder::new("pairsAtBlock");
    let ids = builder.bind("[ID!]!", json!(ids));
    let block = builder.bind("Int!", json!(block));
    builder.field(None, "pairsAtBlock", &[("ids", &ids), ("block", &block)], HISTORICAL_PAIR_SELECTION);
    builder.build()
}

/// Reduced snapshot for one pair at one historical block, keyed `pairAtBlock`.
pub fn pair_at_block(id: &str, block: u64) -> QueryDocument {
    let mut builder = QueryBuilder::new("pairAtBlock");
    let id = builder.bind("ID!", json!(id));
    let block = builder.bind("Int!", json!(block));
    builder.field(None, "pairAtBlock", &[("id", &id), ("block", &block)], HISTORICAL_PAIR_SELECTION);
    builder.build()
}

/// One page of a pair's daily rollups, keyed `pairDayDatas`.
pub fn pair_day_datas(pair: &str, first: usize, skip: usize) -> QueryDocument {
    let mut builder = QueryBuilder::new("pairDayDatas");
    let pair = builder.bind("ID!", json!(pair));
    let first = builder.bind("Int!", json!(first));
    let skip = builder.bind("Int!", json!(skip));
    builder.field(
        None,
        "pairDayDatas",
        &[("pair", &pair), ("first", &first), ("skip", &skip)],
        "date dailyVolumeUSD reserveUSD",
    );
    builder.build()
}

/// One page of protocol-wide daily rollups, keyed `dexDayDatas`.
pub fn global_day_datas(first: usize, skip: usize) -> QueryDocument {
    let mut builder = QueryBuilder::new("dexDayDatas");
    let first = builder.bind("Int!", json!(first));
    let skip = builder.bind("Int!", json!(skip));
    builder.field(
        None,
        "dexDayDatas",
        &[("first", &first), ("skip", &skip)],
        "date dailyVolumeUSD totalLiquidityUSD",
    );
    builder.build()
}

/// Pair exchange rates at each of the given blocks, aliased `t<timestamp>`.
pub fn hourly_rates_template(pair: &str, blocks: &[Block]) -> QueryDocument {
    let mut builder = QueryBuilder::new("pairRatesAtBlocks");
    for block in blocks {
        let id = builder.bind("ID!", json!(pair));
        let number = builder.bind("Int!", json!(block.number));
        let alias = format!("t{}", block.timestamp);
        builder.field(
            Some(alias.as_str()),
            "pairAtBlock",
            &[("id", &id), ("block", &number)],
            "token0Price token1Price",
        );
    }
    builder.build()
}

/// Token and bundle prices at each of the given blocks.
///
/// Two alias families share one document: `t<timestamp>` selects the token's
/// native-denominated price and `b<timestamp>` the bundle's native price, so
/// the USD price at each block comes back in a single round trip.
pub fn token_prices_template(token: &str, blocks: &[Block]) -> QueryDocument {
    let mut builder = QueryBuilder::new("tokenPricesAtBlocks");
    for block in blocks {
        let id = builder.bind("ID!", json!(token));
        let number = builder.bind("Int!", json!(block.number));
        let alias = format!("t{}", block.timestamp);
        builder.field(
            Some(alias.as_str()),
            "tokenAtBlock",
            &[("id", &id), ("block", &number)],
            "derivedNative",
        );
    }
    for block in blocks {
        let id = builder.bind("ID!", json!(BUNDLE_ID));
        let number = builder.bind("Int!", json!(block.number));
        let alias = format!("b{}", block.timestamp);
        builder.field(
            Some(alias.as_str()),
            "bundleAtBlock",
            &[("id", &id), ("block", &number)],
            "nativePrice",
        );
    }
    builder.build()
}

/// Singleton id of the global price bundle.
pub const BUNDLE_ID: &str = "1";

/// Current native reference price, keyed `bundle`.
pub fn bundle() -> QueryDocument {
    let mut builder = QueryBuilder::new("bundle");
    let id = builder.bind("ID!", json!(BUNDLE_ID));
    builder.field(None, "bundle", &[("id", &id)], "nativePrice");
    builder.build()
}

/// Native reference price at a historical block, keyed `bundleAtBlock`.
pub fn bundle_at_block(block: u64) -> QueryDocument {
    let mut builder = QueryBuilder::new("bundleAtBlock");
    let id = builder.bind("ID!", json!(BUNDLE_ID));
    let block = builder.bind("Int!", json!(block));
    builder.field(None, "bundleAtBlock", &[("id", &id), ("block", &block)], "nativePrice");
    builder.build()
}

const FACTORY_SELECTION: &str =
    "totalVolumeUSD untrackedVolumeUSD totalLiquidityUSD txCount pairCount";

/// Current factory totals, keyed `factory`.
pub fn factory(id: &str) -> QueryDocument {
    let mut builder = QueryBuilder::new("factory");
    let id = builder.bind("ID!", json!(id));
    builder.field(None, "factory", &[("id", &id)], FACTORY_SELECTION);
    builder.build()
}

/// Factory totals at a historical block, keyed `factoryAtBlock`.
pub fn factory_at_block(id: &str, block: u64) -> QueryDocument {
    let mut builder = QueryBuilder::new("factoryAtBlock");
    let id = builder.bind("ID!", json!(id));
    let block = builder.bind("Int!", json!(block));
    builder.field(None, "factoryAtBlock", &[("id", &id), ("block", &block)], FACTORY_SELECTION);
    builder.build()
}

const TXN_PAIR_SELECTION: &str = "pair { token0 { id symbol } token1 { id symbol } }";

/// Recent mints, burns and swaps for one pair.
pub fn pair_transactions(pair: &str) -> QueryDocument {
    let mut builder = QueryBuilder::new("pairTransactions");

    let id = builder.bind("ID!", json!(pair));
    let first = builder.bind("Int!", json!(20));
    builder.field(
        None,
        "mints",
        &[("pair", &id), ("first", &first)],
        &format!(
            "transactionId timestamp {TXN_PAIR_SELECTION} to liquidity amount0 amount1 amountUSD"
        ),
    );

    let id = builder.bind("ID!", json!(pair));
    let first = builder.bind("Int!", json!(20));
    builder.field(
        None,
        "burns",
        &[("pair", &id), ("first", &first)],
        &format!(
            "transactionId timestamp {TXN_PAIR_SELECTION} sender liquidity amount0 amount1 amountUSD"
        ),
    );

    let id = builder.bind("ID!", json!(pair));
    let first = builder.bind("Int!", json!(30));
    builder.field(
        None,
        "swaps",
        &[("pair", &id), ("first", &first)],
        &format!(
            "transactionId timestamp {TXN_PAIR_SELECTION} to \
             amount0In amount0Out amount1In amount1Out amountUSD"
        ),
    );

    builder.build()
}
