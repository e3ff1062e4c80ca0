//! End-to-end pipeline scenarios against an HTTP subgraph stand-in.

use std::sync::Arc;

use blocks::BlockResolver;
use primitives::Block;
use serde_json::{Map, json};
use subgraph::{DynExecutor, SubgraphClient, split_query};
use url::Url;

use aggregator::queries;

fn hourly_grid() -> Vec<u64> {
    // 25 hour-spaced timestamps spanning "yesterday to now".
    (0..25).map(|h| 1_650_000_000 + h * 3600).collect()
}

fn block_index_body(timestamps: &[u64]) -> String {
    let mut data = Map::new();
    for ts in timestamps {
        data.insert(
            format!("t{ts}"),
            json!([{ "number": (ts / 12).to_string(), "timestamp": (ts + 4).to_string() }]),
        );
    }
    json!({ "data": data }).to_string()
}

fn client_for(server: &mockito::Server) -> DynExecutor {
    Arc::new(SubgraphClient::new(Url::parse(&server.url()).unwrap()))
}

#[tokio::test]
async fn twenty_five_hourly_timestamps_resolve_to_one_block_each() {
    let mut server = mockito::Server::new_async().await;
    let timestamps = hourly_grid();
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(block_index_body(&timestamps))
        .create_async()
        .await;

    let resolver = BlockResolver::new(client_for(&server));
    let resolved = resolver.resolve_many(&timestamps).await.unwrap();

    assert_eq!(resolved.len(), 25);
    assert!(resolved.len() <= timestamps.len());
    for (ts, block) in timestamps.iter().zip(&resolved) {
        assert!(block.is_resolved());
        assert!(block.timestamp <= ts + blocks::DEFAULT_SKIP_INTERVAL);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn future_timestamp_resolves_to_sentinel_over_http() {
    let mut server = mockito::Server::new_async().await;
    let future_ts = 4_000_000_000u64;
    let mut data = Map::new();
    data.insert(format!("t{future_ts}"), json!([]));
    server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": data }).to_string())
        .create_async()
        .await;

    let resolver = BlockResolver::new(client_for(&server));
    let resolved = resolver.resolve_many(&[future_ts]).await.unwrap();
    assert_eq!(resolved, vec![Block::SENTINEL]);
}

/// One response carrying rates for all 50 blocks; valid for any chunking of
/// the same job list.
fn rates_body(jobs: &[Block]) -> String {
    let mut data = Map::new();
    for job in jobs {
        data.insert(
            format!("t{}", job.timestamp),
            json!({
                "token0Price": (job.number as f64 / 100.0).to_string(),
                "token1Price": (100.0 / job.number as f64).to_string(),
            }),
        );
    }
    json!({ "data": data }).to_string()
}

fn fifty_jobs() -> Vec<Block> {
    (0..50u64)
        .map(|i| Block { number: 1000 + i, timestamp: 1_650_000_000 + i * 3600 })
        .collect()
}

#[tokio::test]
async fn chunk_size_controls_round_trips_but_not_output() {
    let jobs = fifty_jobs();

    // chunkSize 50: exactly one request.
    let mut server = mockito::Server::new_async().await;
    let single = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rates_body(&jobs))
        .expect(1)
        .create_async()
        .await;
    let executor = client_for(&server);
    let one_chunk =
        split_query(queries::hourly_rates_template, &executor, "0xpair", &jobs, 50).await.unwrap();
    single.assert_async().await;

    // chunkSize 25: exactly two requests, same merged mapping.
    let mut server = mockito::Server::new_async().await;
    let double = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rates_body(&jobs))
        .expect(2)
        .create_async()
        .await;
    let executor = client_for(&server);
    let two_chunks =
        split_query(queries::hourly_rates_template, &executor, "0xpair", &jobs, 25).await.unwrap();
    double.assert_async().await;

    assert_eq!(one_chunk.len(), 50);
    assert_eq!(one_chunk, two_chunks);
}

#[tokio::test]
async fn cache_first_split_query_is_idempotent() {
    let jobs = fifty_jobs();
    let mut server = mockito::Server::new_async().await;
    // Both passes share one chunk request; the second pass is served from the
    // executor's cache.
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rates_body(&jobs))
        .expect(1)
        .create_async()
        .await;

    let executor = client_for(&server);
    let first =
        split_query(queries::hourly_rates_template, &executor, "0xpair", &jobs, 50).await.unwrap();
    let second =
        split_query(queries::hourly_rates_template, &executor, "0xpair", &jobs, 50).await.unwrap();

    assert_eq!(first, second);
    mock.assert_async().await;
}

#[tokio::test]
async fn merged_mapping_keys_are_the_union_of_all_chunks() {
    let jobs = fifty_jobs();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rates_body(&jobs))
        .expect(7)
        .create_async()
        .await;

    let executor = client_for(&server);
    let merged =
        split_query(queries::hourly_rates_template, &executor, "0xpair", &jobs, 8).await.unwrap();
    for job in &jobs {
        assert!(merged.contains_key(&format!("t{}", job.timestamp)));
    }
    assert_eq!(merged.len(), jobs.len());
}
