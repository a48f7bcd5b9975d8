use std::time::Duration;
use test_log::test;

use idrx_multichain::network::{ConnectionPool, NetworkError};
use idrx_multichain::registry::{NetworkDescriptor, NetworkRegistry};

use crate::common::{Fixture, CHAIN_A, CHAIN_B, CHAIN_C, CHAIN_UNDEPLOYED};

#[test(tokio::test)]
async fn test_connects_deployed_networks_only() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();

    assert_eq!(pool.connected_chains().await, vec![CHAIN_A, CHAIN_B, CHAIN_C]);
    assert!(!pool.is_connected(CHAIN_UNDEPLOYED).await);
    // a1, a2, b1, b2, c1; never the undeployed network's endpoint
    assert_eq!(fixture.connector.dials(), 5);
}

#[test(tokio::test)]
async fn test_dial_failures_are_dropped_in_order() {
    let fixture = Fixture::new();
    fixture.node("http://a1.test").set_reachable(false);

    let pool = fixture.pool().await.unwrap();
    assert_eq!(
        pool.endpoints(CHAIN_A).await,
        vec!["http://a2.test".to_string()]
    );
    assert_eq!(
        pool.endpoints(CHAIN_B).await,
        vec!["http://b1.test".to_string(), "http://b2.test".to_string()]
    );
    assert_eq!(pool.metrics().dial_failures, 1);
}

#[test(tokio::test)]
async fn test_connect_fails_when_a_network_is_unreachable() {
    let fixture = Fixture::new();
    fixture.node("http://c1.test").set_reachable(false);

    let err = fixture.pool().await.unwrap_err();
    assert_eq!(
        err,
        NetworkError::NoEndpointsReachable {
            network: "ChainC".to_string(),
            chain_id: CHAIN_C,
            attempted: 1,
        }
    );
    // Nothing dialed for the other networks is left open
    assert!(fixture.node("http://a1.test").is_closed());
    assert!(fixture.node("http://b2.test").is_closed());
}

#[test(tokio::test)]
async fn test_acquire_prefers_first_endpoint() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();

    let connection = pool.acquire(CHAIN_A).await.unwrap();
    assert_eq!(connection.endpoint(), "http://a1.test");
    assert_eq!(connection.chain_id(), CHAIN_A);
    assert_eq!(pool.metrics().failovers, 0);
}

#[test(tokio::test)]
async fn test_acquire_fails_over_to_backup() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    fixture.node("http://a1.test").set_alive(false);

    let connection = pool.acquire(CHAIN_A).await.unwrap();
    assert_eq!(connection.endpoint(), "http://a2.test");
    assert_eq!(pool.metrics().failovers, 1);

    // A failed probe does not remove the endpoint; it is tried again next time
    fixture.node("http://a1.test").set_alive(true);
    let connection = pool.acquire(CHAIN_A).await.unwrap();
    assert_eq!(connection.endpoint(), "http://a1.test");
}

#[test(tokio::test)]
async fn test_all_probes_failing_is_no_available_connection() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    fixture.node("http://a1.test").set_alive(false);
    fixture.node("http://a2.test").set_alive(false);

    let err = pool.acquire(CHAIN_A).await.unwrap_err();
    assert_eq!(
        err,
        NetworkError::NoAvailableConnection {
            chain_id: CHAIN_A,
            attempted: 2
        }
    );
    assert!(err.is_retryable());
    assert_eq!(pool.metrics().exhausted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_probe_times_out_and_fails_over() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    fixture
        .node("http://b1.test")
        .set_latency(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    let connection = pool.acquire(CHAIN_B).await.unwrap();

    assert_eq!(connection.endpoint(), "http://b2.test");
    let probe_timeout = Fixture::pool_config().probe_timeout;
    assert!(started.elapsed() >= probe_timeout);
    assert!(started.elapsed() < probe_timeout * 2);
}

#[test(tokio::test)]
async fn test_unknown_chain_is_not_connected() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();

    assert_eq!(
        pool.acquire(CHAIN_UNDEPLOYED).await.unwrap_err(),
        NetworkError::ChainNotConnected {
            chain_id: CHAIN_UNDEPLOYED
        }
    );
}

#[test(tokio::test)]
async fn test_close_all_is_idempotent() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    let handle = pool.acquire(CHAIN_A).await.unwrap();

    pool.close_all().await;
    pool.close_all().await;

    assert!(pool.is_closed());
    assert!(handle.is_closed());
    assert!(pool.connected_chains().await.is_empty());
    for (endpoint, node) in &fixture.nodes {
        if endpoint != "http://d1.test" {
            assert!(node.is_closed(), "{endpoint} left open");
        }
    }

    assert_eq!(pool.acquire(CHAIN_A).await.unwrap_err(), NetworkError::PoolClosed);
    assert_eq!(handle.block_number().await.unwrap_err(), NetworkError::PoolClosed);
}

#[test(tokio::test)]
async fn test_close_all_under_concurrent_callers() {
    let fixture = Fixture::new();
    let pool = std::sync::Arc::new(fixture.pool().await.unwrap());

    let closers: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { pool.close_all().await })
        })
        .collect();
    for closer in closers {
        closer.await.unwrap();
    }

    assert!(pool.is_closed());
    assert_eq!(pool.acquire(CHAIN_B).await.unwrap_err(), NetworkError::PoolClosed);
}

#[test(tokio::test)]
async fn test_connect_with_empty_registry() {
    let registry = NetworkRegistry::new(Vec::<(String, NetworkDescriptor)>::new()).unwrap();
    let fixture = Fixture::new();

    let pool =
        ConnectionPool::connect(&registry, fixture.connector.as_ref(), Fixture::pool_config())
            .await
            .unwrap();
    assert!(pool.connected_chains().await.is_empty());
    assert_eq!(fixture.connector.dials(), 0);
}
