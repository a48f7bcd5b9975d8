use std::sync::Arc;
use std::time::Duration;

use idrx_multichain::network::NetworkError;

use crate::common::{Fixture, CHAIN_A};

#[tokio::test(start_paused = true)]
async fn test_acquire_racing_close_never_yields_a_usable_connection() {
    let fixture = Fixture::new();
    for endpoint in ["http://a1.test", "http://a2.test"] {
        fixture
            .node(endpoint)
            .set_latency(Duration::from_millis(500));
    }
    let pool = Arc::new(fixture.pool().await.unwrap());

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                match pool.acquire(CHAIN_A).await {
                    Ok(connection) => connection.block_number().await.unwrap_err(),
                    Err(err) => err,
                }
            })
        })
        .collect();

    tokio::task::yield_now().await;
    pool.close_all().await;

    for caller in callers {
        assert_eq!(caller.await.unwrap(), NetworkError::PoolClosed);
    }
    assert!(fixture.node("http://a1.test").is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_close_interrupts_in_flight_request() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    let connection = pool.acquire(CHAIN_A).await.unwrap();
    fixture
        .node("http://a1.test")
        .set_latency(Duration::from_secs(10));

    let started = tokio::time::Instant::now();
    let (result, _) = tokio::join!(connection.block_number(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        pool.close_all().await;
    });

    assert_eq!(result.unwrap_err(), NetworkError::PoolClosed);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_request_times_out() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    let connection = pool.acquire(CHAIN_A).await.unwrap();
    fixture
        .node("http://a1.test")
        .set_latency(Duration::from_secs(120));

    let err = connection.block_number().await.unwrap_err();
    assert!(matches!(
        err,
        NetworkError::Timeout {
            method: "eth_blockNumber",
            ..
        }
    ));
    assert!(err.is_retryable());
}
