use ethers::types::U256;
use std::time::Duration;

use idrx_multichain::contract::{wallet_from_key, ContractError, TransactionSigner};

use crate::common::{Fixture, CHAIN_A, TEST_KEY};

#[tokio::test]
async fn test_signer_binds_to_verified_chain() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    let connection = pool.acquire(CHAIN_A).await.unwrap();
    let descriptor = fixture.registry.descriptor(CHAIN_A).unwrap();
    let wallet = wallet_from_key(TEST_KEY).unwrap();

    let signer = TransactionSigner::bind(&wallet, descriptor, &connection)
        .await
        .unwrap();

    assert_eq!(signer.chain_id(), CHAIN_A);
    assert_eq!(signer.gas_policy().gas_limit, 3_000_000);
    assert!(signer.ensure_chain(CHAIN_A).is_ok());
    assert!(signer.ensure_chain(CHAIN_A + 1).is_err());
}

#[tokio::test]
async fn test_signer_rejects_node_on_other_chain() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    fixture.node("http://a1.test").report_chain_id(1);

    let connection = pool.acquire(CHAIN_A).await.unwrap();
    let descriptor = fixture.registry.descriptor(CHAIN_A).unwrap();
    let wallet = wallet_from_key(TEST_KEY).unwrap();

    let err = TransactionSigner::bind(&wallet, descriptor, &connection)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ContractError::ChainIdMismatch {
            expected: CHAIN_A,
            actual: 1
        }
    );
}

#[tokio::test]
async fn test_gas_price_is_capped() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    let connection = pool.acquire(CHAIN_A).await.unwrap();
    let descriptor = fixture.registry.descriptor(CHAIN_A).unwrap();
    let wallet = wallet_from_key(TEST_KEY).unwrap();
    let signer = TransactionSigner::bind(&wallet, descriptor, &connection)
        .await
        .unwrap();

    let suggested = connection.gas_price().await.unwrap();
    assert_eq!(signer.cap_gas_price(suggested), U256::from(1_000_000_000u64));
    assert_eq!(signer.cap_gas_price(U256::from(5u64)), U256::from(5u64));
}

#[tokio::test(start_paused = true)]
async fn test_signer_bind_times_out_on_stalled_node() {
    let fixture = Fixture::new();
    let pool = fixture.pool().await.unwrap();
    let connection = pool.acquire(CHAIN_A).await.unwrap();
    fixture
        .node("http://a1.test")
        .set_latency(Duration::from_secs(120));

    let descriptor = fixture.registry.descriptor(CHAIN_A).unwrap();
    let wallet = wallet_from_key(TEST_KEY).unwrap();
    let err = TransactionSigner::bind(&wallet, descriptor, &connection)
        .await
        .unwrap_err();

    assert!(matches!(err, ContractError::Network { chain_id: CHAIN_A, .. }));
    assert!(err.is_retryable());
}
