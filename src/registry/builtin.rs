//! Compiled-in IDRX deployments.

use ethers::types::{Address, H160};
use std::time::Duration;

use super::{GasPolicy, NetworkDescriptor};

pub const BASE_MAINNET: &str = "BaseMainnet";
pub const POLYGON_MAINNET: &str = "PolygonMainnet";
pub const BSC_MAINNET: &str = "BSCMainnet";
pub const LISK_MAINNET: &str = "LiskMainnet";
pub const KAIA_MAINNET: &str = "KaiaMainnet";
pub const WORLD_CHAIN_MAINNET: &str = "WorldChainMainnet";
pub const ETHERLINK_MAINNET: &str = "EtherlinkMainnet";
pub const GNOSIS_MAINNET: &str = "GnosisMainnet";

pub const BASE_CHAIN_ID: u64 = 8453;
pub const POLYGON_CHAIN_ID: u64 = 137;
pub const BSC_CHAIN_ID: u64 = 56;
pub const LISK_CHAIN_ID: u64 = 1135;
pub const KAIA_CHAIN_ID: u64 = 8217;
pub const WORLD_CHAIN_CHAIN_ID: u64 = 480;
pub const ETHERLINK_CHAIN_ID: u64 = 42793;
pub const GNOSIS_CHAIN_ID: u64 = 100;

/// 0x18Bc5bcC660cf2B9cE3cd51a404aFe1a0cBD3C22
const IDRX_CONTRACT: Address = H160([
    0x18, 0xbc, 0x5b, 0xcc, 0x66, 0x0c, 0xf2, 0xb9, 0xce, 0x3c, 0xd5, 0x1a, 0x40, 0x4a, 0xfe, 0x1a,
    0x0c, 0xbd, 0x3c, 0x22,
]);

/// 0x649a2DA7B28E0D54c13D5eFf95d3A660652742cC (Polygon and BSC)
const IDRX_CONTRACT_LEGACY: Address = H160([
    0x64, 0x9a, 0x2d, 0xa7, 0xb2, 0x8e, 0x0d, 0x54, 0xc1, 0x3d, 0x5e, 0xff, 0x95, 0xd3, 0xa6, 0x60,
    0x65, 0x27, 0x42, 0xcc,
]);

const GWEI: u64 = 1_000_000_000;
const DEFAULT_GAS_LIMIT: u64 = 3_000_000;

#[allow(clippy::too_many_arguments)]
fn mainnet(
    chain_id: u64,
    name: &str,
    endpoints: &[&str],
    contract: Address,
    block_secs: u64,
    gas_limit: u64,
    max_gas_price: u64,
    decimals: u8,
) -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id,
        name: name.to_string(),
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        contract_address: Some(contract),
        block_time: Duration::from_secs(block_secs),
        gas: GasPolicy {
            gas_limit,
            max_gas_price: Some(max_gas_price),
        },
        decimals,
        testnet: false,
    }
}

/// Every network the token is deployed on, keyed by network name
pub fn builtin_networks() -> Vec<(&'static str, NetworkDescriptor)> {
    vec![
        (
            BASE_MAINNET,
            mainnet(
                BASE_CHAIN_ID,
                "Base",
                &["https://mainnet.base.org", "https://base.llamarpc.com"],
                IDRX_CONTRACT,
                2,
                DEFAULT_GAS_LIMIT,
                10 * GWEI,
                2,
            ),
        ),
        (
            POLYGON_MAINNET,
            mainnet(
                POLYGON_CHAIN_ID,
                "Polygon",
                &["https://polygon-rpc.com", "https://polygon.llamarpc.com"],
                IDRX_CONTRACT_LEGACY,
                2,
                DEFAULT_GAS_LIMIT,
                50 * GWEI,
                0,
            ),
        ),
        (
            BSC_MAINNET,
            mainnet(
                BSC_CHAIN_ID,
                "BNB Smart Chain",
                &["https://bsc-dataseed.binance.org", "https://binance.llamarpc.com"],
                IDRX_CONTRACT_LEGACY,
                3,
                DEFAULT_GAS_LIMIT,
                5 * GWEI,
                0,
            ),
        ),
        (
            LISK_MAINNET,
            mainnet(
                LISK_CHAIN_ID,
                "Lisk",
                &["https://rpc.api.lisk.com"],
                IDRX_CONTRACT,
                2,
                DEFAULT_GAS_LIMIT,
                GWEI,
                2,
            ),
        ),
        (
            KAIA_MAINNET,
            mainnet(
                KAIA_CHAIN_ID,
                "Kaia",
                &["https://public-en.node.kaia.io"],
                IDRX_CONTRACT,
                2,
                DEFAULT_GAS_LIMIT,
                GWEI,
                2,
            ),
        ),
        (
            WORLD_CHAIN_MAINNET,
            mainnet(
                WORLD_CHAIN_CHAIN_ID,
                "World Chain",
                &["https://worldchain-mainnet.g.alchemy.com/public"],
                IDRX_CONTRACT,
                2,
                DEFAULT_GAS_LIMIT,
                GWEI,
                2,
            ),
        ),
        (
            ETHERLINK_MAINNET,
            mainnet(
                ETHERLINK_CHAIN_ID,
                "Etherlink",
                &["https://node.mainnet.etherlink.com"],
                IDRX_CONTRACT,
                2,
                30_000_000,
                GWEI,
                2,
            ),
        ),
        (
            GNOSIS_MAINNET,
            mainnet(
                GNOSIS_CHAIN_ID,
                "Gnosis",
                &["https://rpc.gnosischain.com", "https://0xrpc.io/gno"],
                IDRX_CONTRACT,
                5,
                DEFAULT_GAS_LIMIT,
                GWEI / 2,
                2,
            ),
        ),
    ]
}
