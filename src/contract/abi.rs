//! Typed binding for the token contract, generated from its human-readable ABI.

#![allow(clippy::too_many_arguments)]

use ethers::contract::abigen;

abigen!(
    IdrxToken,
    r#"[
        function name() external view returns (string)
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
        function totalSupply() external view returns (uint256)
        function balanceOf(address account) external view returns (uint256)
        function transfer(address to, uint256 amount) external returns (bool)
        function mint(address to, uint256 amount) external
        function burn(uint256 amount) external
        function burnWithAccountNumber(uint256 amount, string accountNumber) external
        function burnBridge(uint256 amount, uint256 toChainId) external
        function mintBridge(address to, uint256 amount, uint256 fromChainId, uint256 bridgeNonce) external
        function bridgeNonce() external view returns (uint256)
        function fromChainNonceUsed(uint256 fromChainId, uint256 nonce) external view returns (bool)
        function getBlackListStatus(address account) external view returns (bool)
        function getPlatformFeeInfo() external view returns (address, uint64, uint64)
        event BurnBridge(address indexed from, uint256 amount, uint256 toChainId, uint256 bridgeNonce, uint256 platformFee, uint256 timestamp)
    ]"#,
);
