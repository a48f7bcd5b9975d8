use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::amount::DecimalAmount;
use crate::contract::TxHandle;

/// What to move, from where, to whom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub amount: DecimalAmount,
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    pub recipient: Address,
}

/// Bridge operation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeState {
    Initiated,
    Burning,
    BurnConfirmed,
    NonceExtracted,
    Minting,
    Completed,
    BurnFailed,
    BurnReverted,
    NonceExtractionFailed,
    MintFailed,
    MintReverted,
    /// The destination had already minted this nonce
    AlreadyMinted,
}

impl BridgeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BridgeState::Completed
                | BridgeState::BurnFailed
                | BridgeState::BurnReverted
                | BridgeState::NonceExtractionFailed
                | BridgeState::MintFailed
                | BridgeState::MintReverted
                | BridgeState::AlreadyMinted
        )
    }

    /// Burned on the source and not yet known to be minted
    pub fn is_mint_pending(&self) -> bool {
        matches!(
            self,
            BridgeState::NonceExtracted
                | BridgeState::Minting
                | BridgeState::MintFailed
                | BridgeState::MintReverted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeState::Initiated => "initiated",
            BridgeState::Burning => "burning",
            BridgeState::BurnConfirmed => "burn_confirmed",
            BridgeState::NonceExtracted => "nonce_extracted",
            BridgeState::Minting => "minting",
            BridgeState::Completed => "completed",
            BridgeState::BurnFailed => "burn_failed",
            BridgeState::BurnReverted => "burn_reverted",
            BridgeState::NonceExtractionFailed => "nonce_extraction_failed",
            BridgeState::MintFailed => "mint_failed",
            BridgeState::MintReverted => "mint_reverted",
            BridgeState::AlreadyMinted => "already_minted",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to mint without burning again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMint {
    pub operation_id: Uuid,
    pub request: BridgeRequest,
    pub nonce: U256,
    pub burn_tx: TxHandle,
    /// Last mint submitted for this nonce, if any
    pub mint_tx: Option<TxHandle>,
}

/// Snapshot of one bridge operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOperation {
    pub id: Uuid,
    pub request: BridgeRequest,
    pub state: BridgeState,
    pub burn_tx: Option<TxHandle>,
    pub nonce: Option<U256>,
    pub mint_tx: Option<TxHandle>,
    pub history: Vec<BridgeState>,
    pub last_error: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl BridgeOperation {
    pub fn new(request: BridgeRequest) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            request,
            state: BridgeState::Initiated,
            burn_tx: None,
            nonce: None,
            mint_tx: None,
            history: vec![BridgeState::Initiated],
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an operation from a mint that is still owed
    pub fn from_pending(pending: &PendingMint) -> Self {
        let mut operation = Self::new(pending.request.clone());
        operation.id = pending.operation_id;
        operation.burn_tx = Some(pending.burn_tx);
        operation.nonce = Some(pending.nonce);
        operation.mint_tx = pending.mint_tx;
        operation.advance(BridgeState::NonceExtracted);
        operation
    }

    pub fn advance(&mut self, state: BridgeState) {
        self.state = state;
        self.history.push(state);
        self.updated_at = SystemTime::now();
    }

    pub fn fail(&mut self, state: BridgeState, error: &impl fmt::Display) {
        self.last_error = Some(error.to_string());
        self.advance(state);
    }

    pub fn pending_mint(&self) -> Option<PendingMint> {
        if !self.state.is_mint_pending() {
            return None;
        }
        Some(PendingMint {
            operation_id: self.id,
            request: self.request.clone(),
            nonce: self.nonce?,
            burn_tx: self.burn_tx?,
            mint_tx: self.mint_tx,
        })
    }
}
