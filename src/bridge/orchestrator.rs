use dashmap::DashMap;
use ethers::types::U256;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::nonce::extract_burn_event;
use super::{
    BridgeError, BridgeOperation, BridgeRequest, BridgeState, MintFailure, PendingMint,
};
use crate::amount::TokenAmount;
use crate::confirmation::{ConfirmationError, TransactionWaiter};
use crate::contract::{ContractError, ContractSet, SignerProvider, TokenContract, TxHandle};
use crate::registry::NetworkRegistry;
use crate::telemetry;

/// Source and destination contracts plus the amount in each chain's base units
struct Route {
    source: Arc<dyn TokenContract>,
    destination: Arc<dyn TokenContract>,
    source_units: U256,
    destination_units: U256,
}

/// What happened to a mint submitted before a resume
enum PriorMint {
    Confirmed,
    /// Reverted, or no longer known to the node; safe to submit again
    Gone,
    /// Still pending, or its fate could not be established
    Unsettled(ConfirmationError),
}

/// Sequences burn, confirm, extract nonce, mint across two chains.
///
/// Operations on the same chain pair are not serialized here; the destination
/// contract's used-nonce set is what prevents a double mint.
pub struct BridgeOrchestrator {
    registry: Arc<NetworkRegistry>,
    contracts: Arc<ContractSet>,
    signers: SignerProvider,
    waiter: TransactionWaiter,
    journal: DashMap<Uuid, BridgeOperation>,
}

impl BridgeOrchestrator {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        contracts: Arc<ContractSet>,
        signers: SignerProvider,
        waiter: TransactionWaiter,
    ) -> Self {
        Self {
            registry,
            contracts,
            signers,
            waiter,
            journal: DashMap::new(),
        }
    }

    /// Run a full bridge. On success the returned operation is `Completed`.
    ///
    /// A failure after the burn confirmed is always
    /// [`BridgeError::PartialBridgeFailure`], carrying what [`Self::resume_mint`] needs.
    pub async fn bridge(
        &self,
        request: BridgeRequest,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation, BridgeError> {
        let route = self.route(&request)?;
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let mut operation = BridgeOperation::new(request.clone());
        self.record(&operation);
        info!(
            operation_id = %operation.id,
            source_chain_id = request.source_chain_id,
            destination_chain_id = request.destination_chain_id,
            amount = %request.amount,
            "bridge initiated"
        );

        // Burn
        self.transition(&mut operation, BridgeState::Burning);
        let burn_tx = match self.submit_burn(&route, &request, cancel).await {
            Ok(burn_tx) => burn_tx,
            Err(err) => return Err(self.terminate(&mut operation, BridgeState::BurnFailed, err)),
        };
        operation.burn_tx = Some(burn_tx);
        self.record(&operation);

        // Confirm
        let receipt = match self
            .waiter
            .wait(request.source_chain_id, burn_tx.hash, cancel)
            .await
        {
            Ok(receipt) => receipt,
            Err(ConfirmationError::Reverted { .. }) => {
                let err = BridgeError::BurnReverted { burn_tx };
                return Err(self.terminate(&mut operation, BridgeState::BurnReverted, err));
            }
            Err(source) => {
                let err = BridgeError::BurnUnconfirmed { burn_tx, source };
                return Err(self.terminate(&mut operation, BridgeState::BurnFailed, err));
            }
        };
        self.transition(&mut operation, BridgeState::BurnConfirmed);

        // Nonce
        let event = match extract_burn_event(
            &receipt,
            route.source.address(),
            request.destination_chain_id,
        ) {
            Ok(event) => event,
            Err(source) => {
                error!(
                    operation_id = %operation.id,
                    burn_tx = %burn_tx,
                    error = %source,
                    "burn confirmed without a usable BurnBridge event"
                );
                let err = BridgeError::NonceExtractionFailed { burn_tx, source };
                return Err(self.terminate(
                    &mut operation,
                    BridgeState::NonceExtractionFailed,
                    err,
                ));
            }
        };
        if event.amount != route.source_units {
            warn!(
                operation_id = %operation.id,
                burned = %event.amount,
                requested = %route.source_units,
                "burn event amount differs from request"
            );
        }
        operation.nonce = Some(event.bridge_nonce);
        self.transition(&mut operation, BridgeState::NonceExtracted);
        info!(
            operation_id = %operation.id,
            nonce = %event.bridge_nonce,
            burn_tx = %burn_tx,
            "bridge nonce extracted"
        );

        self.mint(
            operation,
            route.destination,
            route.destination_units,
            event.bridge_nonce,
            burn_tx,
            cancel,
        )
        .await
    }

    /// Mint for a burn that already confirmed, without burning again
    pub async fn resume_mint(
        &self,
        pending: PendingMint,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation, BridgeError> {
        let route = self.route(&pending.request)?;

        let operation = match self.journal.get(&pending.operation_id) {
            Some(entry) => {
                let mut operation = entry.value().clone();
                operation.burn_tx = Some(pending.burn_tx);
                operation.nonce = Some(pending.nonce);
                operation.mint_tx = pending.mint_tx.or(operation.mint_tx);
                operation
            }
            None => BridgeOperation::from_pending(&pending),
        };
        info!(
            operation_id = %operation.id,
            nonce = %pending.nonce,
            burn_tx = %pending.burn_tx,
            "resuming bridge mint"
        );

        self.mint(
            operation,
            route.destination,
            route.destination_units,
            pending.nonce,
            pending.burn_tx,
            cancel,
        )
        .await
    }

    /// Mint with a caller-supplied nonce for a burn made outside this process
    pub async fn complete_mint(
        &self,
        request: BridgeRequest,
        nonce: U256,
        burn_tx: TxHandle,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation, BridgeError> {
        if burn_tx.chain_id != request.source_chain_id {
            return Err(BridgeError::BurnFailed {
                chain_id: request.source_chain_id,
                source: ContractError::ChainIdMismatch {
                    expected: request.source_chain_id,
                    actual: burn_tx.chain_id,
                },
            });
        }

        let pending = PendingMint {
            operation_id: Uuid::new_v4(),
            request,
            nonce,
            burn_tx,
            mint_tx: None,
        };
        self.resume_mint(pending, cancel).await
    }

    /// Latest snapshot of an operation
    pub fn operation(&self, id: &Uuid) -> Option<BridgeOperation> {
        self.journal.get(id).map(|entry| entry.value().clone())
    }

    /// Every operation started or resumed by this orchestrator, oldest first
    pub fn operations(&self) -> Vec<BridgeOperation> {
        let mut operations: Vec<BridgeOperation> = self
            .journal
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        operations.sort_by_key(|operation| operation.created_at);
        operations
    }

    /// Drop an operation from the journal, returning its last snapshot
    pub fn forget(&self, id: &Uuid) -> Option<BridgeOperation> {
        self.journal.remove(id).map(|(_, operation)| operation)
    }

    /// Drop every finished operation that owes no mint. Returns how many went.
    pub fn prune_finished(&self) -> usize {
        let before = self.journal.len();
        self.journal.retain(|_, operation| {
            !operation.state.is_terminal() || operation.state.is_mint_pending()
        });
        let pruned = before.saturating_sub(self.journal.len());
        if pruned > 0 {
            debug!(pruned, remaining = self.journal.len(), "bridge journal pruned");
        }
        pruned
    }

    /// Burns whose mint has not been confirmed
    pub fn pending_mints(&self) -> Vec<PendingMint> {
        self.operations()
            .iter()
            .filter_map(BridgeOperation::pending_mint)
            .collect()
    }

    fn route(&self, request: &BridgeRequest) -> Result<Route, BridgeError> {
        let source = self
            .registry
            .descriptor(request.source_chain_id)
            .map_err(|_| BridgeError::ChainNotSupported(request.source_chain_id))?;
        let destination = self
            .registry
            .descriptor(request.destination_chain_id)
            .map_err(|_| BridgeError::ChainNotSupported(request.destination_chain_id))?;

        if source.chain_id == destination.chain_id {
            return Err(BridgeError::SameChain(source.chain_id));
        }
        if request.amount.is_zero() {
            return Err(BridgeError::ZeroAmount);
        }

        let exact_units = |chain_id: u64, decimals: u8| {
            TokenAmount::new(request.amount, decimals)
                .and_then(|amount| amount.to_exact_base_units())
                .map_err(|source| BridgeError::InvalidAmount { chain_id, source })
        };
        let source_units = exact_units(source.chain_id, source.decimals)?;
        let destination_units = exact_units(destination.chain_id, destination.decimals)?;

        let contract = |chain_id: u64| {
            self.contracts
                .get(chain_id)
                .map_err(|source| BridgeError::Unavailable { chain_id, source })
        };

        Ok(Route {
            source: contract(source.chain_id)?,
            destination: contract(destination.chain_id)?,
            source_units,
            destination_units,
        })
    }

    async fn submit_burn(
        &self,
        route: &Route,
        request: &BridgeRequest,
        cancel: &CancellationToken,
    ) -> Result<TxHandle, BridgeError> {
        let chain_id = request.source_chain_id;
        let signer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
            signer = self.signers.for_chain(chain_id) => {
                signer.map_err(|source| BridgeError::BurnFailed { chain_id, source })?
            }
        };

        // Last point at which cancelling moves no value
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        route
            .source
            .burn_for_bridge(&signer, route.source_units, request.destination_chain_id)
            .await
            .map_err(|source| BridgeError::BurnFailed { chain_id, source })
    }

    async fn mint(
        &self,
        mut operation: BridgeOperation,
        destination: Arc<dyn TokenContract>,
        units: U256,
        nonce: U256,
        burn_tx: TxHandle,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation, BridgeError> {
        let source_chain_id = operation.request.source_chain_id;
        let destination_chain_id = operation.request.destination_chain_id;
        let recipient = operation.request.recipient;

        self.transition(&mut operation, BridgeState::Minting);

        if let Some(prior) = operation.mint_tx {
            match self.settle_prior_mint(prior, cancel).await {
                PriorMint::Confirmed => return Ok(self.complete(operation, nonce, prior)),
                PriorMint::Unsettled(source) => {
                    return Err(self.partial(
                        &mut operation,
                        BridgeState::MintFailed,
                        nonce,
                        burn_tx,
                        MintFailure::Unconfirmed {
                            mint_tx: prior,
                            source,
                        },
                    ))
                }
                PriorMint::Gone => {
                    info!(
                        operation_id = %operation.id,
                        mint_tx = %prior,
                        "previous mint dropped or reverted, submitting again"
                    );
                    operation.mint_tx = None;
                }
            }
        }

        let used = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            used = destination.is_nonce_used(source_chain_id, nonce) => Some(used),
        };
        match used {
            None => {
                return Err(self.partial(
                    &mut operation,
                    BridgeState::MintFailed,
                    nonce,
                    burn_tx,
                    MintFailure::Cancelled,
                ))
            }
            Some(Ok(false)) => {}
            Some(Ok(true)) => return Err(self.already_minted(&mut operation, nonce)),
            Some(Err(err)) => {
                return Err(self.partial(
                    &mut operation,
                    BridgeState::MintFailed,
                    nonce,
                    burn_tx,
                    MintFailure::NonceCheck(err),
                ))
            }
        }

        let signer = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            signer = self.signers.for_chain(destination_chain_id) => Some(signer),
        };
        let submitted = match signer {
            Some(Ok(signer)) if !cancel.is_cancelled() => {
                destination
                    .mint_for_bridge(&signer, recipient, units, source_chain_id, nonce)
                    .await
            }
            Some(Err(err)) => Err(err),
            _ => {
                return Err(self.partial(
                    &mut operation,
                    BridgeState::MintFailed,
                    nonce,
                    burn_tx,
                    MintFailure::Cancelled,
                ))
            }
        };
        let mint_tx = match submitted {
            Ok(mint_tx) => mint_tx,
            Err(err) => {
                // The contract is authoritative if another mint won the race
                if let Ok(true) = destination.is_nonce_used(source_chain_id, nonce).await {
                    return Err(self.already_minted(&mut operation, nonce));
                }
                return Err(self.partial(
                    &mut operation,
                    BridgeState::MintFailed,
                    nonce,
                    burn_tx,
                    MintFailure::Rejected(err),
                ));
            }
        };
        operation.mint_tx = Some(mint_tx);
        self.record(&operation);

        match self
            .waiter
            .wait(destination_chain_id, mint_tx.hash, cancel)
            .await
        {
            Ok(_) => Ok(self.complete(operation, nonce, mint_tx)),
            Err(ConfirmationError::Reverted { .. }) => Err(self.partial(
                &mut operation,
                BridgeState::MintReverted,
                nonce,
                burn_tx,
                MintFailure::Reverted { mint_tx },
            )),
            Err(source) => Err(self.partial(
                &mut operation,
                BridgeState::MintFailed,
                nonce,
                burn_tx,
                MintFailure::Unconfirmed { mint_tx, source },
            )),
        }
    }

    /// Find out what became of a mint submitted by an earlier attempt
    async fn settle_prior_mint(&self, prior: TxHandle, cancel: &CancellationToken) -> PriorMint {
        let known = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PriorMint::Unsettled(ConfirmationError::Cancelled {
                    chain_id: prior.chain_id,
                    hash: prior.hash,
                })
            }
            known = self.waiter.is_known(prior.chain_id, prior.hash) => known,
        };

        match known {
            Err(source) => PriorMint::Unsettled(source),
            Ok(false) => PriorMint::Gone,
            Ok(true) => match self.waiter.wait(prior.chain_id, prior.hash, cancel).await {
                Ok(_) => PriorMint::Confirmed,
                Err(ConfirmationError::Reverted { .. }) => PriorMint::Gone,
                Err(source) => PriorMint::Unsettled(source),
            },
        }
    }

    fn complete(
        &self,
        mut operation: BridgeOperation,
        nonce: U256,
        mint_tx: TxHandle,
    ) -> BridgeOperation {
        operation.mint_tx = Some(mint_tx);
        operation.last_error = None;
        self.transition(&mut operation, BridgeState::Completed);
        telemetry::record_bridge_outcome(
            operation.request.source_chain_id,
            operation.request.destination_chain_id,
            BridgeState::Completed.as_str(),
        );
        info!(
            operation_id = %operation.id,
            nonce = %nonce,
            mint_tx = %mint_tx,
            "bridge completed"
        );
        operation
    }

    fn already_minted(&self, operation: &mut BridgeOperation, nonce: U256) -> BridgeError {
        let err = BridgeError::NonceAlreadyUsed {
            source_chain_id: operation.request.source_chain_id,
            destination_chain_id: operation.request.destination_chain_id,
            nonce,
        };
        self.terminate(operation, BridgeState::AlreadyMinted, err)
    }

    fn partial(
        &self,
        operation: &mut BridgeOperation,
        state: BridgeState,
        nonce: U256,
        burn_tx: TxHandle,
        cause: MintFailure,
    ) -> BridgeError {
        let pending = PendingMint {
            operation_id: operation.id,
            request: operation.request.clone(),
            nonce,
            burn_tx,
            mint_tx: operation.mint_tx,
        };
        let err = BridgeError::PartialBridgeFailure {
            pending: Box::new(pending),
            cause,
        };
        error!(
            operation_id = %operation.id,
            nonce = %nonce,
            burn_tx = %burn_tx,
            error = %err,
            "tokens burned but not minted"
        );
        self.terminate(operation, state, err)
    }

    fn terminate(
        &self,
        operation: &mut BridgeOperation,
        state: BridgeState,
        err: BridgeError,
    ) -> BridgeError {
        operation.fail(state, &err);
        self.record(operation);
        telemetry::record_bridge_outcome(
            operation.request.source_chain_id,
            operation.request.destination_chain_id,
            state.as_str(),
        );
        warn!(operation_id = %operation.id, state = %state, error = %err, "bridge stopped");
        err
    }

    fn transition(&self, operation: &mut BridgeOperation, state: BridgeState) {
        operation.advance(state);
        self.record(operation);
    }

    fn record(&self, operation: &BridgeOperation) {
        self.journal.insert(operation.id, operation.clone());
    }
}
