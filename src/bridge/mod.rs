/*!
# Bridge Orchestration

Two-phase transfer of the token between chains:

1. `burnBridge` on the source chain
2. wait for the burn to confirm
3. read the bridge nonce from the confirmed receipt's `BurnBridge` event
4. `mintBridge` on the destination chain with that nonce, and wait for it

The nonce is only ever taken from the chain's own event log. The destination
contract keys replay protection on `(source chain, nonce)`, so a burn that confirmed
but did not mint is reported as [`BridgeError::PartialBridgeFailure`] with a
[`PendingMint`] that [`BridgeOrchestrator::resume_mint`] finishes without burning again.

Every failure before the burn confirms means no value moved; the caller may start
over.
*/

mod error;
pub mod nonce;
mod operation;
mod orchestrator;

pub use error::{BridgeError, MintFailure};
pub use nonce::{extract_bridge_nonce, extract_burn_event, NonceError};
pub use operation::{BridgeOperation, BridgeRequest, BridgeState, PendingMint};
pub use orchestrator::BridgeOrchestrator;
