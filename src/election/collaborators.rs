//! Interfaces to the systems the engine consumes but does not own
//!
//! Every collaborator is injected into [`super::GrantElections`] as an
//! `Arc<dyn Trait>`. Calls are synchronous: a collaborator either answers now
//! or reports that it cannot, and the engine never waits on one.

use crate::Result;
use crate::types::{
    Address, Amount, ElectionId, MerkleRoot, RandomNumber, Role, Timestamp, VaultId,
};
use uuid::Uuid;

/// Identifier of an outstanding randomness request
pub type RequestId = Uuid;

/// Confirms that an address is a registered beneficiary
pub trait BeneficiaryRegistry: Send + Sync {
    fn beneficiary_exists(&self, address: &Address) -> bool;
}

/// Reports the voting power a voter may spend
pub trait VoiceCreditOracle: Send + Sync {
    fn credits_for(&self, voter: &Address, at: Timestamp) -> Amount;
}

/// Two-step request/fulfil randomness handshake
pub trait RandomnessSource: Send + Sync {
    /// Ask for a number; the answer arrives later under the returned id
    fn request_number(&self, seed: u64) -> Result<RequestId>;

    /// The number delivered for `request`, if it has been fulfilled
    fn fulfilled_number(&self, request: &RequestId) -> Option<RandomNumber>;
}

/// Failure reported by the reward vault when opening
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("reward budget of {available} cannot cover {required}")]
    InsufficientBudget { required: Amount, available: Amount },
}

/// Escrow that receives finalized allocations
pub trait RewardVault: Send + Sync {
    /// Open a vault for `election_id` that will pay `size_hint` awardees
    fn open(&self, election_id: ElectionId, size_hint: usize)
    -> std::result::Result<VaultId, VaultError>;

    /// Close the vault paired with `election_id`
    fn close(&self, election_id: ElectionId) -> Result<()>;

    /// Open `vault_id` for claims against `merkle_root`
    fn release(&self, vault_id: &VaultId, merkle_root: &MerkleRoot) -> Result<()>;
}

/// Shortfall reported by a token ledger
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FundsError {
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds { required: Amount, available: Amount },
}

/// Moves registration bonds into an election's fund balance
pub trait BondEscrow: Send + Sync {
    fn collect_bond(
        &self,
        from: &Address,
        election_id: ElectionId,
        amount: Amount,
    ) -> std::result::Result<(), FundsError>;
}

/// Pays finalization incentives to proposers
pub trait IncentiveLedger: Send + Sync {
    fn pay_incentive(&self, recipient: &Address, amount: Amount)
    -> std::result::Result<(), FundsError>;
}

/// Role lookup queried on every privileged call
pub trait Authorizer: Send + Sync {
    fn has_role(&self, caller: &Address, role: Role) -> bool;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_tracks_chrono() {
        let before = chrono::Utc::now().timestamp();
        let now = SystemClock.now();
        assert!(now >= before && now - before < 5);
    }
}
