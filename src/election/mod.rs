//! Grant election engine
//!
//! Elections run per `(region, term)` through registration, quadratic
//! voting, a randomized awardee selection and a propose/approve
//! finalization that releases a reward vault against a merkle root.

pub mod allocation;
pub mod collaborators;
pub mod events;
pub mod finalization;
pub mod memory;
pub mod merkle;
pub mod metadata;
pub mod polling;
pub mod randomness;
pub mod ranking;
pub mod record;
pub mod registration;
pub mod registry;
pub(crate) mod store;
pub mod vault_share;
pub mod voting;

pub use allocation::AllocationPlan;
pub use collaborators::{
    Authorizer, BeneficiaryRegistry, BondEscrow, Clock, FundsError, IncentiveLedger,
    RandomnessSource, RequestId, RewardVault, SystemClock, VaultError, VoiceCreditOracle,
};
pub use events::{ElectionEvent, EventJournal, EventRecord, JournalIntegrityReport};
pub use merkle::{AllocationTree, ProofStep};
pub use metadata::{ElectionMetadata, Standing};
pub use polling::{RetryPolicy, wait_for_random_number, wait_for_state};
pub use ranking::{Awardee, rank_awardees};
pub use record::{Election, Vote};
pub use registry::{Collaborators, GrantElections};
pub use vault_share::{VaultShare, calculate_vault_share};
pub use voting::quadratic_weight;
