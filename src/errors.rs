//! Error handling for the grant election engine

use crate::types::{Address, ElectionId, ElectionState, ElectionTerm, Region, Role};

/// Result type alias for the election engine
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of failures, shared by every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation not valid in the election's current phase
    InvalidState,
    /// Caller lacks the required role
    Unauthorized,
    /// Registry, bond or credit eligibility check failed
    NotEligible,
    /// Double registration, double vote or repeated finalization
    DuplicateAction,
    /// Bond or incentive transfer shortfall
    InsufficientFunds,
    /// An external collaborator has not answered yet
    PendingExternal,
    /// Malformed arguments
    InvalidInput,
    /// Configuration, serialization or lock failures
    Internal,
}

/// Main error type for the election engine
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Active election for the slot has not been finalized
    #[error("election {election_id} for term {term:?} in region {region} not yet finalized")]
    AlreadyOpen {
        region: Region,
        term: ElectionTerm,
        election_id: ElectionId,
    },

    /// Term switched off by governance
    #[error("elections for term {0:?} are not enabled")]
    ElectionDisabled(ElectionTerm),

    /// No election with this id
    #[error("unknown election {0}")]
    UnknownElection(ElectionId),

    /// Operation needs a different lifecycle phase
    #[error("wrong election state: expected {expected:?}, found {actual:?}")]
    WrongState {
        expected: ElectionState,
        actual: ElectionState,
    },

    /// Vote outside the voting window
    #[error("election {0} not open for voting")]
    NotVotingPeriod(ElectionId),

    /// Approval before any proposal
    #[error("finalization not yet proposed for election {0}")]
    FinalizationNotProposed(ElectionId),

    /// Election already finalized
    #[error("election {0} already finalized")]
    AlreadyFinalized(ElectionId),

    /// Random number requested for a non-randomized election
    #[error("election {0} does not use randomization")]
    RandomizationDisabled(ElectionId),

    /// Caller lacks the governance role
    #[error("{caller} does not hold the governance role")]
    NotGovernance { caller: Address },

    /// Caller lacks the proposer role
    #[error("{caller} does not hold the proposer role")]
    NotProposer { caller: Address },

    /// Caller lacks the approver role
    #[error("{caller} does not hold the approver role")]
    NotApprover { caller: Address },

    /// Registrant unknown to the beneficiary registry
    #[error("{0} is not an eligible beneficiary")]
    NotEligible(Address),

    /// Vote for a beneficiary not registered in the election
    #[error("ineligible beneficiary {0}")]
    IneligibleBeneficiary(Address),

    /// Voter has no voice credits
    #[error("{0} must have voice credits")]
    NoVoiceCredits(Address),

    /// Beneficiary registered twice
    #[error("{beneficiary} already registered for election {election_id}")]
    DuplicateRegistration {
        beneficiary: Address,
        election_id: ElectionId,
    },

    /// Voter balloted twice
    #[error("{voter} already voted in election {election_id}")]
    AlreadyVoted {
        voter: Address,
        election_id: ElectionId,
    },

    /// Bond could not be collected
    #[error("insufficient registration bond balance: {required} required")]
    InsufficientBond { required: u128 },

    /// Ballot spends more credits than available
    #[error("insufficient voice credits: requested {requested}, available {available}")]
    InsufficientCredits { requested: u128, available: u128 },

    /// Proposer incentive transfer failed
    #[error("finalization incentive of {amount} could not be paid")]
    IncentivePaymentFailed { amount: u128 },

    /// Randomness source has not answered yet
    #[error("random number for election {0} still pending")]
    RandomNumberPending(ElectionId),

    /// Result needs a resolved random number
    #[error("random number required for election {0}")]
    RandomNumberRequired(ElectionId),

    /// Ballot without credits
    #[error("voice credits are required")]
    EmptyCredits,

    /// Ballot without beneficiaries
    #[error("beneficiaries are required")]
    EmptyBeneficiaries,

    /// Ballot beneficiaries and credits differ in length
    #[error("{beneficiaries} beneficiaries but {credits} credit entries")]
    LengthMismatch { beneficiaries: usize, credits: usize },

    /// Term configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Approved root differs from the proposed one
    #[error("merkle root does not match the proposed root for election {0}")]
    MerkleRootMismatch(ElectionId),

    /// Checked arithmetic overflowed
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Error raised when a caller lacks `role`
    pub fn unauthorized(role: Role, caller: Address) -> Self {
        match role {
            Role::Governance => Self::NotGovernance { caller },
            Role::Proposer => Self::NotProposer { caller },
            Role::Approver => Self::NotApprover { caller },
        }
    }

    /// Classify this error into one of the engine-wide kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyOpen { .. }
            | Error::ElectionDisabled(_)
            | Error::WrongState { .. }
            | Error::NotVotingPeriod(_)
            | Error::FinalizationNotProposed(_)
            | Error::AlreadyFinalized(_)
            | Error::RandomizationDisabled(_) => ErrorKind::InvalidState,

            Error::NotGovernance { .. } | Error::NotProposer { .. } | Error::NotApprover { .. } => {
                ErrorKind::Unauthorized
            }

            Error::NotEligible(_) | Error::IneligibleBeneficiary(_) | Error::NoVoiceCredits(_) => {
                ErrorKind::NotEligible
            }

            Error::DuplicateRegistration { .. } | Error::AlreadyVoted { .. } => {
                ErrorKind::DuplicateAction
            }

            Error::InsufficientBond { .. }
            | Error::InsufficientCredits { .. }
            | Error::IncentivePaymentFailed { .. } => ErrorKind::InsufficientFunds,

            Error::RandomNumberPending(_) | Error::RandomNumberRequired(_) => {
                ErrorKind::PendingExternal
            }

            Error::UnknownElection(_)
            | Error::EmptyCredits
            | Error::EmptyBeneficiaries
            | Error::LengthMismatch { .. }
            | Error::InvalidConfiguration(_)
            | Error::MerkleRootMismatch(_)
            | Error::ArithmeticOverflow(_) => ErrorKind::InvalidInput,

            Error::Config { .. } | Error::Serialization(_) | Error::Internal { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

/// Convenience macro for internal errors
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::Error::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::internal(format!($fmt, $($arg)*))
    };
}
