//! # Core Types for the Grant Election Engine
//!
//! Primitive identifiers and enums shared by every component: account
//! addresses, regions, grant terms, election phases and payout policies.
//!
//! ## Usage Examples
//!
//! ```rust
//! use grant_elections::types::*;
//!
//! let region = Region::named("World");
//! let beneficiary = Address::from_label("beneficiary-1");
//!
//! assert_eq!(region, Region::named("World"));
//! assert!(ElectionState::Registration < ElectionState::Voting);
//! assert_eq!(tokens(50), 50 * TOKEN);
//! assert_ne!(beneficiary, Address::from_label("beneficiary-2"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 32-byte Blake3 hash
pub type Hash = [u8; 32];

/// Commitment over the final allocation set of an election
pub type MerkleRoot = Hash;

/// Opaque reference to an external reward vault
pub type VaultId = Hash;

/// Monotonically increasing election identifier
pub type ElectionId = u64;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Token amounts, bonds, incentives and voice credits (18 decimals)
pub type Amount = u128;

/// Quadratic vote weight
pub type Weight = u128;

/// Number delivered by the randomness source
pub type RandomNumber = u64;

/// Smallest units per whole token
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Seconds in one day
pub const ONE_DAY: i64 = 86_400;

/// Convert whole tokens into base units
pub const fn tokens(whole: u128) -> Amount {
    whole * TOKEN
}

/// A 20-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Derive a deterministic address from a human-readable label
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Short form used in log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        if trimmed.len() != 40 {
            return Err(crate::Error::config(format!(
                "invalid address length: expected 40 hex chars, got {}",
                trimmed.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(trimmed, &mut bytes)
            .map_err(|e| crate::Error::config(format!("invalid address hex: {e}")))?;
        Ok(Self(bytes))
    }
}

/// Geographic or organisational scope of an election
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region(pub Hash);

impl Region {
    /// Region identifier derived from its name
    pub fn named(name: &str) -> Self {
        Self(blake3::hash(name.as_bytes()).into())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

/// Grant term an election runs for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectionTerm {
    Monthly,
    Quarterly,
    Yearly,
}

impl ElectionTerm {
    pub const ALL: [ElectionTerm; 3] = [
        ElectionTerm::Monthly,
        ElectionTerm::Quarterly,
        ElectionTerm::Yearly,
    ];

    /// Stable numeric code mixed into randomness seeds
    pub fn code(self) -> u8 {
        match self {
            ElectionTerm::Monthly => 0,
            ElectionTerm::Quarterly => 1,
            ElectionTerm::Yearly => 2,
        }
    }
}

/// Election phase. Variants are declared in lifecycle order, so `Ord`
/// follows the only legal direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectionState {
    Registration,
    Voting,
    Closed,
    ProposedFinalization,
    Finalized,
}

impl ElectionState {
    /// Human readable description
    pub fn long_label(self) -> &'static str {
        match self {
            ElectionState::Registration => "open for registration",
            ElectionState::Voting => "open for voting",
            ElectionState::Closed => "closed",
            ElectionState::ProposedFinalization => "finalization proposed",
            ElectionState::Finalized => "finalized",
        }
    }

    /// One-word description
    pub fn short_label(self) -> &'static str {
        match self {
            ElectionState::Registration => "registration",
            ElectionState::Voting => "voting",
            ElectionState::Closed => "closed",
            ElectionState::ProposedFinalization => "proposed",
            ElectionState::Finalized => "finalized",
        }
    }
}

/// Payout weighting policy for a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareType {
    EqualWeight,
    DynamicWeight,
}

/// Capabilities checked through the injected authorizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Governance,
    Proposer,
    Approver,
}
