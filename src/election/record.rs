//! Election records and their time-driven phase rules

use crate::config::ElectionConfiguration;
use crate::election::collaborators::RequestId;
use crate::types::{
    Address, Amount, ElectionId, ElectionState, ElectionTerm, MerkleRoot, RandomNumber, Region,
    ShareType, Timestamp, VaultId, Weight,
};
use serde::{Deserialize, Serialize};

/// One election instance for a `(region, term)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub term: ElectionTerm,
    pub region: Region,
    pub state: ElectionState,
    pub start_time: Timestamp,
    pub registration_period: i64,
    pub voting_period: i64,
    pub cooldown_period: i64,
    pub registration_bond: Amount,
    pub bond_required: bool,
    pub use_randomization: bool,
    pub random_number: Option<RandomNumber>,
    pub randomness_request: Option<RequestId>,
    pub ranking_size: usize,
    pub awardee_count: usize,
    pub share_type: ShareType,
    pub finalization_incentive: Amount,
    pub incentive_paid: bool,
    pub merkle_root: Option<MerkleRoot>,
    pub vault_id: Option<VaultId>,
    /// Bonds collected from registrants
    pub bond_balance: Amount,
}

impl Election {
    /// New record in `Registration` built from a term's defaults
    pub fn from_configuration(
        id: ElectionId,
        term: ElectionTerm,
        region: Region,
        start_time: Timestamp,
        config: &ElectionConfiguration,
    ) -> Self {
        Self {
            id,
            term,
            region,
            state: ElectionState::Registration,
            start_time,
            registration_period: config.registration_period,
            voting_period: config.voting_period,
            cooldown_period: config.cooldown_period,
            registration_bond: config.registration_bond,
            bond_required: config.registration_bond_required,
            use_randomization: config.use_randomization,
            random_number: None,
            randomness_request: None,
            ranking_size: config.ranking,
            awardee_count: config.awardees,
            share_type: config.share_type,
            finalization_incentive: config.finalization_incentive,
            incentive_paid: false,
            merkle_root: None,
            vault_id: None,
            bond_balance: 0,
        }
    }

    /// First second of the voting window, pinned at `Timestamp::MAX`
    pub fn voting_starts_at(&self) -> Timestamp {
        self.start_time.saturating_add(self.registration_period)
    }

    /// First second after the voting window
    pub fn voting_ends_at(&self) -> Timestamp {
        self.voting_starts_at().saturating_add(self.voting_period)
    }

    /// End of the post-vote cooldown
    pub fn cooldown_ends_at(&self) -> Timestamp {
        self.voting_ends_at().saturating_add(self.cooldown_period)
    }

    /// Phase implied by the clock. Phases past `Closed` are only reached
    /// through finalization, so the stored state wins whenever it is further
    /// along; the result never precedes `self.state`.
    pub fn state_at(&self, now: Timestamp) -> ElectionState {
        let by_time = if now >= self.voting_ends_at() {
            ElectionState::Closed
        } else if now >= self.voting_starts_at() {
            ElectionState::Voting
        } else {
            ElectionState::Registration
        };

        by_time.max(self.state)
    }

    /// Whether a random number must be present before results are usable
    pub fn awaiting_randomness(&self) -> bool {
        self.use_randomization && self.random_number.is_none()
    }
}

/// A single weighted vote for one beneficiary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub election_id: ElectionId,
    pub voter: Address,
    pub beneficiary: Address,
    pub weight: Weight,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ONE_DAY;

    fn monthly(start_time: Timestamp) -> Election {
        Election::from_configuration(
            0,
            ElectionTerm::Monthly,
            Region::named("World"),
            start_time,
            &ElectionConfiguration::default_for(ElectionTerm::Monthly),
        )
    }

    #[test]
    fn test_state_follows_clock() {
        let election = monthly(1_000);

        assert_eq!(election.state_at(0), ElectionState::Registration);
        assert_eq!(election.state_at(1_000 + 7 * ONE_DAY - 1), ElectionState::Registration);
        assert_eq!(election.state_at(1_000 + 7 * ONE_DAY), ElectionState::Voting);
        assert_eq!(election.state_at(1_000 + 14 * ONE_DAY - 1), ElectionState::Voting);
        assert_eq!(election.state_at(1_000 + 14 * ONE_DAY), ElectionState::Closed);
        assert_eq!(election.cooldown_ends_at(), 1_000 + 35 * ONE_DAY);
    }

    #[test]
    fn test_boundaries_saturate() {
        let mut election = monthly(1_000);
        election.voting_period = i64::MAX;

        assert_eq!(election.voting_ends_at(), i64::MAX);
        assert_eq!(election.cooldown_ends_at(), i64::MAX);
        assert_eq!(election.state_at(1_000 + 7 * ONE_DAY), ElectionState::Voting);
        assert_eq!(election.state_at(i64::MAX - 1), ElectionState::Voting);
    }

    #[test]
    fn test_state_never_precedes_stored_state() {
        let mut election = monthly(1_000);
        election.state = ElectionState::Finalized;

        assert_eq!(election.state_at(0), ElectionState::Finalized);
        assert_eq!(election.state_at(i64::MAX / 2), ElectionState::Finalized);
    }
}
