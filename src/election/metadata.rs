//! Read-only snapshot of an election for integrations

use crate::election::registry::GrantElections;
use crate::types::{
    Address, Amount, ElectionId, ElectionState, ElectionTerm, RandomNumber, ShareType, Timestamp,
    Weight,
};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Beneficiary with its accumulated vote weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub beneficiary: Address,
    pub weight: Weight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionMetadata {
    pub election_id: ElectionId,
    pub term: ElectionTerm,
    pub region: String,
    /// Phase as of the snapshot time
    pub state: ElectionState,
    pub state_label: String,
    pub state_short: String,
    pub start_time: Timestamp,
    pub starts_at: Option<DateTime<Utc>>,
    pub registration_period: i64,
    pub voting_period: i64,
    pub cooldown_period: i64,
    pub registration_bond: Amount,
    pub registration_bond_required: bool,
    pub use_randomization: bool,
    pub random_number: Option<RandomNumber>,
    pub ranking_size: usize,
    pub awardee_count: usize,
    pub share_type: ShareType,
    pub finalization_incentive: Amount,
    pub merkle_root: Option<String>,
    pub vault_id: Option<String>,
    pub registered_beneficiaries: Vec<Address>,
    pub voter_count: usize,
    pub standings: Vec<Standing>,
}

impl ElectionMetadata {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl GrantElections {
    pub fn election_metadata(&self, election_id: ElectionId) -> Result<ElectionMetadata> {
        let store = self.read_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        let state = election.state_at(now);
        let standings = store
            .standings(election_id)
            .into_iter()
            .map(|(beneficiary, weight)| Standing {
                beneficiary,
                weight,
            })
            .collect();

        Ok(ElectionMetadata {
            election_id,
            term: election.term,
            region: election.region.to_string(),
            state,
            state_label: state.long_label().to_string(),
            state_short: state.short_label().to_string(),
            start_time: election.start_time,
            starts_at: DateTime::from_timestamp(election.start_time, 0),
            registration_period: election.registration_period,
            voting_period: election.voting_period,
            cooldown_period: election.cooldown_period,
            registration_bond: election.registration_bond,
            registration_bond_required: election.bond_required,
            use_randomization: election.use_randomization,
            random_number: election.random_number,
            ranking_size: election.ranking_size,
            awardee_count: election.awardee_count,
            share_type: election.share_type,
            finalization_incentive: election.finalization_incentive,
            merkle_root: election.merkle_root.map(hex::encode),
            vault_id: election.vault_id.map(hex::encode),
            registered_beneficiaries: store.beneficiaries(election_id).to_vec(),
            voter_count: store.voters.get(&election_id).map_or(0, |voters| voters.len()),
            standings,
        })
    }
}
