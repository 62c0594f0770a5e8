//! Results of a closed election: awardees, shares and their commitment

use crate::election::merkle::AllocationTree;
use crate::election::ranking::{Awardee, rank_awardees};
use crate::election::registry::GrantElections;
use crate::election::vault_share::{VaultShare, calculate_vault_share};
use crate::types::{Amount, ElectionId, ElectionState, MerkleRoot, ShareType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything a proposer needs to finalize an election
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub election_id: ElectionId,
    pub share_type: ShareType,
    pub total_allocation: Amount,
    pub awardees: Vec<Awardee>,
    pub shares: Vec<VaultShare>,
    pub merkle_root: MerkleRoot,
}

impl AllocationPlan {
    pub fn tree(&self) -> AllocationTree {
        AllocationTree::new(&self.shares)
    }

    /// Units left in the vault after truncation
    pub fn dust(&self) -> Amount {
        let distributed: Amount = self.shares.iter().map(|share| share.amount).sum();
        self.total_allocation.saturating_sub(distributed)
    }
}

impl GrantElections {
    /// Awardees of `election_id` once voting has ended
    ///
    /// Randomized elections need their random number resolved through
    /// [`GrantElections::get_random_number`] first.
    pub fn rank_awardees(&self, election_id: ElectionId) -> Result<Vec<Awardee>> {
        let store = self.read_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        let state = election.state_at(now);
        if state < ElectionState::Closed {
            return Err(Error::WrongState {
                expected: ElectionState::Closed,
                actual: state,
            });
        }

        let random_number = if election.use_randomization {
            Some(
                election
                    .random_number
                    .ok_or(Error::RandomNumberRequired(election_id))?,
            )
        } else {
            None
        };

        let awardees = rank_awardees(
            &store.standings(election_id),
            election.ranking_size,
            election.awardee_count,
            random_number,
        );
        debug!(election_id, awardees = awardees.len(), "awardees ranked");
        Ok(awardees)
    }

    /// Ranked awardees, their shares of the configured vault allocation and
    /// the merkle root to propose
    pub fn allocation_plan(&self, election_id: ElectionId) -> Result<AllocationPlan> {
        let awardees = self.rank_awardees(election_id)?;
        let share_type = self.read_store()?.election(election_id)?.share_type;
        let total_allocation = self.config.vault_allocation;

        let shares = calculate_vault_share(&awardees, share_type, total_allocation)?;
        let merkle_root = AllocationTree::new(&shares).root();

        debug!(
            election_id,
            merkle_root = %hex::encode(merkle_root),
            "allocation plan built"
        );
        Ok(AllocationPlan {
            election_id,
            share_type,
            total_allocation,
            awardees,
            shares,
            merkle_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElectionConfiguration;
    use crate::election::memory::InMemoryEnvironment;
    use crate::types::{Address, ElectionTerm, ONE_DAY, Region, tokens};

    fn closed_election(randomized: bool) -> (InMemoryEnvironment, GrantElections, ElectionId, Vec<Address>) {
        let env = InMemoryEnvironment::new(0);
        let engine = env.engine();

        let mut row = ElectionConfiguration::default_for(ElectionTerm::Quarterly);
        row.registration_bond_required = false;
        row.use_randomization = randomized;
        engine
            .set_configuration(&env.governance, ElectionTerm::Quarterly, row)
            .unwrap();
        let id = engine
            .initialize(ElectionTerm::Quarterly, Region::named("World"))
            .unwrap();

        let beneficiaries: Vec<Address> = (1..=5)
            .map(|i| env.add_beneficiary(&format!("beneficiary-{i}")))
            .collect();
        for beneficiary in &beneficiaries {
            engine
                .register_for_election(beneficiary, beneficiary, id)
                .unwrap();
        }

        env.clock.advance(14 * ONE_DAY + 1);
        let ballots: [(&str, u128, [u128; 5]); 2] =
            [("voter-1", 100, [40, 15, 20, 15, 10]), ("voter-2", 100, [0, 10, 0, 0, 0])];
        for (label, credits, allocation) in ballots {
            let voter = Address::from_label(label);
            env.voice_credits.set_credits(&voter, credits);
            engine.vote(&voter, &beneficiaries, &allocation, id).unwrap();
        }

        env.clock.advance(14 * ONE_DAY);
        (env, engine, id, beneficiaries)
    }

    #[test]
    fn test_plan_before_close_is_rejected() {
        let env = InMemoryEnvironment::new(0);
        let engine = env.engine();
        let id = engine
            .initialize(ElectionTerm::Quarterly, Region::named("World"))
            .unwrap();

        assert!(matches!(
            engine.allocation_plan(id),
            Err(Error::WrongState {
                expected: ElectionState::Closed,
                ..
            })
        ));
    }

    #[test]
    fn test_plan_without_randomization() {
        let (_env, engine, id, beneficiaries) = closed_election(false);

        // Weights: b1 6, b2 4+3, b3 4, b4 4, b5 3
        let plan = engine.allocation_plan(id).unwrap();
        assert_eq!(plan.awardees[0].beneficiary, beneficiaries[1]);
        assert_eq!(plan.awardees[0].weight, 7);
        assert_eq!(plan.awardees[1].beneficiary, beneficiaries[0]);
        assert_eq!(plan.awardees[1].weight, 6);

        assert_eq!(plan.total_allocation, tokens(100));
        assert!(plan.shares.iter().all(|share| share.amount == tokens(50)));
        assert_eq!(plan.dust(), 0);
        assert_eq!(plan.merkle_root, plan.tree().root());
    }

    #[test]
    fn test_randomized_plan_waits_for_number() {
        let (env, engine, id, beneficiaries) = closed_election(true);

        assert!(matches!(
            engine.allocation_plan(id),
            Err(Error::RandomNumberRequired(_))
        ));

        engine.refresh_state(id).unwrap();
        let request = engine.election(id).unwrap().randomness_request.unwrap();
        env.randomness.fulfill(&request, 97).unwrap();
        engine.get_random_number(id).unwrap();

        // Shortlist [b2, b1, b3, b4, b5] rotated by 97 % 5 = 2
        let plan = engine.allocation_plan(id).unwrap();
        let picked: Vec<Address> = plan.awardees.iter().map(|a| a.beneficiary).collect();
        assert_eq!(picked, vec![beneficiaries[2], beneficiaries[3]]);
    }
}
