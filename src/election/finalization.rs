//! Two-phase finalization: a proposer commits a merkle root, an approver
//! confirms it and the vault opens for claims.

use crate::election::events::ElectionEvent;
use crate::election::registry::GrantElections;
use crate::types::{Address, ElectionId, ElectionState, MerkleRoot, Role};
use crate::{Error, Result};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

impl GrantElections {
    /// Propose `merkle_root` as the final allocation of `election_id`
    ///
    /// Works on the stored state, so the election must have been refreshed
    /// into `Closed`. Proposing again before approval replaces the root. The
    /// finalization incentive goes to the first successful proposer only.
    pub fn propose_finalization(
        &self,
        caller: &Address,
        election_id: ElectionId,
        merkle_root: MerkleRoot,
    ) -> Result<()> {
        self.require_role(caller, Role::Proposer)?;

        let mut store = self.write_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        let previous_state = election.state;
        if !matches!(
            previous_state,
            ElectionState::Closed | ElectionState::ProposedFinalization
        ) {
            return Err(Error::WrongState {
                expected: ElectionState::Closed,
                actual: previous_state,
            });
        }
        if election.awaiting_randomness() {
            return Err(Error::RandomNumberRequired(election_id));
        }

        let incentive = (!election.incentive_paid).then_some(election.finalization_incentive);
        if let Some(amount) = incentive.filter(|amount| *amount > 0) {
            self.collaborators
                .incentives
                .pay_incentive(caller, amount)
                .map_err(|err| {
                    warn!(election_id, caller = %caller, %err, "finalization incentive not paid");
                    Error::IncentivePaymentFailed { amount }
                })?;
        }

        let election = store.election_mut(election_id)?;
        election.merkle_root = Some(merkle_root);
        election.state = ElectionState::ProposedFinalization;
        if incentive.is_some() {
            election.incentive_paid = true;
        }

        if previous_state != ElectionState::ProposedFinalization {
            store.journal.emit(
                now,
                ElectionEvent::ElectionStateChanged {
                    election_id,
                    from: previous_state,
                    to: ElectionState::ProposedFinalization,
                },
            )?;
        }
        if let Some(amount) = incentive {
            store.journal.emit(
                now,
                ElectionEvent::IncentivePaid {
                    election_id,
                    recipient: *caller,
                    amount,
                },
            )?;
        }
        store.journal.emit(
            now,
            ElectionEvent::FinalizationProposed {
                election_id,
                merkle_root,
            },
        )?;

        info!(
            election_id,
            proposer = %caller.short(),
            merkle_root = %hex::encode(merkle_root),
            incentive = incentive.unwrap_or(0),
            "📝 Finalization proposed"
        );
        Ok(())
    }

    /// Confirm the proposed root and release the vault against it
    pub fn approve_finalization(
        &self,
        caller: &Address,
        election_id: ElectionId,
        merkle_root: MerkleRoot,
    ) -> Result<()> {
        self.require_role(caller, Role::Approver)?;

        let mut store = self.write_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        match election.state {
            ElectionState::Finalized => return Err(Error::AlreadyFinalized(election_id)),
            ElectionState::ProposedFinalization => {}
            _ => return Err(Error::FinalizationNotProposed(election_id)),
        }

        let proposed = election
            .merkle_root
            .ok_or(Error::FinalizationNotProposed(election_id))?;
        if !bool::from(proposed.ct_eq(&merkle_root)) {
            warn!(election_id, approver = %caller.short(), "approved root differs from proposal");
            return Err(Error::MerkleRootMismatch(election_id));
        }

        match election.vault_id {
            Some(vault_id) => self
                .collaborators
                .reward_vault
                .release(&vault_id, &merkle_root)?,
            None => warn!(election_id, "no reward vault on record, nothing released"),
        }

        store.election_mut(election_id)?.state = ElectionState::Finalized;
        store.journal.emit(
            now,
            ElectionEvent::ElectionStateChanged {
                election_id,
                from: ElectionState::ProposedFinalization,
                to: ElectionState::Finalized,
            },
        )?;
        store.journal.emit(
            now,
            ElectionEvent::ElectionFinalized {
                election_id,
                merkle_root,
            },
        )?;

        info!(
            election_id,
            approver = %caller.short(),
            merkle_root = %hex::encode(merkle_root),
            "✅ Election finalized"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElectionConfiguration;
    use crate::election::memory::InMemoryEnvironment;
    use crate::types::{ElectionTerm, ONE_DAY, Region, tokens};

    fn closed_election(randomized: bool) -> (InMemoryEnvironment, GrantElections, ElectionId) {
        let env = InMemoryEnvironment::new(0);
        let engine = env.engine();

        let mut row = ElectionConfiguration::default_for(ElectionTerm::Monthly);
        row.use_randomization = randomized;
        engine
            .set_configuration(&env.governance, ElectionTerm::Monthly, row)
            .unwrap();
        let id = engine
            .initialize(ElectionTerm::Monthly, Region::named("World"))
            .unwrap();

        env.clock.advance(30 * ONE_DAY);
        engine.refresh_state(id).unwrap();
        (env, engine, id)
    }

    #[test]
    fn test_propose_pays_incentive_once() {
        let (env, engine, id) = closed_election(false);

        engine
            .propose_finalization(&env.proposer, id, [1u8; 32])
            .unwrap();
        assert_eq!(env.ledger.balance_of(&env.proposer), tokens(2000));
        assert_eq!(engine.election(id).unwrap().state, ElectionState::ProposedFinalization);

        // Last write wins, no second payment
        engine
            .propose_finalization(&env.proposer, id, [2u8; 32])
            .unwrap();
        assert_eq!(env.ledger.balance_of(&env.proposer), tokens(2000));
        assert_eq!(engine.election_merkle_root(id).unwrap(), Some([2u8; 32]));
        assert!(engine.election(id).unwrap().incentive_paid);
    }

    #[test]
    fn test_propose_requires_role_and_closed_state() {
        let env = InMemoryEnvironment::new(0);
        let engine = env.engine();
        let id = engine
            .initialize(ElectionTerm::Monthly, Region::named("World"))
            .unwrap();

        assert!(matches!(
            engine.propose_finalization(&env.governance, id, [0u8; 32]),
            Err(Error::NotProposer { .. })
        ));

        // Past the voting window but never refreshed
        env.clock.advance(30 * ONE_DAY);
        assert!(matches!(
            engine.propose_finalization(&env.proposer, id, [0u8; 32]),
            Err(Error::WrongState {
                expected: ElectionState::Closed,
                actual: ElectionState::Registration
            })
        ));
        assert_eq!(env.ledger.balance_of(&env.proposer), 0);
    }

    #[test]
    fn test_randomized_election_needs_number_before_proposal() {
        let (env, engine, id) = closed_election(true);

        assert!(matches!(
            engine.propose_finalization(&env.proposer, id, [0u8; 32]),
            Err(Error::RandomNumberRequired(_))
        ));

        let request = engine.election(id).unwrap().randomness_request.unwrap();
        env.randomness.fulfill(&request, 3).unwrap();
        engine.get_random_number(id).unwrap();

        engine
            .propose_finalization(&env.proposer, id, [0u8; 32])
            .unwrap();
    }

    #[test]
    fn test_failed_incentive_leaves_election_closed() {
        let (env, engine, id) = closed_election(false);
        env.ledger.drain_incentive_pool();

        assert!(matches!(
            engine.propose_finalization(&env.proposer, id, [1u8; 32]),
            Err(Error::IncentivePaymentFailed { .. })
        ));
        let election = engine.election(id).unwrap();
        assert_eq!(election.state, ElectionState::Closed);
        assert_eq!(election.merkle_root, None);
        assert!(!election.incentive_paid);
    }

    #[test]
    fn test_approve_flow() {
        let (env, engine, id) = closed_election(false);

        assert!(matches!(
            engine.approve_finalization(&env.approver, id, [1u8; 32]),
            Err(Error::FinalizationNotProposed(_))
        ));

        engine
            .propose_finalization(&env.proposer, id, [1u8; 32])
            .unwrap();
        assert!(matches!(
            engine.approve_finalization(&env.proposer, id, [1u8; 32]),
            Err(Error::NotApprover { .. })
        ));
        assert!(matches!(
            engine.approve_finalization(&env.approver, id, [9u8; 32]),
            Err(Error::MerkleRootMismatch(_))
        ));

        engine
            .approve_finalization(&env.approver, id, [1u8; 32])
            .unwrap();
        assert_eq!(engine.election(id).unwrap().state, ElectionState::Finalized);

        let vault_id = engine.election(id).unwrap().vault_id.unwrap();
        assert_eq!(env.reward_vault.released_root(&vault_id), Some([1u8; 32]));

        assert!(matches!(
            engine.approve_finalization(&env.approver, id, [1u8; 32]),
            Err(Error::AlreadyFinalized(_))
        ));
        assert!(matches!(
            engine.propose_finalization(&env.proposer, id, [1u8; 32]),
            Err(Error::WrongState {
                actual: ElectionState::Finalized,
                ..
            })
        ));
    }

    #[test]
    fn test_finalized_election_frees_the_slot() {
        let (env, engine, id) = closed_election(false);
        let world = Region::named("World");

        assert!(engine.initialize(ElectionTerm::Monthly, world).is_err());

        engine
            .propose_finalization(&env.proposer, id, [1u8; 32])
            .unwrap();
        engine
            .approve_finalization(&env.approver, id, [1u8; 32])
            .unwrap();

        let next = engine.initialize(ElectionTerm::Monthly, world).unwrap();
        assert_eq!(next, id + 1);
        assert!(env.reward_vault.is_closed(id));
    }

    #[test]
    fn test_approve_without_vault_still_finalizes() {
        let env = InMemoryEnvironment::with_vault_budget(0, 0);
        let engine = env.engine();
        let mut row = ElectionConfiguration::default_for(ElectionTerm::Monthly);
        row.use_randomization = false;
        engine
            .set_configuration(&env.governance, ElectionTerm::Monthly, row)
            .unwrap();
        let id = engine
            .initialize(ElectionTerm::Monthly, Region::named("World"))
            .unwrap();
        env.clock.advance(30 * ONE_DAY);
        engine.refresh_state(id).unwrap();

        engine
            .propose_finalization(&env.proposer, id, [4u8; 32])
            .unwrap();
        engine
            .approve_finalization(&env.approver, id, [4u8; 32])
            .unwrap();
        assert_eq!(engine.election(id).unwrap().state, ElectionState::Finalized);
    }
}
