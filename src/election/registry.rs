//! Election registry and lifecycle state machine
//!
//! [`GrantElections`] owns its election store behind a single `RwLock`.
//! Every mutating operation holds the write guard from its first check to
//! its last write, so operations apply atomically and in lock order. External
//! transfers run before any record changes, and a failed transfer aborts the
//! whole operation.

use crate::config::{ElectionConfiguration, EngineConfig};
use crate::election::collaborators::{
    Authorizer, BeneficiaryRegistry, BondEscrow, Clock, IncentiveLedger, RandomnessSource,
    RewardVault, VaultError, VoiceCreditOracle,
};
use crate::election::events::{ElectionEvent, EventRecord, JournalIntegrityReport};
use crate::election::randomness::randomness_seed;
use crate::election::record::{Election, Vote};
use crate::election::store::ElectionStore;
use crate::types::{
    Address, ElectionId, ElectionState, ElectionTerm, MerkleRoot, Region, Role,
};
use crate::{Error, Result, internal_error};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// External systems the engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub beneficiary_registry: Arc<dyn BeneficiaryRegistry>,
    pub voice_credits: Arc<dyn VoiceCreditOracle>,
    pub randomness: Arc<dyn RandomnessSource>,
    pub reward_vault: Arc<dyn RewardVault>,
    pub bond_escrow: Arc<dyn BondEscrow>,
    pub incentives: Arc<dyn IncentiveLedger>,
    pub authorizer: Arc<dyn Authorizer>,
    pub clock: Arc<dyn Clock>,
}

/// Grant election engine
pub struct GrantElections {
    store: RwLock<ElectionStore>,
    pub(crate) config: EngineConfig,
    pub(crate) collaborators: Collaborators,
}

impl GrantElections {
    /// Create an engine with an empty store and the shipped term defaults
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self {
            store: RwLock::new(ElectionStore::new()),
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn read_store(&self) -> Result<RwLockReadGuard<'_, ElectionStore>> {
        self.store
            .read()
            .map_err(|_| internal_error!("Election store read error"))
    }

    pub(crate) fn write_store(&self) -> Result<RwLockWriteGuard<'_, ElectionStore>> {
        self.store
            .write()
            .map_err(|_| internal_error!("Election store write error"))
    }

    pub(crate) fn now(&self) -> i64 {
        self.collaborators.clock.now()
    }

    pub(crate) fn require_role(&self, caller: &Address, role: Role) -> Result<()> {
        if self.collaborators.authorizer.has_role(caller, role) {
            Ok(())
        } else {
            warn!(caller = %caller, ?role, "role check failed");
            Err(Error::unauthorized(role, *caller))
        }
    }

    /// Open a new election for `(region, term)` from the term's defaults
    ///
    /// Fails with [`Error::AlreadyOpen`] while the previous election for the
    /// pair is not finalized. The paired reward vault is opened when the
    /// budget allows; an insufficient budget leaves `vault_id` unset.
    pub fn initialize(&self, term: ElectionTerm, region: Region) -> Result<ElectionId> {
        let mut store = self.write_store()?;
        let now = self.now();

        let defaults = store.term_defaults(term)?.clone();
        if !defaults.enabled {
            return Err(Error::ElectionDisabled(term));
        }

        let previous = match store.active_election(&region, term) {
            Some(previous_id) => {
                let previous = store.election(previous_id)?;
                if previous.state != ElectionState::Finalized {
                    return Err(Error::AlreadyOpen {
                        region,
                        term,
                        election_id: previous_id,
                    });
                }
                Some((previous_id, previous.vault_id.is_some()))
            }
            None => None,
        };

        if let Some((previous_id, true)) = previous {
            self.collaborators.reward_vault.close(previous_id)?;
        }

        let election_id = store.next_id;
        let vault_id = match self
            .collaborators
            .reward_vault
            .open(election_id, defaults.awardees)
        {
            Ok(vault_id) => Some(vault_id),
            Err(VaultError::InsufficientBudget {
                required,
                available,
            }) => {
                warn!(
                    election_id,
                    required, available, "reward budget too small, election runs without a vault"
                );
                None
            }
        };

        let start_time = now + 1;
        let mut election =
            Election::from_configuration(election_id, term, region, start_time, &defaults);
        election.vault_id = vault_id;

        store.next_id += 1;
        store.elections.insert(election_id, election);
        store.registered_beneficiaries.insert(election_id, Vec::new());
        store.active_elections.insert((region, term), election_id);

        if let Some((previous_id, true)) = previous {
            store.journal.emit(
                now,
                ElectionEvent::VaultClosed {
                    election_id: previous_id,
                },
            )?;
        }
        store.journal.emit(
            now,
            ElectionEvent::ElectionInitialized {
                term,
                region,
                start_time,
            },
        )?;
        if let Some(vault_id) = vault_id {
            store
                .journal
                .emit(now, ElectionEvent::VaultInitialized { election_id, vault_id })?;
        }

        info!(
            election_id,
            ?term,
            region = %region,
            start_time,
            vault = vault_id.is_some(),
            "🗳️  Election initialized"
        );

        Ok(election_id)
    }

    /// Recompute the stored state from the clock
    ///
    /// Idempotent and never regresses. Crossing into `Closed` on an election
    /// that uses randomization issues the randomness request.
    pub fn refresh_state(&self, election_id: ElectionId) -> Result<ElectionState> {
        let mut store = self.write_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        let current = election.state;
        let next = election.state_at(now);
        if next == current {
            return Ok(current);
        }

        let request = if next == ElectionState::Closed
            && election.use_randomization
            && election.randomness_request.is_none()
        {
            let seed = randomness_seed(election, now);
            let request_id = self.collaborators.randomness.request_number(seed)?;
            Some((seed, request_id))
        } else {
            None
        };

        let election = store.election_mut(election_id)?;
        election.state = next;
        if let Some((_, request_id)) = request {
            election.randomness_request = Some(request_id);
        }

        store.journal.emit(
            now,
            ElectionEvent::ElectionStateChanged {
                election_id,
                from: current,
                to: next,
            },
        )?;
        if let Some((seed, _)) = request {
            store
                .journal
                .emit(now, ElectionEvent::RandomNumberRequested { election_id, seed })?;
        }

        info!(election_id, from = ?current, to = ?next, "election state refreshed");
        Ok(next)
    }

    /// Overwrite the default row for `term`; running elections keep their copy
    pub fn set_configuration(
        &self,
        caller: &Address,
        term: ElectionTerm,
        configuration: ElectionConfiguration,
    ) -> Result<()> {
        self.require_role(caller, Role::Governance)?;
        configuration.validate()?;

        let mut store = self.write_store()?;
        info!(?term, ?configuration, "election defaults updated");
        store.term_defaults.insert(term, configuration);
        Ok(())
    }

    /// Flip the bond requirement of `term`'s defaults, returning the new value
    pub fn toggle_registration_bond_requirement(
        &self,
        caller: &Address,
        term: ElectionTerm,
    ) -> Result<bool> {
        self.require_role(caller, Role::Governance)?;

        let mut store = self.write_store()?;
        let row = store
            .term_defaults
            .get_mut(&term)
            .ok_or_else(|| internal_error!("no defaults for term {:?}", term))?;
        row.registration_bond_required = !row.registration_bond_required;

        info!(?term, required = row.registration_bond_required, "registration bond toggled");
        Ok(row.registration_bond_required)
    }

    pub fn term_defaults(&self, term: ElectionTerm) -> Result<ElectionConfiguration> {
        Ok(self.read_store()?.term_defaults(term)?.clone())
    }

    pub fn election(&self, election_id: ElectionId) -> Result<Election> {
        Ok(self.read_store()?.election(election_id)?.clone())
    }

    /// Latest election id for `(region, term)`
    pub fn active_election(&self, region: &Region, term: ElectionTerm) -> Result<Option<ElectionId>> {
        Ok(self.read_store()?.active_election(region, term))
    }

    pub fn registered_beneficiaries(&self, election_id: ElectionId) -> Result<Vec<Address>> {
        let store = self.read_store()?;
        store.election(election_id)?;
        Ok(store.beneficiaries(election_id).to_vec())
    }

    pub fn votes(&self, election_id: ElectionId) -> Result<Vec<Vote>> {
        let store = self.read_store()?;
        store.election(election_id)?;
        Ok(store.votes(election_id).to_vec())
    }

    pub fn election_merkle_root(&self, election_id: ElectionId) -> Result<Option<MerkleRoot>> {
        Ok(self.read_store()?.election(election_id)?.merkle_root)
    }

    /// Every journal record emitted so far
    pub fn events(&self) -> Result<Vec<EventRecord>> {
        Ok(self.read_store()?.journal().records().to_vec())
    }

    /// Journal records after sequence number `after`
    pub fn events_since(&self, after: u64) -> Result<Vec<EventRecord>> {
        Ok(self.read_store()?.journal().since(after).to_vec())
    }

    pub fn verify_journal(&self) -> Result<JournalIntegrityReport> {
        self.read_store()?.journal().verify()
    }
}
