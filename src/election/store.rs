//! Owned state of the election engine
//!
//! Key layout mirrors an external key-value store: active elections by
//! `(region, term)`, election records, registered beneficiaries, votes and
//! running tallies by election id, and term defaults by term.

use crate::config::ElectionConfiguration;
use crate::election::events::EventJournal;
use crate::election::record::{Election, Vote};
use crate::types::{Address, ElectionId, ElectionTerm, Region, Weight};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
pub(crate) struct ElectionStore {
    pub(crate) next_id: ElectionId,
    pub(crate) active_elections: HashMap<(Region, ElectionTerm), ElectionId>,
    pub(crate) elections: BTreeMap<ElectionId, Election>,
    pub(crate) registered_beneficiaries: HashMap<ElectionId, Vec<Address>>,
    pub(crate) votes: HashMap<ElectionId, Vec<Vote>>,
    pub(crate) voters: HashMap<ElectionId, HashSet<Address>>,
    pub(crate) tallies: HashMap<ElectionId, HashMap<Address, Weight>>,
    pub(crate) term_defaults: HashMap<ElectionTerm, ElectionConfiguration>,
    pub(crate) journal: EventJournal,
}

impl ElectionStore {
    /// Empty store seeded with the shipped term defaults
    pub fn new() -> Self {
        let term_defaults = ElectionTerm::ALL
            .into_iter()
            .map(|term| (term, ElectionConfiguration::default_for(term)))
            .collect();

        Self {
            next_id: 0,
            active_elections: HashMap::new(),
            elections: BTreeMap::new(),
            registered_beneficiaries: HashMap::new(),
            votes: HashMap::new(),
            voters: HashMap::new(),
            tallies: HashMap::new(),
            term_defaults,
            journal: EventJournal::new(),
        }
    }

    pub fn election(&self, id: ElectionId) -> Result<&Election> {
        self.elections.get(&id).ok_or(Error::UnknownElection(id))
    }

    pub fn election_mut(&mut self, id: ElectionId) -> Result<&mut Election> {
        self.elections.get_mut(&id).ok_or(Error::UnknownElection(id))
    }

    pub fn term_defaults(&self, term: ElectionTerm) -> Result<&ElectionConfiguration> {
        self.term_defaults
            .get(&term)
            .ok_or_else(|| Error::internal(format!("no defaults for term {term:?}")))
    }

    pub fn active_election(&self, region: &Region, term: ElectionTerm) -> Option<ElectionId> {
        self.active_elections.get(&(*region, term)).copied()
    }

    pub fn beneficiaries(&self, id: ElectionId) -> &[Address] {
        self.registered_beneficiaries
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_registered(&self, id: ElectionId, beneficiary: &Address) -> bool {
        self.beneficiaries(id).contains(beneficiary)
    }

    pub fn votes(&self, id: ElectionId) -> &[Vote] {
        self.votes.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_voted(&self, id: ElectionId, voter: &Address) -> bool {
        self.voters
            .get(&id)
            .is_some_and(|voters| voters.contains(voter))
    }

    /// Accumulated weight for `beneficiary`, zero when no votes were cast
    pub fn tally(&self, id: ElectionId, beneficiary: &Address) -> Weight {
        self.tallies
            .get(&id)
            .and_then(|tally| tally.get(beneficiary))
            .copied()
            .unwrap_or(0)
    }

    /// Registered beneficiaries with their tallies, in registration order
    pub fn standings(&self, id: ElectionId) -> Vec<(Address, Weight)> {
        self.beneficiaries(id)
            .iter()
            .map(|beneficiary| (*beneficiary, self.tally(id, beneficiary)))
            .collect()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }
}

impl Default for ElectionStore {
    fn default() -> Self {
        Self::new()
    }
}
