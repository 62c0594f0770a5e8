//! Beneficiary registration with optional bonding

use crate::election::events::ElectionEvent;
use crate::election::registry::GrantElections;
use crate::types::{Address, ElectionId, ElectionState};
use crate::{Error, Result};
use tracing::{info, warn};

impl GrantElections {
    /// Register `beneficiary` as a candidate in `election_id`
    ///
    /// Checks run in order: registry membership, registration phase,
    /// uniqueness, then bond collection from `caller` when the election
    /// requires one. Bonds are kept in the election's fund balance; refunds
    /// are not handled here. Registration order is preserved and later feeds
    /// the ranking tie-break.
    pub fn register_for_election(
        &self,
        caller: &Address,
        beneficiary: &Address,
        election_id: ElectionId,
    ) -> Result<()> {
        if !self.collaborators.beneficiary_registry.beneficiary_exists(beneficiary) {
            return Err(Error::NotEligible(*beneficiary));
        }

        let mut store = self.write_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        let state = election.state_at(now);
        if state != ElectionState::Registration {
            return Err(Error::WrongState {
                expected: ElectionState::Registration,
                actual: state,
            });
        }
        if store.is_registered(election_id, beneficiary) {
            return Err(Error::DuplicateRegistration {
                beneficiary: *beneficiary,
                election_id,
            });
        }

        let bond = if election.bond_required {
            election.registration_bond
        } else {
            0
        };
        let bond_balance = election
            .bond_balance
            .checked_add(bond)
            .ok_or(Error::ArithmeticOverflow("bond balance"))?;

        if bond > 0 {
            self.collaborators
                .bond_escrow
                .collect_bond(caller, election_id, bond)
                .map_err(|err| {
                    warn!(election_id, caller = %caller, %err, "registration bond not collected");
                    Error::InsufficientBond { required: bond }
                })?;
        }

        store.election_mut(election_id)?.bond_balance = bond_balance;
        store
            .registered_beneficiaries
            .entry(election_id)
            .or_default()
            .push(*beneficiary);
        store.journal.emit(
            now,
            ElectionEvent::BeneficiaryRegistered {
                election_id,
                beneficiary: *beneficiary,
                bond,
            },
        )?;

        info!(
            election_id,
            beneficiary = %beneficiary.short(),
            bond,
            "beneficiary registered"
        );
        Ok(())
    }
}
