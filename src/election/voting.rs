//! Quadratic voting
//!
//! A voter spends voice credits across registered beneficiaries in a single
//! ballot. Each allocation counts with weight `round(sqrt(credits))`, which
//! dampens large holders: 100 credits buy a weight of 10, not 100.

use crate::election::events::ElectionEvent;
use crate::election::record::Vote;
use crate::election::registry::GrantElections;
use crate::types::{Address, Amount, ElectionId, ElectionState, Weight};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, info};

/// Largest `r` with `r * r <= n`
pub fn integer_sqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    // Newton iteration from an upper bound; converges monotonically downward
    let mut x = 1u128 << (128 - n.leading_zeros()).div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Quadratic vote weight: square root of `credits`, rounded half up
pub fn quadratic_weight(credits: Amount) -> Weight {
    let root = integer_sqrt(credits);
    // sqrt(n) >= root + 0.5  <=>  n >= root^2 + root + 1/4  <=>  n - root^2 > root
    if credits - root * root > root {
        root + 1
    } else {
        root
    }
}

impl GrantElections {
    /// Cast `voter`'s single ballot in `election_id`
    ///
    /// `beneficiaries[i]` receives `quadratic_weight(voice_credits[i])`. The
    /// credit total may not exceed what the voice-credit oracle reports for
    /// the voter right now, and a voter gets one ballot per election.
    pub fn vote(
        &self,
        voter: &Address,
        beneficiaries: &[Address],
        voice_credits: &[Amount],
        election_id: ElectionId,
    ) -> Result<Vec<Vote>> {
        if voice_credits.is_empty() {
            return Err(Error::EmptyCredits);
        }
        if beneficiaries.is_empty() {
            return Err(Error::EmptyBeneficiaries);
        }
        if beneficiaries.len() != voice_credits.len() {
            return Err(Error::LengthMismatch {
                beneficiaries: beneficiaries.len(),
                credits: voice_credits.len(),
            });
        }

        let mut store = self.write_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        let stored_state = election.state;
        if election.state_at(now) != ElectionState::Voting {
            return Err(Error::NotVotingPeriod(election_id));
        }

        let available = self.collaborators.voice_credits.credits_for(voter, now);
        if available == 0 {
            return Err(Error::NoVoiceCredits(*voter));
        }
        let requested = voice_credits
            .iter()
            .try_fold(0u128, |sum, credits| sum.checked_add(*credits))
            .ok_or(Error::ArithmeticOverflow("voice credit total"))?;
        if requested > available {
            return Err(Error::InsufficientCredits {
                requested,
                available,
            });
        }

        if let Some(unregistered) = beneficiaries
            .iter()
            .find(|beneficiary| !store.is_registered(election_id, beneficiary))
        {
            return Err(Error::IneligibleBeneficiary(*unregistered));
        }
        if store.has_voted(election_id, voter) {
            return Err(Error::AlreadyVoted {
                voter: *voter,
                election_id,
            });
        }

        let ballot: Vec<Vote> = beneficiaries
            .iter()
            .zip(voice_credits)
            .map(|(beneficiary, credits)| Vote {
                election_id,
                voter: *voter,
                beneficiary: *beneficiary,
                weight: quadratic_weight(*credits),
            })
            .collect();

        // Compute the new tallies before touching the store
        let mut updated: HashMap<Address, Weight> = HashMap::new();
        for vote in &ballot {
            let current = match updated.get(&vote.beneficiary) {
                Some(weight) => *weight,
                None => store.tally(election_id, &vote.beneficiary),
            };
            let next = current
                .checked_add(vote.weight)
                .ok_or(Error::ArithmeticOverflow("vote tally"))?;
            updated.insert(vote.beneficiary, next);
        }

        if stored_state != ElectionState::Voting {
            store.election_mut(election_id)?.state = ElectionState::Voting;
            store.journal.emit(
                now,
                ElectionEvent::ElectionStateChanged {
                    election_id,
                    from: stored_state,
                    to: ElectionState::Voting,
                },
            )?;
        }

        store.tallies.entry(election_id).or_default().extend(updated);
        store.voters.entry(election_id).or_default().insert(*voter);
        store
            .votes
            .entry(election_id)
            .or_default()
            .extend(ballot.iter().cloned());

        for vote in &ballot {
            debug!(
                election_id,
                beneficiary = %vote.beneficiary.short(),
                weight = vote.weight,
                "vote recorded"
            );
            store.journal.emit(
                now,
                ElectionEvent::VoteCast {
                    election_id,
                    voter: vote.voter,
                    beneficiary: vote.beneficiary,
                    weight: vote.weight,
                },
            )?;
        }

        info!(
            election_id,
            voter = %voter.short(),
            allocations = ballot.len(),
            credits = requested,
            "🗳️  Ballot cast"
        );
        Ok(ballot)
    }
}
