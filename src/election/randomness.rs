//! Poll-style access to externally supplied random numbers

use crate::election::events::ElectionEvent;
use crate::election::record::Election;
use crate::election::registry::GrantElections;
use crate::types::{ElectionId, ElectionState, RandomNumber, Timestamp};
use crate::{Error, Result};
use tracing::{debug, info};

/// Seed handed to the randomness source for `election`
pub(crate) fn randomness_seed(election: &Election, now: Timestamp) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&election.id.to_le_bytes());
    hasher.update(&[election.term.code()]);
    hasher.update(&election.start_time.to_le_bytes());
    hasher.update(&now.to_le_bytes());

    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

impl GrantElections {
    /// Resolve the random number of a closed, randomized election
    ///
    /// Returns [`Error::RandomNumberPending`] until the source fulfils the
    /// request; callers poll. Once resolved the number is stored and every
    /// later call returns it unchanged. A closed election without a request
    /// on record gets one issued here, and the call still reports pending.
    pub fn get_random_number(&self, election_id: ElectionId) -> Result<RandomNumber> {
        let mut store = self.write_store()?;
        let now = self.now();

        let election = store.election(election_id)?;
        if !election.use_randomization {
            return Err(Error::RandomizationDisabled(election_id));
        }
        if let Some(number) = election.random_number {
            return Ok(number);
        }
        if election.state < ElectionState::Closed {
            return Err(Error::WrongState {
                expected: ElectionState::Closed,
                actual: election.state,
            });
        }

        let Some(request_id) = election.randomness_request else {
            let seed = randomness_seed(election, now);
            let request_id = self.collaborators.randomness.request_number(seed)?;
            store.election_mut(election_id)?.randomness_request = Some(request_id);
            store
                .journal
                .emit(now, ElectionEvent::RandomNumberRequested { election_id, seed })?;
            return Err(Error::RandomNumberPending(election_id));
        };

        let Some(number) = self.collaborators.randomness.fulfilled_number(&request_id) else {
            debug!(election_id, %request_id, "random number still pending");
            return Err(Error::RandomNumberPending(election_id));
        };

        store.election_mut(election_id)?.random_number = Some(number);
        store.journal.emit(
            now,
            ElectionEvent::RandomNumberResolved {
                election_id,
                random_number: number,
            },
        )?;

        info!(election_id, random_number = number, "🎲 Random number resolved");
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElectionConfiguration;
    use crate::election::memory::InMemoryEnvironment;
    use crate::types::{ElectionTerm, ONE_DAY, Region};

    #[test]
    fn test_seed_depends_on_inputs() {
        let election = Election::from_configuration(
            1,
            ElectionTerm::Monthly,
            Region::named("World"),
            100,
            &ElectionConfiguration::default_for(ElectionTerm::Monthly),
        );

        assert_eq!(randomness_seed(&election, 5), randomness_seed(&election, 5));
        assert_ne!(randomness_seed(&election, 5), randomness_seed(&election, 6));

        let yearly = Election {
            term: ElectionTerm::Yearly,
            ..election.clone()
        };
        assert_ne!(randomness_seed(&election, 5), randomness_seed(&yearly, 5));
    }

    #[test]
    fn test_random_number_handshake() {
        let env = InMemoryEnvironment::new(0);
        let engine = env.engine();
        let id = engine
            .initialize(ElectionTerm::Monthly, Region::named("World"))
            .unwrap();

        assert!(matches!(
            engine.get_random_number(id),
            Err(Error::WrongState { .. })
        ));

        env.clock.advance(30 * ONE_DAY);
        engine.refresh_state(id).unwrap();
        assert!(matches!(
            engine.get_random_number(id),
            Err(Error::RandomNumberPending(_))
        ));

        let request = engine.election(id).unwrap().randomness_request.unwrap();
        env.randomness.fulfill(&request, 8).unwrap();

        assert_eq!(engine.get_random_number(id).unwrap(), 8);
        assert_eq!(engine.election(id).unwrap().random_number, Some(8));

        // A request is fulfilled once
        assert!(env.randomness.fulfill(&request, 9).is_err());
        assert_eq!(engine.get_random_number(id).unwrap(), 8);
    }

    #[test]
    fn test_random_number_requires_randomized_election() {
        let env = InMemoryEnvironment::new(0);
        let engine = env.engine();

        let mut row = ElectionConfiguration::default_for(ElectionTerm::Monthly);
        row.use_randomization = false;
        engine
            .set_configuration(&env.governance, ElectionTerm::Monthly, row)
            .unwrap();
        let id = engine
            .initialize(ElectionTerm::Monthly, Region::named("World"))
            .unwrap();

        assert!(matches!(
            engine.get_random_number(id),
            Err(Error::RandomizationDisabled(_))
        ));
    }
}
