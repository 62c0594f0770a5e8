//! Caller-side waiting on election progress
//!
//! The engine answers every call immediately. Integrations that need to wait
//! for a phase change or a random number poll it here with exponential
//! backoff on tokio timers.

use crate::election::registry::GrantElections;
use crate::types::{ElectionId, ElectionState, RandomNumber};
use crate::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// Backoff schedule for polling loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_attempts: 20,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .checked_mul(2u32.pow(attempt.min(10)))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Refresh `election_id` until it reaches at least `target`
///
/// Gives up with [`Error::WrongState`] carrying the last observed state once
/// the policy runs out of attempts.
pub async fn wait_for_state(
    engine: &GrantElections,
    election_id: ElectionId,
    target: ElectionState,
    policy: RetryPolicy,
) -> Result<ElectionState> {
    let mut state = engine.refresh_state(election_id)?;
    for attempt in 0..policy.max_attempts {
        if state >= target {
            return Ok(state);
        }

        let delay = policy.delay_for(attempt);
        debug!(election_id, ?state, ?target, attempt, ?delay, "waiting for election state");
        tokio::time::sleep(delay).await;
        state = engine.refresh_state(election_id)?;
    }

    if state >= target {
        Ok(state)
    } else {
        Err(Error::WrongState {
            expected: target,
            actual: state,
        })
    }
}

/// Poll [`GrantElections::get_random_number`] while it reports pending
pub async fn wait_for_random_number(
    engine: &GrantElections,
    election_id: ElectionId,
    policy: RetryPolicy,
) -> Result<RandomNumber> {
    for attempt in 0..=policy.max_attempts {
        match engine.get_random_number(election_id) {
            Err(Error::RandomNumberPending(_)) if attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                debug!(election_id, attempt, ?delay, "random number pending");
                tokio::time::sleep(delay).await;
            }
            outcome => return outcome,
        }
    }

    Err(Error::RandomNumberPending(election_id))
}
