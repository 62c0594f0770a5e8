//! Awardee selection from closed-election tallies

use crate::types::{Address, RandomNumber, Weight};
use serde::{Deserialize, Serialize};

/// A selected beneficiary with the weight it carried into selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Awardee {
    pub beneficiary: Address,
    pub weight: Weight,
}

/// Pick the awardees from `standings`, given in registration order
///
/// Candidates are ordered by weight, heaviest first, with earlier
/// registrations winning ties. The top `ranking_size` form the shortlist.
/// A random number rotates the shortlist left by `random % len` before the
/// first `awardee_count` entries are taken. Fewer candidates than
/// `awardee_count` yields a shorter list.
pub fn rank_awardees(
    standings: &[(Address, Weight)],
    ranking_size: usize,
    awardee_count: usize,
    random_number: Option<RandomNumber>,
) -> Vec<Awardee> {
    let mut shortlist: Vec<Awardee> = standings
        .iter()
        .map(|(beneficiary, weight)| Awardee {
            beneficiary: *beneficiary,
            weight: *weight,
        })
        .collect();

    // sort_by is stable, so equal weights keep registration order
    shortlist.sort_by(|a, b| b.weight.cmp(&a.weight));
    shortlist.truncate(ranking_size);

    if let Some(random) = random_number.filter(|_| !shortlist.is_empty()) {
        let offset = (random % shortlist.len() as u64) as usize;
        shortlist.rotate_left(offset);
    }

    shortlist.truncate(awardee_count);
    shortlist
}
