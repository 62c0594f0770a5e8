//! Reward pool split across awardees

use crate::election::ranking::Awardee;
use crate::types::{Address, Amount, ShareType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Amount owed to one awardee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultShare {
    pub beneficiary: Address,
    pub amount: Amount,
}

/// Split `total` across `awardees`
///
/// Every share truncates toward zero and the remainder stays in the vault,
/// so the shares never sum past `total`. `DynamicWeight` with no weight at
/// all hands out nothing.
pub fn calculate_vault_share(
    awardees: &[Awardee],
    share_type: ShareType,
    total: Amount,
) -> Result<Vec<VaultShare>> {
    if awardees.is_empty() {
        return Ok(Vec::new());
    }

    match share_type {
        ShareType::EqualWeight => {
            let amount = total / awardees.len() as Amount;
            Ok(awardees
                .iter()
                .map(|awardee| VaultShare {
                    beneficiary: awardee.beneficiary,
                    amount,
                })
                .collect())
        }
        ShareType::DynamicWeight => {
            let total_weight = awardees
                .iter()
                .try_fold(0u128, |sum, awardee| sum.checked_add(awardee.weight))
                .ok_or(Error::ArithmeticOverflow("total awardee weight"))?;

            awardees
                .iter()
                .map(|awardee| {
                    let amount = if total_weight == 0 {
                        0
                    } else {
                        total
                            .checked_mul(awardee.weight)
                            .ok_or(Error::ArithmeticOverflow("weighted share"))?
                            / total_weight
                    };
                    Ok(VaultShare {
                        beneficiary: awardee.beneficiary,
                        amount,
                    })
                })
                .collect()
        }
    }
}
