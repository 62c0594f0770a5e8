//! Merkle commitments over finalized allocations
//!
//! Leaves hash `(beneficiary, amount)` pairs; inner nodes hash their two
//! children. A level with an odd count pairs its last node with itself, and
//! the empty tree commits to the zero root.

use crate::election::vault_share::VaultShare;
use crate::types::{Hash, MerkleRoot};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

const LEAF_DOMAIN: &[u8] = b"grant-elections/allocation-leaf";
const NODE_DOMAIN: &[u8] = b"grant-elections/allocation-node";

/// One sibling on the path from a leaf to the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Hash,
    pub sibling_on_left: bool,
}

/// Binary hash tree over a list of shares
#[derive(Debug, Clone)]
pub struct AllocationTree {
    levels: Vec<Vec<Hash>>,
}

impl AllocationTree {
    pub fn new(shares: &[VaultShare]) -> Self {
        let leaves: Vec<Hash> = shares.iter().map(Self::leaf_hash).collect();
        let mut levels = vec![leaves];

        while levels.last().is_some_and(|level| level.len() > 1) {
            let current = &levels[levels.len() - 1];
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| node_hash(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }

        Self { levels }
    }

    pub fn leaf_hash(share: &VaultShare) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LEAF_DOMAIN);
        hasher.update(share.beneficiary.as_bytes());
        hasher.update(&share.amount.to_be_bytes());
        *hasher.finalize().as_bytes()
    }

    pub fn root(&self) -> MerkleRoot {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or([0u8; 32])
    }

    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path proving the leaf at `index`, `None` when out of range
    pub fn proof(&self, index: usize) -> Option<Vec<ProofStep>> {
        if index >= self.len() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_position = position ^ 1;
            let sibling = level
                .get(sibling_position)
                .copied()
                .unwrap_or(level[position]);
            steps.push(ProofStep {
                sibling,
                sibling_on_left: sibling_position < position,
            });
            position /= 2;
        }

        Some(steps)
    }

    /// Check that `share` is committed to by `root` through `proof`
    pub fn verify(root: &MerkleRoot, share: &VaultShare, proof: &[ProofStep]) -> bool {
        let computed = proof.iter().fold(Self::leaf_hash(share), |node, step| {
            if step.sibling_on_left {
                node_hash(&step.sibling, &node)
            } else {
                node_hash(&node, &step.sibling)
            }
        });

        computed.ct_eq(root).into()
    }
}

fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NODE_DOMAIN);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn shares(count: usize) -> Vec<VaultShare> {
        (0..count)
            .map(|i| VaultShare {
                beneficiary: Address::from_label(&format!("awardee-{i}")),
                amount: 10 * (i as u128 + 1),
            })
            .collect()
    }

    #[test]
    fn test_empty_tree_has_zero_root() {
        let tree = AllocationTree::new(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), [0u8; 32]);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let shares = shares(1);
        let tree = AllocationTree::new(&shares);
        assert_eq!(tree.root(), AllocationTree::leaf_hash(&shares[0]));
        assert!(tree.proof(0).unwrap().is_empty());
    }

    #[test]
    fn test_odd_level_pairs_last_node_with_itself() {
        let shares = shares(3);
        let tree = AllocationTree::new(&shares);

        let leaves: Vec<Hash> = shares.iter().map(AllocationTree::leaf_hash).collect();
        let expected = node_hash(
            &node_hash(&leaves[0], &leaves[1]),
            &node_hash(&leaves[2], &leaves[2]),
        );
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_every_proof_verifies() {
        for count in 1..=7 {
            let shares = shares(count);
            let tree = AllocationTree::new(&shares);
            let root = tree.root();

            for (index, share) in shares.iter().enumerate() {
                let proof = tree.proof(index).unwrap();
                assert!(AllocationTree::verify(&root, share, &proof), "leaf {index} of {count}");
            }
        }
    }

    #[test]
    fn test_tampered_share_fails_verification() {
        let shares = shares(4);
        let tree = AllocationTree::new(&shares);
        let proof = tree.proof(2).unwrap();

        let mut forged = shares[2];
        forged.amount += 1;
        assert!(!AllocationTree::verify(&tree.root(), &forged, &proof));
        assert!(!AllocationTree::verify(&tree.root(), &shares[1], &proof));
    }

    #[test]
    fn test_root_depends_on_order() {
        let mut shares = shares(2);
        let root = AllocationTree::new(&shares).root();
        shares.swap(0, 1);
        assert_ne!(AllocationTree::new(&shares).root(), root);
    }
}
