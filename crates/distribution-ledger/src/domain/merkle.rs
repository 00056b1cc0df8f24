//! # Merkle Verifier and Leaf Encoder
//!
//! Pure functions, no state.
//!
//! ## Leaf layout
//!
//! ```text
//! leaf = keccak256( recipient[20] || amount[32, big-endian] )
//! ```
//!
//! No length prefixes, no separators. Off-line tree builders must produce
//! exactly these bytes; a mismatch does not show up as an error, only as
//! every claim against the root failing with `InvalidProof`.
//!
//! ## Node hashing
//!
//! Parent nodes hash the *sorted* pair, so a proof is a plain list of
//! siblings without left/right markers:
//!
//! ```text
//! parent = keccak256( min(a, b) || max(a, b) )
//! ```

use sha3::{Digest, Keccak256};

use super::value_objects::{amount_to_be_bytes, Address, Hash, U256};

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Hash::new(Keccak256::digest(data).into())
}

/// Encode `(recipient, amount)` into the leaf hash committed in a tree.
#[must_use]
pub fn encode_leaf(recipient: Address, amount: U256) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(recipient.as_bytes());
    hasher.update(amount_to_be_bytes(amount));
    Hash::new(hasher.finalize().into())
}

/// Hash two nodes in ascending byte order.
#[must_use]
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Keccak256::new();
    hasher.update(first.as_bytes());
    hasher.update(second.as_bytes());
    Hash::new(hasher.finalize().into())
}

/// Decide whether `leaf` is included under `root`.
///
/// Folds the proof left to right starting from the leaf. An empty proof
/// verifies only when the leaf is the root.
#[must_use]
pub fn verify(proof: &[Hash], root: Hash, leaf: Hash) -> bool {
    let computed = proof
        .iter()
        .fold(leaf, |running, sibling| hash_pair(&running, sibling));
    computed == root
}

// =============================================================================
// TREE BUILDER (tests and benchmarks only)
// =============================================================================

/// Sorted-pair Keccak Merkle tree over claim leaves.
///
/// Mirrors what an off-line distribution tool produces: leaves in input
/// order, an unpaired node is promoted to the next level unchanged.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// layers[0] = leaves, last layer = [root]
    layers: Vec<Vec<Hash>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MerkleTree {
    /// Build a tree from already-encoded leaves.
    #[must_use]
    pub fn from_leaves(leaves: Vec<Hash>) -> Self {
        let mut layers = vec![leaves];
        while layers.last().map_or(0, Vec::len) > 1 {
            let next = layers
                .last()
                .map(|layer| {
                    layer
                        .chunks(2)
                        .map(|pair| match pair {
                            [left, right] => hash_pair(left, right),
                            [single] => *single,
                            _ => unreachable!("chunks(2) yields one or two nodes"),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            layers.push(next);
        }
        Self { layers }
    }

    /// Build a tree from `(recipient, amount)` allocations.
    #[must_use]
    pub fn from_allocations(allocations: &[(Address, U256)]) -> Self {
        Self::from_leaves(
            allocations
                .iter()
                .map(|(recipient, amount)| encode_leaf(*recipient, *amount))
                .collect(),
        )
    }

    /// Root hash (zero for an empty tree).
    #[must_use]
    pub fn root(&self) -> Hash {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    /// Number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Sibling path for the leaf at `index`, bottom-up.
    #[must_use]
    pub fn proof(&self, index: usize) -> Option<Vec<Hash>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut proof = Vec::new();
        let mut idx = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = idx ^ 1;
            if let Some(hash) = layer.get(sibling) {
                proof.push(*hash);
            }
            idx /= 2;
        }
        Some(proof)
    }
}

// =============================================================================
// TESTS
// =============================================================================
