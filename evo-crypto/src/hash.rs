//! Hashing helpers: key ids and the BLAKE3 Merkle tree used for list commitments.

use blake3::Hasher as Blake3Hasher;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use evo_types::{Hash, KeyId};

/// Calculate SHA256 hash of input data
pub fn calculate_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> KeyId {
    let sha = calculate_sha256(data);
    Ripemd160::digest(sha).into()
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    Blake3Hasher::new().update(left).update(right).finalize().into()
}

/// Represents a Merkle Tree over BLAKE3 leaf hashes.
///
/// An odd node at any level is paired with itself.
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Constructs a Merkle Tree from a list of data blocks.
    pub fn new(data_blocks: &[&[u8]]) -> Self {
        let leaves = data_blocks
            .iter()
            .map(|block| blake3::hash(block).into())
            .collect();
        Self::from_leaf_hashes(leaves)
    }

    pub fn from_leaf_hashes(leaves: Vec<Hash>) -> Self {
        if leaves.is_empty() {
            return MerkleTree { levels: Vec::new() };
        }

        let mut levels = vec![leaves];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let next = levels
                .last()
                .map(|level| {
                    level
                        .chunks(2)
                        .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                        .collect::<Vec<Hash>>()
                })
                .unwrap_or_default();
            levels.push(next);
        }

        MerkleTree { levels }
    }

    /// Returns the Merkle root of the tree.
    pub fn root(&self) -> Option<Hash> {
        self.levels.last().and_then(|level| level.first().copied())
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }
}

/// Merkle root over the given data blocks, or the all-zero hash for an empty set.
pub fn merkle_root(data_blocks: &[&[u8]]) -> Hash {
    MerkleTree::new(data_blocks).root().unwrap_or([0u8; 32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn blocks<'a>(items: &[&'a str]) -> Vec<&'a [u8]> {
        items.iter().map(|s| s.as_bytes()).collect()
    }

    #[test]
    fn test_calculate_sha256() {
        let hash = calculate_sha256(&[]);
        assert_eq!(
            hash,
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );

        let hash = calculate_sha256(b"hello");
        assert_eq!(
            hash,
            hex!("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[test]
    fn test_hash160() {
        assert_eq!(hash160(&[]), hex!("b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"));
        assert_eq!(hash160(b"hello"), hex!("b6a9c8c230722b7c748331a8b450f05566dc7d0f"));
    }

    #[test]
    fn test_merkle_root_shapes() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);

        let single: Hash = blake3::hash(b"a").into();
        assert_eq!(merkle_root(&blocks(&["a"])), single);

        let a: Hash = blake3::hash(b"a").into();
        let b: Hash = blake3::hash(b"b").into();
        let c: Hash = blake3::hash(b"c").into();
        let ab = hash_pair(&a, &b);
        let cc = hash_pair(&c, &c);
        assert_eq!(merkle_root(&blocks(&["a", "b", "c"])), hash_pair(&ab, &cc));
    }

    #[test]
    fn test_merkle_root_is_order_sensitive() {
        assert_ne!(merkle_root(&blocks(&["a", "b"])), merkle_root(&blocks(&["b", "a"])));
        let tree = MerkleTree::new(&blocks(&["a", "b", "c", "d", "e"]));
        assert_eq!(tree.leaf_count(), 5);
        assert!(tree.root().is_some());
    }
}
