//! # Trie Node: the four node types
//!
//! - **Empty**: null reference, hashes to the all-zero root
//! - **Leaf**: remaining path + value
//! - **Extension**: shared prefix + single child
//! - **Branch**: 16-way branch + optional value
//!
//! Node hashes are SHA-256 over a tag-prefixed, length-delimited encoding.
//! Child references hash at fixed width, so the encoding is prefix-free
//! and the root is deterministic across nodes.

use super::nibbles::Nibbles;
use sha2::{Digest, Sha256};

/// Digest output for trie commitments.
pub type Hash = [u8; 32];

/// Root committed to by the empty trie.
pub const EMPTY_TRIE_ROOT: Hash = [0u8; 32];

const TAG_LEAF: u8 = 0x01;
const TAG_EXTENSION: u8 = 0x02;
const TAG_BRANCH: u8 = 0x03;

/// One node of the radix-16 trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrieNode {
    /// Null reference.
    Empty,

    /// Terminal node: remaining key path and the stored value.
    Leaf { path: Nibbles, value: Vec<u8> },

    /// Shared-prefix optimization over a single child.
    Extension { path: Nibbles, child: Box<TrieNode> },

    /// 16-way branch, one slot per nibble, plus the value of a key that
    /// terminates here.
    Branch {
        children: Box<[TrieNode; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl TrieNode {
    /// Fresh all-empty branch.
    pub fn empty_branch() -> Self {
        TrieNode::Branch {
            children: Box::new(std::array::from_fn(|_| TrieNode::Empty)),
            value: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TrieNode::Empty)
    }

    /// Commitment hash of this subtree.
    pub fn hash(&self) -> Hash {
        match self {
            TrieNode::Empty => EMPTY_TRIE_ROOT,

            TrieNode::Leaf { path, value } => {
                let mut hasher = Sha256::new();
                hasher.update([TAG_LEAF]);
                hasher.update((path.len() as u32).to_le_bytes());
                hasher.update(&path.0);
                hasher.update((value.len() as u32).to_le_bytes());
                hasher.update(value);
                hasher.finalize().into()
            }

            TrieNode::Extension { path, child } => {
                let mut hasher = Sha256::new();
                hasher.update([TAG_EXTENSION]);
                hasher.update((path.len() as u32).to_le_bytes());
                hasher.update(&path.0);
                hasher.update(child.hash());
                hasher.finalize().into()
            }

            TrieNode::Branch { children, value } => {
                let mut hasher = Sha256::new();
                hasher.update([TAG_BRANCH]);
                for child in children.iter() {
                    hasher.update(child.hash());
                }
                match value {
                    Some(v) => {
                        hasher.update((v.len() as u32).to_le_bytes());
                        hasher.update(v);
                    }
                    None => hasher.update(0u32.to_le_bytes()),
                }
                hasher.finalize().into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hashes_to_zero() {
        assert_eq!(TrieNode::Empty.hash(), EMPTY_TRIE_ROOT);
    }

    #[test]
    fn test_leaf_hash_depends_on_path_and_value() {
        let a = TrieNode::Leaf {
            path: Nibbles(vec![1, 2]),
            value: vec![9],
        };
        let b = TrieNode::Leaf {
            path: Nibbles(vec![1, 3]),
            value: vec![9],
        };
        let c = TrieNode::Leaf {
            path: Nibbles(vec![1, 2]),
            value: vec![8],
        };

        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash(), a.clone().hash());
    }

    #[test]
    fn test_branch_slot_position_matters() {
        let leaf = TrieNode::Leaf {
            path: Nibbles::empty(),
            value: vec![7],
        };

        let mut branch_a = TrieNode::empty_branch();
        if let TrieNode::Branch { children, .. } = &mut branch_a {
            children[0] = leaf.clone();
        }

        let mut branch_b = TrieNode::empty_branch();
        if let TrieNode::Branch { children, .. } = &mut branch_b {
            children[1] = leaf;
        }

        assert_ne!(branch_a.hash(), branch_b.hash());
    }
}
