//! # TS-01: Authenticated State Trie
//!
//! An authenticated map `bytes → bytes` whose root hash commits to the full
//! key/value content. One trie instance backs each token's balance state;
//! another backs the token registry.
//!
//! ## Architecture
//!
//! - **Nibbles**: half-byte path representation for radix-16 traversal
//! - **Node**: the four-variant sum type (Empty/Leaf/Extension/Branch)
//! - **Trie**: owned recursive structure with insert/get/delete/root_hash
//!
//! ## Invariants
//!
//! - The root hash is a pure function of the key→value mapping: any
//!   insertion order reaching the same map yields the same root.
//! - The empty trie commits to the all-zero hash.
//! - Deletion restores the canonical shape (no dangling branches or
//!   single-child branch nodes remain).

pub mod domain;

pub use domain::errors::TrieError;
pub use domain::nibbles::Nibbles;
pub use domain::node::TrieNode;
pub use domain::trie::{PatriciaTrie, MAX_KEY_LEN, MAX_VALUE_LEN};
