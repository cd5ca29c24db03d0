//! # Patricia Trie
//!
//! Owned recursive radix-16 trie. Mutation rebuilds only the touched path;
//! the root hash is computed over the canonical structure, so any insert
//! order reaching the same map commits to the same root.

use super::errors::TrieError;
use super::nibbles::Nibbles;
use super::node::{Hash, TrieNode, EMPTY_TRIE_ROOT};

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 64;

/// Maximum value length in bytes.
pub const MAX_VALUE_LEN: usize = 256;

/// Authenticated map `bytes → bytes` with a root-hash commitment.
#[derive(Clone, Debug)]
pub struct PatriciaTrie {
    root: TrieNode,
    len: usize,
}

impl PatriciaTrie {
    /// Create a new empty trie.
    pub fn new() -> Self {
        Self {
            root: TrieNode::Empty,
            len: 0,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current root hash; the all-zero hash for an empty trie.
    pub fn root_hash(&self) -> Hash {
        if self.len == 0 {
            return EMPTY_TRIE_ROOT;
        }
        self.root.hash()
    }

    /// Insert or overwrite `key → value`.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), TrieError> {
        if key.len() > MAX_KEY_LEN {
            return Err(TrieError::InputTooLarge {
                what: "key",
                actual: key.len(),
                limit: MAX_KEY_LEN,
            });
        }
        if value.len() > MAX_VALUE_LEN {
            return Err(TrieError::InputTooLarge {
                what: "value",
                actual: value.len(),
                limit: MAX_VALUE_LEN,
            });
        }

        let path = Nibbles::from_bytes(key);
        let root = std::mem::replace(&mut self.root, TrieNode::Empty);
        let (root, inserted) = Self::insert_at(root, path, value.to_vec());
        self.root = root;
        if inserted {
            self.len += 1;
        }
        Ok(())
    }

    /// Look up `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let path = Nibbles::from_bytes(key);
        Self::get_at(&self.root, &path, 0)
    }

    /// Remove `key`, restoring the canonical shape on the way out.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TrieError> {
        if key.len() > MAX_KEY_LEN {
            return Err(TrieError::InputTooLarge {
                what: "key",
                actual: key.len(),
                limit: MAX_KEY_LEN,
            });
        }

        let path = Nibbles::from_bytes(key);
        let root = std::mem::replace(&mut self.root, TrieNode::Empty);
        let (root, removed) = Self::delete_at(root, &path);
        self.root = root;

        if removed {
            self.len -= 1;
            Ok(())
        } else {
            Err(TrieError::KeyNotFound)
        }
    }

    // =========================================================================
    // RECURSIVE WORKERS
    // =========================================================================

    /// Returns the rebuilt subtree and whether a NEW key was added
    /// (false on overwrite).
    fn insert_at(node: TrieNode, path: Nibbles, value: Vec<u8>) -> (TrieNode, bool) {
        match node {
            TrieNode::Empty => (TrieNode::Leaf { path, value }, true),

            TrieNode::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                if leaf_path == path {
                    return (TrieNode::Leaf { path, value }, false);
                }

                let common = leaf_path.common_prefix_len(&path);
                let branch = Self::branch_of_two(
                    leaf_path.slice(common),
                    leaf_value,
                    path.slice(common),
                    value,
                );

                if common > 0 {
                    (
                        TrieNode::Extension {
                            path: path.slice_range(0, common),
                            child: Box::new(branch),
                        },
                        true,
                    )
                } else {
                    (branch, true)
                }
            }

            TrieNode::Extension {
                path: ext_path,
                child,
            } => {
                let common = ext_path.common_prefix_len(&path);

                if common == ext_path.len() {
                    // Descend below the extension.
                    let (new_child, inserted) = Self::insert_at(*child, path.slice(common), value);
                    return (
                        TrieNode::Extension {
                            path: ext_path,
                            child: Box::new(new_child),
                        },
                        inserted,
                    );
                }

                // Split the extension at the divergence point.
                let mut branch_children: [TrieNode; 16] = std::array::from_fn(|_| TrieNode::Empty);
                let mut branch_value = None;

                let ext_rest = ext_path.slice(common);
                let ext_slot = ext_rest.at(0) as usize;
                branch_children[ext_slot] = if ext_rest.len() == 1 {
                    *child
                } else {
                    TrieNode::Extension {
                        path: ext_rest.slice(1),
                        child,
                    }
                };

                let new_rest = path.slice(common);
                if new_rest.is_empty() {
                    branch_value = Some(value);
                } else {
                    let slot = new_rest.at(0) as usize;
                    branch_children[slot] = TrieNode::Leaf {
                        path: new_rest.slice(1),
                        value,
                    };
                }

                let branch = TrieNode::Branch {
                    children: Box::new(branch_children),
                    value: branch_value,
                };

                if common > 0 {
                    (
                        TrieNode::Extension {
                            path: path.slice_range(0, common),
                            child: Box::new(branch),
                        },
                        true,
                    )
                } else {
                    (branch, true)
                }
            }

            TrieNode::Branch {
                mut children,
                value: branch_value,
            } => {
                if path.is_empty() {
                    let inserted = branch_value.is_none();
                    return (
                        TrieNode::Branch {
                            children,
                            value: Some(value),
                        },
                        inserted,
                    );
                }

                let slot = path.at(0) as usize;
                let child = std::mem::replace(&mut children[slot], TrieNode::Empty);
                let (new_child, inserted) = Self::insert_at(child, path.slice(1), value);
                children[slot] = new_child;
                (
                    TrieNode::Branch {
                        children,
                        value: branch_value,
                    },
                    inserted,
                )
            }
        }
    }

    /// Branch joining two divergent suffixes (used when a leaf splits).
    fn branch_of_two(
        a_path: Nibbles,
        a_value: Vec<u8>,
        b_path: Nibbles,
        b_value: Vec<u8>,
    ) -> TrieNode {
        let mut children: [TrieNode; 16] = std::array::from_fn(|_| TrieNode::Empty);
        let mut value = None;

        if a_path.is_empty() {
            value = Some(a_value);
        } else {
            children[a_path.at(0) as usize] = TrieNode::Leaf {
                path: a_path.slice(1),
                value: a_value,
            };
        }

        if b_path.is_empty() {
            value = Some(b_value);
        } else {
            children[b_path.at(0) as usize] = TrieNode::Leaf {
                path: b_path.slice(1),
                value: b_value,
            };
        }

        TrieNode::Branch {
            children: Box::new(children),
            value,
        }
    }

    fn get_at<'a>(node: &'a TrieNode, path: &Nibbles, depth: usize) -> Option<&'a [u8]> {
        match node {
            TrieNode::Empty => None,

            TrieNode::Leaf {
                path: leaf_path,
                value,
            } => {
                let rest = path.slice(depth);
                if *leaf_path == rest {
                    Some(value)
                } else {
                    None
                }
            }

            TrieNode::Extension {
                path: ext_path,
                child,
            } => {
                let rest = path.slice(depth);
                if rest.starts_with(ext_path) {
                    Self::get_at(child, path, depth + ext_path.len())
                } else {
                    None
                }
            }

            TrieNode::Branch { children, value } => {
                if depth == path.len() {
                    return value.as_deref();
                }
                let slot = path.at(depth) as usize;
                Self::get_at(&children[slot], path, depth + 1)
            }
        }
    }

    /// Returns the rebuilt subtree and whether the key was present.
    fn delete_at(node: TrieNode, path: &Nibbles) -> (TrieNode, bool) {
        match node {
            TrieNode::Empty => (TrieNode::Empty, false),

            TrieNode::Leaf {
                path: leaf_path,
                value,
            } => {
                if leaf_path == *path {
                    (TrieNode::Empty, true)
                } else {
                    (TrieNode::Leaf { path: leaf_path, value }, false)
                }
            }

            TrieNode::Extension {
                path: ext_path,
                child,
            } => {
                if !path.starts_with(&ext_path) {
                    return (TrieNode::Extension { path: ext_path, child }, false);
                }

                let (new_child, removed) = Self::delete_at(*child, &path.slice(ext_path.len()));
                if !removed {
                    return (
                        TrieNode::Extension {
                            path: ext_path,
                            child: Box::new(new_child),
                        },
                        false,
                    );
                }

                // Re-canonicalize the shortened subtree.
                let collapsed = match new_child {
                    TrieNode::Empty => TrieNode::Empty,
                    TrieNode::Leaf { path: p, value } => TrieNode::Leaf {
                        path: ext_path.join(&p),
                        value,
                    },
                    TrieNode::Extension { path: p, child } => TrieNode::Extension {
                        path: ext_path.join(&p),
                        child,
                    },
                    branch @ TrieNode::Branch { .. } => TrieNode::Extension {
                        path: ext_path,
                        child: Box::new(branch),
                    },
                };
                (collapsed, true)
            }

            TrieNode::Branch {
                mut children,
                value,
            } => {
                let removed;
                let mut value = value;

                if path.is_empty() {
                    removed = value.is_some();
                    value = None;
                } else {
                    let slot = path.at(0) as usize;
                    let child = std::mem::replace(&mut children[slot], TrieNode::Empty);
                    let (new_child, child_removed) = Self::delete_at(child, &path.slice(1));
                    children[slot] = new_child;
                    removed = child_removed;
                }

                if !removed {
                    return (TrieNode::Branch { children, value }, false);
                }

                (Self::collapse_branch(children, value), true)
            }
        }
    }

    /// Fold a branch with fewer than two occupants back into the canonical
    /// leaf/extension shape.
    fn collapse_branch(mut children: Box<[TrieNode; 16]>, value: Option<Vec<u8>>) -> TrieNode {
        let occupied: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, _)| i)
            .collect();

        match (occupied.len(), value) {
            (0, None) => TrieNode::Empty,
            (0, Some(v)) => TrieNode::Leaf {
                path: Nibbles::empty(),
                value: v,
            },
            (1, None) => {
                let slot = occupied[0];
                let nibble = slot as u8;
                let child = std::mem::replace(&mut children[slot], TrieNode::Empty);
                match child {
                    TrieNode::Leaf { path, value } => TrieNode::Leaf {
                        path: path.prepend(nibble),
                        value,
                    },
                    TrieNode::Extension { path, child } => TrieNode::Extension {
                        path: path.prepend(nibble),
                        child,
                    },
                    branch @ TrieNode::Branch { .. } => TrieNode::Extension {
                        path: Nibbles(vec![nibble]),
                        child: Box::new(branch),
                    },
                    TrieNode::Empty => unreachable!("occupied slot cannot be empty"),
                }
            }
            (_, value) => TrieNode::Branch { children, value },
        }
    }
}

impl Default for PatriciaTrie {
    fn default() -> Self {
        Self::new()
    }
}
