// Name hash functions

use crate::config::ROOT_NODE;
use crate::crypto::Hash;

/// Compute the hash of a single label using blake3.
/// The label is normalized to ASCII lowercase before hashing.
pub fn label_hash(label: &str) -> Hash {
    let normalized = label.to_ascii_lowercase();
    let hash_bytes = blake3::hash(normalized.as_bytes());
    Hash::new(hash_bytes.into())
}

/// Derive a child node id from a parent node id and a label hash.
/// child = blake3(parent || label_hash)
pub fn subnode(parent: &Hash, label: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(parent.as_bytes());
    hasher.update(label.as_bytes());
    let hash_bytes = hasher.finalize();
    Hash::new(hash_bytes.into())
}

/// Compute the node id of a dotted name, folding labels from the root.
/// `namehash("iov.rsk")` derives `rsk` under the root node, then `iov`
/// under `rsk`. The empty name maps to the root node itself.
pub fn namehash(name: &str) -> Hash {
    let mut node = ROOT_NODE;
    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        node = subnode(&node, &label_hash(label));
    }
    node
}
