// Namehash utilities
//
// Node identifiers form a tree: a child id is derived from its parent id
// and the hash of a single label. The derivation is pure and needs no
// registry state.

mod hash;

pub use hash::*;
