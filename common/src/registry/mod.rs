// Name ownership registry
//
// Source of truth for "who owns this node". Nodes are created implicitly
// by the first `set_subnode_owner` call for their id; assignment is
// creation. The registry enforces one rule only: a node (and its direct
// children) can be mutated by its current owner alone. It deliberately
// does not enforce uniqueness of child assignments; overwrite protection
// for sales is layered on top by the subdomain registrar.

use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::ROOT_NODE,
    crypto::{Address, Hash},
    name::subnode,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Caller is not the owner of node {node}")]
    Unauthorized { node: Hash },
}

/// Registry entry for a single node.
/// `resolver` and `ttl` are pass-through fields carried for record
/// completeness; ownership is the only attribute the sale logic reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRecord {
    pub owner: Address,
    pub resolver: Address,
    pub ttl: u64,
}

impl NodeRecord {
    fn with_owner(owner: Address) -> Self {
        Self {
            owner,
            resolver: Address::zero(),
            ttl: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRegistry {
    records: IndexMap<Hash, NodeRecord>,
}

impl NameRegistry {
    /// Create the registry and assign the root node to the deployer.
    pub fn new(deployer: Address) -> Self {
        let mut records = IndexMap::new();
        records.insert(ROOT_NODE, NodeRecord::with_owner(deployer));
        Self { records }
    }

    /// Owner of a node. Unset nodes belong to the zero identity.
    pub fn owner(&self, node: &Hash) -> Address {
        self.records
            .get(node)
            .map(|record| record.owner.clone())
            .unwrap_or_else(Address::zero)
    }

    /// Resolver recorded for a node, zero if unset.
    pub fn resolver(&self, node: &Hash) -> Address {
        self.records
            .get(node)
            .map(|record| record.resolver.clone())
            .unwrap_or_else(Address::zero)
    }

    /// TTL recorded for a node, zero if unset.
    pub fn ttl(&self, node: &Hash) -> u64 {
        self.records.get(node).map(|record| record.ttl).unwrap_or(0)
    }

    fn require_owner(&self, caller: &Address, node: &Hash) -> Result<(), RegistryError> {
        if self.owner(node) != *caller {
            return Err(RegistryError::Unauthorized { node: node.clone() });
        }
        Ok(())
    }

    /// Transfer a node to a new owner. Only the current owner may call.
    pub fn set_owner(
        &mut self,
        caller: &Address,
        node: &Hash,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        self.require_owner(caller, node)?;
        trace!("set_owner: node {} -> {}", node, new_owner);

        match self.records.get_mut(node) {
            Some(record) => record.owner = new_owner,
            None => {
                // Unset node: only the zero identity passes the owner check
                self.records
                    .insert(node.clone(), NodeRecord::with_owner(new_owner));
            }
        }
        Ok(())
    }

    /// Assign (and implicitly create) the child of `parent` for `label`.
    /// Only the owner of `parent` may call. Overwrites any existing owner
    /// of the child node. Returns the derived child id.
    pub fn set_subnode_owner(
        &mut self,
        caller: &Address,
        parent: &Hash,
        label: &Hash,
        sub_owner: Address,
    ) -> Result<Hash, RegistryError> {
        self.require_owner(caller, parent)?;

        let child = subnode(parent, label);
        trace!("set_subnode_owner: node {} -> {}", child, sub_owner);
        match self.records.get_mut(&child) {
            Some(record) => record.owner = sub_owner,
            None => {
                self.records
                    .insert(child.clone(), NodeRecord::with_owner(sub_owner));
            }
        }
        Ok(child)
    }

    /// Record a resolver for a node. Only the current owner may call.
    pub fn set_resolver(
        &mut self,
        caller: &Address,
        node: &Hash,
        resolver: Address,
    ) -> Result<(), RegistryError> {
        self.require_owner(caller, node)?;
        if let Some(record) = self.records.get_mut(node) {
            record.resolver = resolver;
        }
        Ok(())
    }

    /// Record a TTL for a node. Only the current owner may call.
    pub fn set_ttl(&mut self, caller: &Address, node: &Hash, ttl: u64) -> Result<(), RegistryError> {
        self.require_owner(caller, node)?;
        if let Some(record) = self.records.get_mut(node) {
            record.ttl = ttl;
        }
        Ok(())
    }

    /// Number of recorded nodes
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
