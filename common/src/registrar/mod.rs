// Subdomain registrar
//
// Sells the children of one delegated registry node for a fixed token
// price. The registrar is "bound" while it owns its configured root node;
// binding happens outside this component, when the node's owner transfers
// it to the registrar's identity. While bound it accepts payment through
// two entry points that must end in identical state: a pull transfer
// requested from inside `register_subdomain` (the payer approves the
// registrar first), and a push transfer whose notification carries a
// `RegistrarCall` payload. Received funds stay in custody until the admin
// withdraws them or hands the root node back.
//
// Operation ordering follows checks, effects, interactions: bound-state
// and uniqueness are validated before any value moves, and the ownership
// assignment is re-checked after the pull transfer returns, refunding the
// payer if the label was claimed in between.

mod payload;

pub use payload::{PayloadError, RegistrarCall};

use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;
use thiserror::Error;

use crate::{
    crypto::{Address, Hash},
    name::subnode,
    registry::NameRegistry,
    token::{PayableToken, TokenError, TokenReceiver},
};

pub type SharedRegistry = Arc<RwLock<NameRegistry>>;
pub type SharedToken = Arc<RwLock<dyn PayableToken + Send + Sync>>;

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("Registrar is not the owner of its root node")]
    NotBound,

    #[error("Subdomain is already registered")]
    AlreadyRegistered,

    #[error("Caller is not the registrar admin")]
    Unauthorized,

    #[error("Wrong payment amount: expected {expected}, got {got}")]
    WrongValue { expected: u64, got: u64 },

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

pub struct SubdomainRegistrar {
    registry: SharedRegistry,
    root_node: Hash,
    // price > 0 implies token is present; both constructors uphold this
    token: Option<SharedToken>,
    price: u64,
    admin: Address,
    address: Address,
    custody_balance: u64,
}

impl SubdomainRegistrar {
    /// Free-mode registrar: subdomains under `root_node` cost nothing.
    /// The deployer becomes the admin.
    pub fn new(
        registry: SharedRegistry,
        root_node: Hash,
        address: Address,
        deployer: &Address,
    ) -> Self {
        Self {
            registry,
            root_node,
            token: None,
            price: 0,
            admin: deployer.clone(),
            address,
            custody_balance: 0,
        }
    }

    /// Paid-mode registrar: each subdomain costs `price` units of the
    /// given token. A zero price behaves exactly like free mode.
    pub fn new_with_token(
        registry: SharedRegistry,
        root_node: Hash,
        token: SharedToken,
        price: u64,
        address: Address,
        deployer: &Address,
    ) -> Self {
        Self {
            registry,
            root_node,
            token: Some(token),
            price,
            admin: deployer.clone(),
            address,
            custody_balance: 0,
        }
    }

    pub fn root_node(&self) -> &Hash {
        &self.root_node
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn custody_balance(&self) -> u64 {
        self.custody_balance
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether the registrar currently owns its root node.
    pub fn is_bound(&self) -> bool {
        self.registry.read().owner(&self.root_node) == self.address
    }

    // Bound-state and uniqueness checks shared by both payment protocols.
    // Returns the child node id the sale would assign.
    fn validate_sale(&self, registry: &NameRegistry, label: &Hash) -> Result<Hash, RegistrarError> {
        if registry.owner(&self.root_node) != self.address {
            return Err(RegistrarError::NotBound);
        }

        let child = subnode(&self.root_node, label);
        if !registry.owner(&child).is_zero() {
            return Err(RegistrarError::AlreadyRegistered);
        }
        Ok(child)
    }

    /// Register the subdomain `label` for the caller, pulling payment
    /// from the caller's allowance when a price is configured.
    pub fn register_subdomain(
        &mut self,
        caller: &Address,
        label: &Hash,
    ) -> Result<Hash, RegistrarError> {
        self.register_subdomain_for(caller, label, caller)
    }

    /// Register the subdomain `label` for `payer`, pulling payment from
    /// `payer`'s allowance. Anyone may submit the call; the subdomain is
    /// always assigned to the identity that pays.
    pub fn register_subdomain_for(
        &mut self,
        caller: &Address,
        label: &Hash,
        payer: &Address,
    ) -> Result<Hash, RegistrarError> {
        trace!(
            "register_subdomain: label {} payer {} submitted by {}",
            label,
            payer,
            caller
        );

        let child = self.validate_sale(&self.registry.read(), label)?;

        let paid = match self.token.as_ref() {
            Some(token) if self.price > 0 => {
                token
                    .write()
                    .transfer_from(&self.address, payer, &self.address, self.price)?;
                true
            }
            _ => false,
        };

        // The pull transfer above is an external interaction; re-check the
        // child before committing so an interleaved claim cannot be
        // silently overwritten.
        let assigned = {
            let mut registry = self.registry.write();
            match self.validate_sale(&registry, label) {
                Ok(_) => registry
                    .set_subnode_owner(&self.address, &self.root_node, label, payer.clone())
                    .map_err(|_| RegistrarError::NotBound),
                Err(err) => Err(err),
            }
        };

        match assigned {
            Ok(child_id) => {
                debug_assert_eq!(child_id, child);
                if paid {
                    // Ledger balance overflows before custody can
                    self.custody_balance = self.custody_balance.saturating_add(self.price);
                }
                debug!("registered subdomain {} for {}", child, payer);
                Ok(child)
            }
            Err(err) => {
                if paid {
                    if let Some(token) = self.token.as_ref() {
                        token.write().transfer(&self.address, payer, self.price)?;
                    }
                }
                debug!("subdomain registration rejected: {}", err);
                Err(err)
            }
        }
    }

    // Push-payment path: balances have already moved to the registrar,
    // any error propagated here makes the ledger revert them.
    fn handle_notification(
        &mut self,
        from: &Address,
        amount: u64,
        payload: &[u8],
    ) -> Result<(), RegistrarError> {
        let call = RegistrarCall::decode(payload)?;
        match call {
            RegistrarCall::RegisterSubdomain { label } => {
                if amount != self.price {
                    return Err(RegistrarError::WrongValue {
                        expected: self.price,
                        got: amount,
                    });
                }

                let mut registry = self.registry.write();
                let child = self.validate_sale(&registry, &label)?;
                registry
                    .set_subnode_owner(&self.address, &self.root_node, &label, from.clone())
                    .map_err(|_| RegistrarError::NotBound)?;
                drop(registry);

                self.custody_balance = self.custody_balance.saturating_add(amount);
                debug!("registered subdomain {} for {} (push payment)", child, from);
                Ok(())
            }
        }
    }

    /// Withdraw the registrar's entire token balance to the admin.
    /// No-op-safe when the balance is zero or no token is configured.
    pub fn retrive_tokens(&mut self, caller: &Address) -> Result<(), RegistrarError> {
        if *caller != self.admin {
            return Err(RegistrarError::Unauthorized);
        }

        if let Some(token) = self.token.as_ref() {
            let mut token = token.write();
            let balance = token.balance_of(&self.address);
            if balance > 0 {
                token.transfer(&self.address, &self.admin, balance)?;
                debug!("withdrew {} units to admin {}", balance, self.admin);
            }
        }
        self.custody_balance = 0;
        Ok(())
    }

    /// Hand the delegated root node back, leaving the registrar unbound.
    /// Admin only; fails `NotBound` if the registrar no longer owns the
    /// node.
    pub fn transfer_registrar(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), RegistrarError> {
        if *caller != self.admin {
            return Err(RegistrarError::Unauthorized);
        }

        self.registry
            .write()
            .set_owner(&self.address, &self.root_node, new_owner.clone())
            .map_err(|_| RegistrarError::NotBound)?;
        debug!("root node {} handed back to {}", self.root_node, new_owner);
        Ok(())
    }
}

impl TokenReceiver for SubdomainRegistrar {
    fn receiver_address(&self) -> Address {
        self.address.clone()
    }

    fn token_fallback(
        &mut self,
        from: &Address,
        amount: u64,
        payload: &[u8],
    ) -> anyhow::Result<()> {
        self.handle_notification(from, amount, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ROOT_NODE, name::label_hash, token::TokenLedger};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    fn shared_registry(deployer: &Address) -> SharedRegistry {
        Arc::new(RwLock::new(NameRegistry::new(deployer.clone())))
    }

    // Registry with "rsk" assigned to `node_owner`, plus a free-mode
    // registrar for it.
    fn free_setup() -> (SharedRegistry, SubdomainRegistrar, Address) {
        let deployer = addr(1);
        let node_owner = addr(2);
        let registrar_address = addr(10);

        let registry = shared_registry(&deployer);
        let root = registry
            .write()
            .set_subnode_owner(&deployer, &ROOT_NODE, &label_hash("rsk"), node_owner.clone())
            .unwrap();

        let registrar = SubdomainRegistrar::new(
            registry.clone(),
            root,
            registrar_address,
            &node_owner,
        );
        (registry, registrar, node_owner)
    }

    fn bind(registry: &SharedRegistry, registrar: &SubdomainRegistrar, owner: &Address) {
        registry
            .write()
            .set_owner(owner, registrar.root_node(), registrar.address().clone())
            .unwrap();
    }

    #[test]
    fn test_unbound_registration_fails() {
        let (registry, mut registrar, _) = free_setup();
        let before = registry.read().len();

        let result = registrar.register_subdomain(&addr(3), &label_hash("iov"));
        assert!(matches!(result, Err(RegistrarError::NotBound)));
        assert_eq!(registry.read().len(), before);
    }

    #[test]
    fn test_free_registration() {
        let (registry, mut registrar, node_owner) = free_setup();
        bind(&registry, &registrar, &node_owner);
        assert!(registrar.is_bound());

        let buyer = addr(3);
        let child = registrar
            .register_subdomain(&buyer, &label_hash("iov"))
            .unwrap();

        assert_eq!(registry.read().owner(&child), buyer);
        assert_eq!(registrar.custody_balance(), 0);
    }

    #[test]
    fn test_label_sold_at_most_once() {
        let (registry, mut registrar, node_owner) = free_setup();
        bind(&registry, &registrar, &node_owner);

        let first = addr(3);
        let second = addr(4);
        let child = registrar
            .register_subdomain(&first, &label_hash("iov"))
            .unwrap();

        let result = registrar.register_subdomain(&second, &label_hash("iov"));
        assert!(matches!(result, Err(RegistrarError::AlreadyRegistered)));
        assert_eq!(registry.read().owner(&child), first);
    }

    #[test]
    fn test_transfer_registrar_admin_only() {
        let (registry, mut registrar, node_owner) = free_setup();
        bind(&registry, &registrar, &node_owner);

        let result = registrar.transfer_registrar(&addr(5), addr(5));
        assert!(matches!(result, Err(RegistrarError::Unauthorized)));
        assert!(registrar.is_bound());

        registrar
            .transfer_registrar(&node_owner, node_owner.clone())
            .unwrap();
        assert!(!registrar.is_bound());
        assert_eq!(
            registry.read().owner(registrar.root_node()),
            node_owner
        );

        // Unbound registrar rejects further sales
        let result = registrar.register_subdomain(&addr(3), &label_hash("iov"));
        assert!(matches!(result, Err(RegistrarError::NotBound)));
    }

    #[test]
    fn test_transfer_registrar_when_unbound() {
        let (_, mut registrar, node_owner) = free_setup();

        let result = registrar.transfer_registrar(&node_owner, node_owner.clone());
        assert!(matches!(result, Err(RegistrarError::NotBound)));
    }

    #[test]
    fn test_paid_registration_requires_allowance() {
        let deployer = addr(1);
        let node_owner = addr(2);
        let buyer = addr(3);

        let registry = shared_registry(&deployer);
        let root = registry
            .write()
            .set_subnode_owner(&deployer, &ROOT_NODE, &label_hash("rsk"), node_owner.clone())
            .unwrap();

        let mut ledger = TokenLedger::new();
        ledger.mint(&buyer, 500).unwrap();
        let token: SharedToken = Arc::new(RwLock::new(ledger));

        let mut registrar = SubdomainRegistrar::new_with_token(
            registry.clone(),
            root,
            token.clone(),
            100,
            addr(10),
            &node_owner,
        );
        bind(&registry, &registrar, &node_owner);

        // No approval yet
        let result = registrar.register_subdomain(&buyer, &label_hash("iov"));
        assert!(matches!(
            result,
            Err(RegistrarError::Token(TokenError::InsufficientAllowance { .. }))
        ));
        assert_eq!(token.read().balance_of(&buyer), 500);
        assert_eq!(registry.read().owner(&crate::name::namehash("iov.rsk")), Address::zero());

        token
            .write()
            .approve(&buyer, registrar.address(), 100)
            .unwrap();
        let child = registrar
            .register_subdomain(&buyer, &label_hash("iov"))
            .unwrap();

        assert_eq!(registry.read().owner(&child), buyer);
        assert_eq!(token.read().balance_of(&buyer), 400);
        assert_eq!(token.read().balance_of(registrar.address()), 100);
        assert_eq!(registrar.custody_balance(), 100);
    }

    #[test]
    fn test_withdrawal_admin_only() {
        let (_, mut registrar, node_owner) = free_setup();

        let result = registrar.retrive_tokens(&addr(5));
        assert!(matches!(result, Err(RegistrarError::Unauthorized)));

        // Free mode withdrawal is a no-op
        registrar.retrive_tokens(&node_owner).unwrap();
        assert_eq!(registrar.custody_balance(), 0);
    }
}
