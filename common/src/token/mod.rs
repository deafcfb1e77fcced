// Payable token capability
//
// The registrar consumes a fungible-balance ledger through the
// `PayableToken` trait: pull transfers (approve / transfer_from) and push
// transfers with a synchronous recipient notification. Caller identity is
// supplied explicitly; the execution substrate is responsible for
// authenticating it before the call reaches this library.

mod ledger;

pub use ledger::TokenLedger;

use thiserror::Error;

use crate::crypto::Address;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u64, have: u64 },

    #[error("Insufficient allowance: need {need}, have {have}")]
    InsufficientAllowance { need: u64, have: u64 },

    #[error("Balance overflow")]
    Overflow,

    #[error("Transfer notification rejected: {0}")]
    NotificationRejected(anyhow::Error),
}

/// Contract-side handler for push transfers.
///
/// `token_fallback` runs after the ledger has already credited the
/// receiver, inside the same transfer operation. Returning an error makes
/// the ledger revert the balance move in full, so a rejecting receiver
/// never retains funds. The handler must not call back into the ledger
/// that is notifying it.
pub trait TokenReceiver {
    /// Identity credited by the transfer
    fn receiver_address(&self) -> Address;

    fn token_fallback(
        &mut self,
        from: &Address,
        amount: u64,
        payload: &[u8],
    ) -> anyhow::Result<()>;
}

/// Fungible-balance ledger as seen by the registrar.
pub trait PayableToken {
    fn balance_of(&self, account: &Address) -> u64;

    fn allowance(&self, owner: &Address, spender: &Address) -> u64;

    /// Move `amount` from `from` to `to`. `from` is the authenticated
    /// caller of the operation.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), TokenError>;

    /// Authorize `spender` to pull up to `amount` from `owner`.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: u64)
        -> Result<(), TokenError>;

    /// Pull transfer: `spender` moves `amount` from `from` to `to` against
    /// a previously granted allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError>;

    /// Push transfer: move `amount` from `from` to the receiver's identity,
    /// then invoke its `token_fallback` with the payload. A rejected
    /// notification reverts the whole transfer.
    fn transfer_and_notify(
        &mut self,
        from: &Address,
        amount: u64,
        payload: &[u8],
        receiver: &mut dyn TokenReceiver,
    ) -> Result<(), TokenError>;
}
