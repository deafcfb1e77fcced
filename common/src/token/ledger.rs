// In-memory token ledger
//
// Reference implementation of `PayableToken` backing the registrar tests
// and any single-process deployment. Balances and allowances live in
// deterministic-order maps; every mutation either applies in full or
// leaves the ledger untouched.

use indexmap::IndexMap;
use log::{debug, trace};

use crate::crypto::Address;

use super::{PayableToken, TokenError, TokenReceiver};

#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    balances: IndexMap<Address, u64>,
    // (owner, spender) -> remaining allowance
    allowances: IndexMap<(Address, Address), u64>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit freshly issued units to an account. Genesis/test funding
    /// path; the sale logic itself never mints.
    pub fn mint(&mut self, to: &Address, amount: u64) -> Result<(), TokenError> {
        let balance = self.balance_of(to);
        let credited = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        self.balances.insert(to.clone(), credited);
        Ok(())
    }

    pub fn total_accounts(&self) -> usize {
        self.balances.len()
    }

    fn move_balance(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                need: amount,
                have: from_balance,
            });
        }

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert(from.clone(), from_balance - amount);
        self.balances.insert(to.clone(), credited);
        trace!("moved {} units: {} -> {}", amount, from, to);
        Ok(())
    }
}

impl PayableToken for TokenLedger {
    fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }

    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        self.allowances
            .insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                need: amount,
                have: allowed,
            });
        }

        self.move_balance(from, to, amount)?;
        self.allowances
            .insert((from.clone(), spender.clone()), allowed - amount);
        Ok(())
    }

    fn transfer_and_notify(
        &mut self,
        from: &Address,
        amount: u64,
        payload: &[u8],
        receiver: &mut dyn TokenReceiver,
    ) -> Result<(), TokenError> {
        let to = receiver.receiver_address();
        self.move_balance(from, &to, amount)?;

        if let Err(cause) = receiver.token_fallback(from, amount, payload) {
            debug!("notification rejected by {}, reverting transfer: {}", to, cause);
            // The receiver was credited just above and may not spend from
            // inside its fallback, so the reverse move cannot fail.
            self.move_balance(&to, from, amount)?;
            return Err(TokenError::NotificationRejected(cause));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    struct Acceptor {
        address: Address,
        seen: Vec<(Address, u64, Vec<u8>)>,
    }

    impl TokenReceiver for Acceptor {
        fn receiver_address(&self) -> Address {
            self.address.clone()
        }

        fn token_fallback(
            &mut self,
            from: &Address,
            amount: u64,
            payload: &[u8],
        ) -> anyhow::Result<()> {
            self.seen.push((from.clone(), amount, payload.to_vec()));
            Ok(())
        }
    }

    struct Rejector {
        address: Address,
    }

    impl TokenReceiver for Rejector {
        fn receiver_address(&self) -> Address {
            self.address.clone()
        }

        fn token_fallback(&mut self, _: &Address, _: u64, _: &[u8]) -> anyhow::Result<()> {
            bail!("not today");
        }
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 100).unwrap();

        ledger.transfer(&addr(1), &addr(2), 40).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 60);
        assert_eq!(ledger.balance_of(&addr(2)), 40);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 10).unwrap();

        let result = ledger.transfer(&addr(1), &addr(2), 11);
        assert!(matches!(
            result,
            Err(TokenError::InsufficientBalance { need: 11, have: 10 })
        ));
        assert_eq!(ledger.balance_of(&addr(1)), 10);
        assert_eq!(ledger.balance_of(&addr(2)), 0);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 10).unwrap();

        ledger.transfer(&addr(1), &addr(1), 5).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 10);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 100).unwrap();
        ledger.approve(&addr(1), &addr(9), 60).unwrap();

        ledger
            .transfer_from(&addr(9), &addr(1), &addr(2), 25)
            .unwrap();
        assert_eq!(ledger.balance_of(&addr(2)), 25);
        assert_eq!(ledger.allowance(&addr(1), &addr(9)), 35);
    }

    #[test]
    fn test_transfer_from_without_allowance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 100).unwrap();

        let result = ledger.transfer_from(&addr(9), &addr(1), &addr(2), 1);
        assert!(matches!(
            result,
            Err(TokenError::InsufficientAllowance { need: 1, have: 0 })
        ));
        assert_eq!(ledger.balance_of(&addr(1)), 100);
    }

    #[test]
    fn test_transfer_from_failure_keeps_allowance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 10).unwrap();
        ledger.approve(&addr(1), &addr(9), 50).unwrap();

        let result = ledger.transfer_from(&addr(9), &addr(1), &addr(2), 20);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(ledger.allowance(&addr(1), &addr(9)), 50);
    }

    #[test]
    fn test_notify_delivers_payload_after_credit() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 100).unwrap();
        let mut receiver = Acceptor {
            address: addr(7),
            seen: Vec::new(),
        };

        ledger
            .transfer_and_notify(&addr(1), 30, b"payload", &mut receiver)
            .unwrap();

        assert_eq!(ledger.balance_of(&addr(7)), 30);
        assert_eq!(receiver.seen, vec![(addr(1), 30, b"payload".to_vec())]);
    }

    #[test]
    fn test_rejected_notification_reverts_transfer() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), 100).unwrap();
        let mut receiver = Rejector { address: addr(7) };

        let result = ledger.transfer_and_notify(&addr(1), 30, b"payload", &mut receiver);
        assert!(matches!(result, Err(TokenError::NotificationRejected(_))));
        assert_eq!(ledger.balance_of(&addr(1)), 100);
        assert_eq!(ledger.balance_of(&addr(7)), 0);
    }

    #[test]
    fn test_mint_overflow() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&addr(1), u64::MAX).unwrap();
        assert!(matches!(
            ledger.mint(&addr(1), 1),
            Err(TokenError::Overflow)
        ));
    }
}
