//! Outbound value transfers.
//!
//! The ledger never moves funds itself. Claims and fee sweeps hand the amount
//! to a [`Treasury`] once the bookkeeping is committed, and roll the
//! bookkeeping back if the treasury refuses.

use std::collections::BTreeMap;

use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::AccountId;

/// Reasons a treasury can refuse a payout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The recipient refused or could not receive the funds
    #[error("recipient {0} rejected the transfer")]
    Rejected(String),

    /// Crediting the recipient would overflow their balance
    #[error("credit overflow for {0}")]
    Overflow(String),

    /// The ledger holds less than the payout
    #[error("insufficient funds: requested {requested} sat, available {available} sat")]
    InsufficientFunds { requested: u64, available: u64 },
}

/// Destination for value leaving the ledger.
pub trait Treasury {
    /// Move `amount` to `to`. An error means nothing was moved.
    fn pay_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

/// In-memory credit book: records every payout against the recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBook {
    /// Satoshis credited per account
    credits: BTreeMap<AccountId, u64>,
}

impl AccountBook {
    /// Total credited to `account` so far
    pub fn credited(&self, account: &AccountId) -> Amount {
        Amount::from_sat(self.credits.get(account).copied().unwrap_or(0))
    }

    /// Sum of all credits, or `None` if it does not fit in a `u64`
    pub fn total(&self) -> Option<Amount> {
        self.credits
            .values()
            .try_fold(0u64, |acc, sat| acc.checked_add(*sat))
            .map(Amount::from_sat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.credits
            .iter()
            .map(|(account, sat)| (account, Amount::from_sat(*sat)))
    }
}

impl Treasury for AccountBook {
    fn pay_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let current = self.credits.get(to).copied().unwrap_or(0);
        let updated = current
            .checked_add(amount.to_sat())
            .ok_or_else(|| TransferError::Overflow(to.to_string()))?;
        self.credits.insert(to.clone(), updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::account;

    #[test]
    fn test_account_book_accumulates_credits() {
        let mut book = AccountBook::default();
        let alice = account(1);
        let bob = account(2);

        book.pay_out(&alice, Amount::from_sat(500)).unwrap();
        book.pay_out(&alice, Amount::from_sat(250)).unwrap();
        book.pay_out(&bob, Amount::from_sat(100)).unwrap();

        assert_eq!(book.credited(&alice), Amount::from_sat(750));
        assert_eq!(book.credited(&bob), Amount::from_sat(100));
        assert_eq!(book.credited(&account(3)), Amount::ZERO);
        assert_eq!(book.total(), Some(Amount::from_sat(850)));
        assert_eq!(book.iter().count(), 2);
    }

    #[test]
    fn test_account_book_overflow_leaves_credit_untouched() {
        let mut book = AccountBook::default();
        let alice = account(1);
        book.pay_out(&alice, Amount::from_sat(u64::MAX)).unwrap();

        let result = book.pay_out(&alice, Amount::from_sat(1));
        assert_eq!(result, Err(TransferError::Overflow(alice.to_string())));
        assert_eq!(book.credited(&alice), Amount::from_sat(u64::MAX));
    }

    #[test]
    fn test_account_book_total_overflow() {
        let mut book = AccountBook::default();
        book.pay_out(&account(1), Amount::from_sat(u64::MAX)).unwrap();
        assert_eq!(book.total(), Some(Amount::from_sat(u64::MAX)));

        book.pay_out(&account(2), Amount::from_sat(1)).unwrap();
        assert_eq!(book.total(), None);
    }

    #[test]
    fn test_account_book_serializes_with_string_keys() {
        let mut book = AccountBook::default();
        book.pay_out(&account(4), Amount::from_sat(42)).unwrap();

        let json = serde_json::to_string(&book).unwrap();
        let back: AccountBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }
}
