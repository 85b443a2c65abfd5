//! # Fee Sweep
//!
//! The operator withdraws whatever the ledger still holds: fee residue,
//! rounding remainders and pools nobody can claim. The sweep is not scoped to
//! a market.

use bitcoin::Amount;
use tracing::warn;

use crate::{error::Result, treasury::Treasury, utils::AccountId, LedgerError};

/// Move the whole `balance` to `owner`.
///
/// Only `owner` may call. An empty balance succeeds without a transfer; a
/// failed transfer leaves `balance` as it was.
pub fn sweep<T: Treasury + ?Sized>(
    owner: &AccountId,
    caller: &AccountId,
    balance: &mut u64,
    treasury: &mut T,
) -> Result<u64> {
    if caller != owner {
        return Err(LedgerError::Unauthorized(
            "only the platform owner may withdraw fees".to_string(),
        ));
    }
    let amount = std::mem::take(balance);
    if amount == 0 {
        return Ok(0);
    }
    if let Err(e) = treasury.pay_out(owner, Amount::from_sat(amount)) {
        warn!(amount, error = %e, "fee sweep transfer failed, rolling back");
        *balance = amount;
        return Err(e.into());
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account, RejectingTreasury};
    use crate::AccountBook;

    #[test]
    fn test_owner_sweeps_everything() {
        let owner = account(1);
        let mut balance = 8_000_000;
        let mut book = AccountBook::default();

        let swept = sweep(&owner, &owner, &mut balance, &mut book).unwrap();
        assert_eq!(swept, 8_000_000);
        assert_eq!(balance, 0);
        assert_eq!(book.credited(&owner), Amount::from_sat(8_000_000));

        let empty = sweep(&owner, &owner, &mut balance, &mut book).unwrap();
        assert_eq!(empty, 0);
        assert_eq!(book.credited(&owner), Amount::from_sat(8_000_000));
    }

    #[test]
    fn test_non_owner_rejected() {
        let mut balance = 500;
        let mut book = AccountBook::default();
        let result = sweep(&account(1), &account(2), &mut balance, &mut book);
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));
        assert_eq!(balance, 500);
        assert_eq!(book.total(), Some(Amount::ZERO));
    }

    #[test]
    fn test_failed_transfer_restores_balance() {
        let owner = account(1);
        let mut balance = 500;
        let mut treasury = RejectingTreasury::default();
        let result = sweep(&owner, &owner, &mut balance, &mut treasury);
        assert!(matches!(result, Err(LedgerError::TransferFailure(_))));
        assert_eq!(balance, 500);
    }
}
