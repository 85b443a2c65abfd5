//! # Claim Tracking
//!
//! At most one payout per (market, claimant). The claim record is written
//! before the transfer is attempted and removed again if the transfer fails,
//! together with the balance debit.

use std::collections::BTreeSet;

use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    betting::BettingLedger,
    error::Result,
    market::{Market, MarketId},
    payout::calculate_winnings,
    treasury::{TransferError, Treasury},
    utils::AccountId,
    LedgerError,
};

/// Claim records for all markets.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimTracker {
    claimed: BTreeSet<(MarketId, AccountId)>,
}

impl ClaimTracker {
    pub fn has_claimed(&self, market: MarketId, claimant: &AccountId) -> bool {
        self.claimed.contains(&(market, claimant.clone()))
    }

    /// Winnings `claimant` would receive from `market`, without claiming.
    ///
    /// Fails the same way `claim` does: `NotResolved`, `AlreadyClaimed`,
    /// `EmptyWinningPool`, then `NoWinningStake`.
    pub fn preview(
        &self,
        market: &Market,
        stakes: &BettingLedger,
        claimant: &AccountId,
        fee_percent: u8,
    ) -> Result<u64> {
        let (winning_option, winning_pool) = match (market.winning_option(), market.winning_pool())
        {
            (Some(option), Some(pool)) if market.is_resolved() => (option, pool),
            _ => return Err(LedgerError::NotResolved(market.id())),
        };
        if self.has_claimed(market.id(), claimant) {
            return Err(LedgerError::AlreadyClaimed(market.id()));
        }
        if winning_pool == 0 {
            return Err(LedgerError::EmptyWinningPool(market.id()));
        }
        let user_stake = stakes.stake_of(market.id(), winning_option, claimant);
        if user_stake == 0 {
            return Err(LedgerError::NoWinningStake(market.id()));
        }
        calculate_winnings(
            market.id(),
            market.total_pool(),
            fee_percent,
            winning_pool,
            user_stake,
        )
    }

    /// Pay `claimant` their share of `market` out of `balance`.
    ///
    /// Order: compute the winnings, record the claim and debit the balance,
    /// then transfer. A failed transfer restores the record and the balance.
    pub fn claim<T: Treasury + ?Sized>(
        &mut self,
        market: &Market,
        stakes: &BettingLedger,
        claimant: &AccountId,
        fee_percent: u8,
        balance: &mut u64,
        treasury: &mut T,
    ) -> Result<u64> {
        let winnings = self.preview(market, stakes, claimant, fee_percent)?;
        let remaining = balance.checked_sub(winnings).ok_or(
            TransferError::InsufficientFunds {
                requested: winnings,
                available: *balance,
            },
        )?;

        let key = (market.id(), claimant.clone());
        self.claimed.insert(key.clone());
        let previous = std::mem::replace(balance, remaining);

        if let Err(e) = treasury.pay_out(claimant, Amount::from_sat(winnings)) {
            warn!(
                market = %market.id(),
                claimant = claimant.short(),
                winnings,
                error = %e,
                "claim transfer failed, rolling back"
            );
            self.claimed.remove(&key);
            *balance = previous;
            return Err(e.into());
        }
        Ok(winnings)
    }

    /// Number of claims recorded for `market`
    pub fn claims_in(&self, market: MarketId) -> usize {
        self.claimed.iter().filter(|(m, _)| *m == market).count()
    }
}
