//! # Payout Calculation
//!
//! Winners split the pool in proportion to their stake on the winning
//! outcome, after the platform fee is taken off the top:
//!
//! ```text
//! distributable = total_pool - floor(total_pool * fee_percent / 100)
//! winnings      = floor(user_stake * distributable / winning_pool)
//! ```
//!
//! Integer division truncates; the remainder stays in the ledger balance.

use crate::{error::Result, market::MarketId, LedgerError};

/// Platform fee taken from `total_pool` (in satoshis).
///
/// Percentages above 100 are capped, so the fee never exceeds the pool.
pub fn platform_fee(total_pool: u64, fee_percent: u8) -> u64 {
    let fee = u128::from(total_pool) * u128::from(fee_percent.min(100)) / 100;
    u64::try_from(fee).unwrap_or(total_pool)
}

/// Pool left for winners once the fee is withheld (in satoshis)
pub fn distributable_pool(total_pool: u64, fee_percent: u8) -> u64 {
    total_pool.saturating_sub(platform_fee(total_pool, fee_percent))
}

/// A winner's share of the distributable pool.
///
/// Only defined for a positive `winning_pool`; `user_stake` must be part of it.
/// An empty winning pool fails with [`LedgerError::EmptyWinningPool`].
pub fn calculate_winnings(
    market_id: MarketId,
    total_pool: u64,
    fee_percent: u8,
    winning_pool: u64,
    user_stake: u64,
) -> Result<u64> {
    if winning_pool == 0 {
        return Err(LedgerError::EmptyWinningPool(market_id));
    }
    let distributable = u128::from(distributable_pool(total_pool, fee_percent));
    let winnings = u128::from(user_stake) * distributable / u128::from(winning_pool);
    u64::try_from(winnings).map_err(|_| LedgerError::ArithmeticOverflow("winnings"))
}
