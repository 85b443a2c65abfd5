//! Error types for parimarket-core

use thiserror::Error;

use crate::{market::MarketId, treasury::TransferError};

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger operations.
///
/// Every variant aborts the operation that raised it; no state is changed.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Unknown market id, or market parameters rejected at creation
    #[error("Invalid market: {0}")]
    InvalidMarket(String),

    /// Bet attempted after the end time or after resolution
    #[error("Market {0} is closed for betting")]
    MarketClosed(MarketId),

    /// Resolution attempted before the end time
    #[error("Market {market} is still active until {end_time}")]
    MarketStillActive { market: MarketId, end_time: u64 },

    /// Second resolution attempt
    #[error("Market {0} has already been resolved")]
    AlreadyResolved(MarketId),

    /// Caller lacks the authority for the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Outcome index out of bounds, or too few outcomes at creation
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),

    /// Bet below the configured minimum stake
    #[error("Stake of {amount} sat is below the minimum of {minimum} sat")]
    StakeTooLow { amount: u64, minimum: u64 },

    /// Claim attempted before resolution
    #[error("Market {0} has not been resolved yet")]
    NotResolved(MarketId),

    /// Repeat claim
    #[error("Winnings for market {0} have already been claimed")]
    AlreadyClaimed(MarketId),

    /// Claimant has nothing staked on the winning outcome
    #[error("No stake on the winning outcome of market {0}")]
    NoWinningStake(MarketId),

    /// Nobody staked on the winning outcome; the pool cannot be claimed
    #[error("Winning outcome of market {0} received no stake")]
    EmptyWinningPool(MarketId),

    /// The value transfer failed and the operation was rolled back
    #[error("Transfer failed: {0}")]
    TransferFailure(#[from] TransferError),

    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(&'static str),

    /// Malformed account identity
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    /// Ledger configuration rejected
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Serde JSON errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
