//! # Parimarket Core
//!
//! Core Rust library for parimutuel Bitcoin prediction market ledgers.
//!
//! This library keeps the books for markets where:
//! - A creator opens a question with two or more mutually exclusive outcomes
//! - Participants stake satoshis on outcomes until the market's end time
//! - The creator resolves the market to a single winning outcome
//! - Winners claim a proportional share of the pool, net of a platform fee
//!
//! ## Features
//!
//! - **Market Registry**: Create markets with a deadline and fixed outcome set
//! - **Betting Ledger**: Accumulate stakes per market, outcome and bettor
//! - **Resolution**: One-shot, creator-only resolution after the deadline
//! - **Payout Distribution**: Integer pro-rata payouts with a platform fee
//! - **Claim Tracking**: At-most-once claims with rollback on failed transfers
//! - **Fee Sweep**: Operator withdrawal of the residual balance
//!
//! ## Examples
//!
//! ```rust
//! use parimarket_core::bitcoin::Amount;
//! use parimarket_core::{AccountBook, AccountId, LedgerConfig, PredictionLedger};
//!
//! let owner = AccountId::new("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")?;
//! let creator = AccountId::new("c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5")?;
//! let alice = AccountId::new("f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9")?;
//! let mut ledger = PredictionLedger::new(LedgerConfig::new(owner))?;
//!
//! let market_id = ledger.create_market(
//!     &creator,
//!     "Will it rain tomorrow?",
//!     vec!["Yes".to_string(), "No".to_string()],
//!     3600,
//!     1_735_689_600,
//! )?;
//! ledger.place_bet(&alice, market_id, 0, Amount::from_sat(50_000_000), 1_735_689_700)?;
//! ledger.resolve(&creator, market_id, 0, 1_735_693_200)?;
//!
//! let mut book = AccountBook::default();
//! let winnings = ledger.claim(&alice, market_id, &mut book)?;
//! assert_eq!(winnings, Amount::from_sat(49_000_000));
//! Ok::<(), parimarket_core::LedgerError>(())
//! ```

pub mod betting;
pub mod claims;
pub mod config;
pub mod error;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod market;
pub mod payout;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod treasury;
pub mod utils;

pub use bitcoin;

pub use betting::{BetHistoryEntry, BettingLedger, StakeKey};
pub use claims::ClaimTracker;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use events::{LedgerEvent, RecordedEvent};
pub use ledger::PredictionLedger;
pub use market::{Market, MarketId, MarketRegistry, MarketStatus};
pub use treasury::{AccountBook, TransferError, Treasury};
pub use utils::AccountId;

/// Minimum stake accepted by `place_bet` (0.01 BTC, in satoshis)
pub const MIN_STAKE: u64 = 1_000_000;

/// Platform fee retained from every resolved pool, in percent
pub const PLATFORM_FEE_PERCENT: u8 = 2;
