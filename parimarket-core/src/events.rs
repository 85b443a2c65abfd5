//! Ledger notifications.
//!
//! Successful operations append an event to the ledger's outbox; delivery is
//! left to whoever drains it. Rejected or rolled-back operations record
//! nothing.

use serde::{Deserialize, Serialize};

use crate::{error::Result, market::MarketId, utils::sha256_hash, utils::AccountId};

/// What happened
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    MarketCreated {
        market_id: MarketId,
        creator: AccountId,
        question: String,
        end_time: u64,
    },
    BetPlaced {
        market_id: MarketId,
        bettor: AccountId,
        outcome: usize,
        amount: u64,
    },
    MarketResolved {
        market_id: MarketId,
        winning_outcome: usize,
        total_pool: u64,
    },
    WinningsClaimed {
        market_id: MarketId,
        claimant: AccountId,
        winnings: u64,
    },
    FeesWithdrawn {
        owner: AccountId,
        amount: u64,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MarketCreated { .. } => "MarketCreated",
            Self::BetPlaced { .. } => "BetPlaced",
            Self::MarketResolved { .. } => "MarketResolved",
            Self::WinningsClaimed { .. } => "WinningsClaimed",
            Self::FeesWithdrawn { .. } => "FeesWithdrawn",
        }
    }
}

/// An event with its position in the ledger's history
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Position among all events ever recorded, from 0
    pub sequence: u64,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

impl RecordedEvent {
    /// Deterministic id: SHA256 of the event's JSON encoding
    pub fn id(&self) -> Result<String> {
        Ok(sha256_hash(&serde_json::to_string(self)?))
    }
}
