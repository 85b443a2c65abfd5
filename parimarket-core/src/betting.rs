//! # Betting Ledger
//!
//! Stake bookkeeping per (market, bettor, outcome), plus an append-only bet
//! history per bettor. Stakes are kept in flat maps keyed by composite keys
//! rather than nested per-market containers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    market::{Market, MarketId},
    utils::AccountId,
    LedgerError,
};

/// Composite key of a stake record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StakeKey {
    pub market: MarketId,
    pub bettor: AccountId,
    pub outcome: usize,
}

/// One accepted bet, as recorded in the bettor's history
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BetHistoryEntry {
    pub market_id: MarketId,
    pub outcome: usize,
    /// Amount staked (in satoshis)
    pub amount: u64,
    /// Time the bet was accepted (Unix timestamp)
    pub placed_at: u64,
}

/// Stake records and bet histories for all markets.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BettingLedger {
    /// Cumulative stake per (market, bettor, outcome), never decremented
    #[serde(with = "entries")]
    stakes: BTreeMap<StakeKey, u64>,

    /// Bets per bettor in acceptance order
    histories: BTreeMap<AccountId, Vec<BetHistoryEntry>>,
}

impl BettingLedger {
    /// Record a bet of `amount` satoshis on `outcome` of `market`.
    ///
    /// Checks, in order: the market is open at `now`, the outcome exists, the
    /// amount reaches `min_stake`. All sums are computed before the first
    /// write, so a rejected bet changes nothing.
    pub fn place_bet(
        &mut self,
        market: &mut Market,
        bettor: &AccountId,
        outcome: usize,
        amount: u64,
        min_stake: u64,
        now: u64,
    ) -> Result<()> {
        if !market.is_open(now) {
            return Err(LedgerError::MarketClosed(market.id()));
        }
        market.ensure_outcome(outcome)?;
        if amount < min_stake {
            return Err(LedgerError::StakeTooLow {
                amount,
                minimum: min_stake,
            });
        }

        let key = StakeKey {
            market: market.id(),
            bettor: bettor.clone(),
            outcome,
        };
        let stake = self
            .stakes
            .get(&key)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("stake record"))?;

        market.add_stake(outcome, amount)?;
        self.stakes.insert(key, stake);
        self.histories
            .entry(bettor.clone())
            .or_default()
            .push(BetHistoryEntry {
                market_id: market.id(),
                outcome,
                amount,
                placed_at: now,
            });
        Ok(())
    }

    /// Cumulative stake of `bettor` on `outcome` of `market` (in satoshis)
    pub fn stake_of(&self, market: MarketId, outcome: usize, bettor: &AccountId) -> u64 {
        let key = StakeKey {
            market,
            bettor: bettor.clone(),
            outcome,
        };
        self.stakes.get(&key).copied().unwrap_or(0)
    }

    /// Full bet history of `bettor`, oldest first
    pub fn history_of(&self, bettor: &AccountId) -> &[BetHistoryEntry] {
        self.histories
            .get(bettor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A window of `bettor`'s history; empty past the end.
    pub fn history_page(
        &self,
        bettor: &AccountId,
        offset: usize,
        limit: usize,
    ) -> &[BetHistoryEntry] {
        let history = self.history_of(bettor);
        let start = offset.min(history.len());
        let end = start.saturating_add(limit).min(history.len());
        &history[start..end]
    }

    /// All stake records of one market
    pub fn stakes_in(&self, market: MarketId) -> impl Iterator<Item = (&StakeKey, u64)> {
        self.stakes
            .iter()
            .filter(move |(key, _)| key.market == market)
            .map(|(key, amount)| (key, *amount))
    }

    /// Check that stake records add up to each market's outcome totals.
    pub fn check_against<'a>(&self, markets: impl Iterator<Item = &'a Market>) -> Result<()> {
        for market in markets {
            let mut totals = vec![0u64; market.outcomes().len()];
            for (key, amount) in self.stakes_in(market.id()) {
                let slot = totals.get_mut(key.outcome).ok_or_else(|| {
                    LedgerError::InvalidOutcome(format!(
                        "stake recorded on outcome {} of market {}",
                        key.outcome,
                        market.id()
                    ))
                })?;
                *slot = slot
                    .checked_add(amount)
                    .ok_or(LedgerError::ArithmeticOverflow("stake records"))?;
            }
            if totals != market.option_totals() {
                return Err(LedgerError::InvalidMarket(format!(
                    "stake records of market {} do not match its outcome totals",
                    market.id()
                )));
            }
        }
        Ok(())
    }
}

/// Serialize a map with structured keys as a list of `[key, value]` pairs,
/// since JSON object keys must be strings.
mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
    {
        let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
