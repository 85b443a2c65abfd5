//! # Market Registry and Resolution
//!
//! This module implements the market record, its Open → Resolved lifecycle and
//! the registry that allocates market ids.
//!
//! A market accepts stakes until its end time. From the end time on, only its
//! creator may resolve it, exactly once, to one of its outcomes. There is no
//! other transition: a market that is never resolved stays closed forever.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::Result, utils::AccountId, LedgerError};

/// Sequential market identifier, equal to the market's position in the registry
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct MarketId(pub u64);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle view of a market at a given time
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketStatus {
    /// Before the end time, accepting bets
    Open,
    /// Past the end time, waiting for the creator to resolve
    AwaitingResolution,
    /// Resolved; winners may claim
    Resolved,
}

/// A parimutuel market over a fixed set of mutually exclusive outcomes.
///
/// `option_totals` is parallel to `outcomes` and always sums to `total_pool`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Market {
    id: MarketId,

    /// Market question/description
    question: String,

    /// Outcome labels, at least two, fixed at creation
    outcomes: Vec<String>,

    /// Accumulated stake per outcome (in satoshis)
    option_totals: Vec<u64>,

    /// Sum of `option_totals` (in satoshis). Historical, claims do not deplete it.
    total_pool: u64,

    /// Betting deadline (Unix timestamp)
    end_time: u64,

    /// Creation time (Unix timestamp)
    created_at: u64,

    /// Whether the market has been resolved
    resolved: bool,

    /// Winning outcome index (if resolved)
    winning_option: Option<usize>,

    /// Resolution time (if resolved)
    resolved_at: Option<u64>,

    /// Creator, the only account allowed to resolve
    creator: AccountId,
}

impl Market {
    /// Creates a new open market.
    ///
    /// # Arguments
    /// * `id` - Identifier allocated by the registry
    /// * `creator` - Account that will resolve the market
    /// * `question` - The market question, must not be blank
    /// * `outcomes` - Outcome labels, at least two, none blank
    /// * `duration` - Seconds from `now` until betting closes, must be positive
    /// * `now` - Current time (Unix timestamp)
    pub fn new(
        id: MarketId,
        creator: AccountId,
        question: &str,
        outcomes: Vec<String>,
        duration: u64,
        now: u64,
    ) -> Result<Self> {
        if question.trim().is_empty() {
            return Err(LedgerError::InvalidMarket(
                "Question must not be empty".to_string(),
            ));
        }
        if outcomes.len() < 2 {
            return Err(LedgerError::InvalidOutcome(format!(
                "A market needs at least 2 outcomes, got {}",
                outcomes.len()
            )));
        }
        if let Some(blank) = outcomes.iter().position(|o| o.trim().is_empty()) {
            return Err(LedgerError::InvalidOutcome(format!(
                "Outcome {blank} has an empty label"
            )));
        }
        if duration == 0 {
            return Err(LedgerError::InvalidMarket(
                "Duration must be positive".to_string(),
            ));
        }
        let end_time = now
            .checked_add(duration)
            .ok_or(LedgerError::ArithmeticOverflow("market end time"))?;

        Ok(Self {
            id,
            question: question.to_string(),
            option_totals: vec![0; outcomes.len()],
            outcomes,
            total_pool: 0,
            end_time,
            created_at: now,
            resolved: false,
            winning_option: None,
            resolved_at: None,
            creator,
        })
    }

    pub fn id(&self) -> MarketId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn option_totals(&self) -> &[u64] {
        &self.option_totals
    }

    pub fn total_pool(&self) -> u64 {
        self.total_pool
    }

    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn winning_option(&self) -> Option<usize> {
        self.winning_option
    }

    pub fn resolved_at(&self) -> Option<u64> {
        self.resolved_at
    }

    pub fn creator(&self) -> &AccountId {
        &self.creator
    }

    /// Whether bets are accepted at `now`
    pub fn is_open(&self, now: u64) -> bool {
        !self.resolved && now < self.end_time
    }

    /// Get market status at `now`
    pub fn status(&self, now: u64) -> MarketStatus {
        if self.resolved {
            MarketStatus::Resolved
        } else if now >= self.end_time {
            MarketStatus::AwaitingResolution
        } else {
            MarketStatus::Open
        }
    }

    /// Fail with `InvalidOutcome` unless `outcome` indexes this market's outcomes.
    pub fn ensure_outcome(&self, outcome: usize) -> Result<()> {
        if outcome < self.outcomes.len() {
            Ok(())
        } else {
            Err(LedgerError::InvalidOutcome(format!(
                "Outcome {} out of range for market {} with {} outcomes",
                outcome,
                self.id,
                self.outcomes.len()
            )))
        }
    }

    /// Total staked on the winning outcome, once resolved
    pub fn winning_pool(&self) -> Option<u64> {
        self.winning_option
            .and_then(|w| self.option_totals.get(w).copied())
    }

    /// Current decimal odds per outcome (`total_pool / option_total`).
    ///
    /// `None` for outcomes nobody has backed yet.
    pub fn odds(&self) -> Vec<Option<f64>> {
        self.option_totals
            .iter()
            .map(|&total| {
                if total == 0 {
                    None
                } else {
                    Some(self.total_pool as f64 / total as f64)
                }
            })
            .collect()
    }

    /// Add `amount` to the outcome total and the pool.
    ///
    /// Both sums are computed before either is written, so an overflow leaves
    /// the market untouched.
    pub(crate) fn add_stake(&mut self, outcome: usize, amount: u64) -> Result<()> {
        self.ensure_outcome(outcome)?;
        let option_total = self.option_totals[outcome]
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("outcome total"))?;
        let total_pool = self
            .total_pool
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("total pool"))?;
        self.option_totals[outcome] = option_total;
        self.total_pool = total_pool;
        Ok(())
    }

    /// Resolve the market to `winning_outcome`.
    ///
    /// Only the creator may resolve, only once, and only at or after the end
    /// time. The resolution is final.
    pub fn resolve(&mut self, caller: &AccountId, winning_outcome: usize, now: u64) -> Result<()> {
        if caller != &self.creator {
            return Err(LedgerError::Unauthorized(format!(
                "only the creator of market {} may resolve it",
                self.id
            )));
        }
        if self.resolved {
            return Err(LedgerError::AlreadyResolved(self.id));
        }
        if now < self.end_time {
            return Err(LedgerError::MarketStillActive {
                market: self.id,
                end_time: self.end_time,
            });
        }
        self.ensure_outcome(winning_outcome)?;

        self.resolved = true;
        self.winning_option = Some(winning_outcome);
        self.resolved_at = Some(now);
        Ok(())
    }

    /// Check the structural invariants of a market loaded from storage.
    pub fn check_invariants(&self) -> Result<()> {
        if self.outcomes.len() < 2 || self.option_totals.len() != self.outcomes.len() {
            return Err(LedgerError::InvalidMarket(format!(
                "market {} has {} outcomes and {} totals",
                self.id,
                self.outcomes.len(),
                self.option_totals.len()
            )));
        }
        let sum = self
            .option_totals
            .iter()
            .try_fold(0u64, |acc, &t| acc.checked_add(t))
            .ok_or(LedgerError::ArithmeticOverflow("outcome totals"))?;
        if sum != self.total_pool {
            return Err(LedgerError::InvalidMarket(format!(
                "market {} totals sum to {} but pool is {}",
                self.id, sum, self.total_pool
            )));
        }
        match (self.resolved, self.winning_option) {
            (false, None) => Ok(()),
            (true, Some(w)) if w < self.outcomes.len() => Ok(()),
            _ => Err(LedgerError::InvalidMarket(format!(
                "market {} has an inconsistent resolution",
                self.id
            ))),
        }
    }
}

/// Append-only store of markets; ids are allocated sequentially from 0.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MarketRegistry {
    markets: Vec<Market>,
}

impl MarketRegistry {
    /// Validate and store a new market, returning its id.
    pub fn create(
        &mut self,
        creator: &AccountId,
        question: &str,
        outcomes: Vec<String>,
        duration: u64,
        now: u64,
    ) -> Result<MarketId> {
        let id = MarketId(self.markets.len() as u64);
        let market = Market::new(id, creator.clone(), question, outcomes, duration, now)?;
        self.markets.push(market);
        Ok(id)
    }

    pub fn get(&self, id: MarketId) -> Result<&Market> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.markets.get(index))
            .ok_or_else(|| Self::unknown(id))
    }

    pub(crate) fn get_mut(&mut self, id: MarketId) -> Result<&mut Market> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.markets.get_mut(index))
            .ok_or_else(|| Self::unknown(id))
    }

    /// Number of markets ever created
    pub fn count(&self) -> u64 {
        self.markets.len() as u64
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter()
    }

    /// Check every market, and that ids match positions.
    pub fn check_invariants(&self) -> Result<()> {
        for (index, market) in self.markets.iter().enumerate() {
            if market.id.0 != index as u64 {
                return Err(LedgerError::InvalidMarket(format!(
                    "market {} stored at position {}",
                    market.id, index
                )));
            }
            market.check_invariants()?;
        }
        Ok(())
    }

    fn unknown(id: MarketId) -> LedgerError {
        LedgerError::InvalidMarket(format!("no market with id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account, constants::*};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_market() -> Market {
        Market::new(
            MarketId(0),
            account(CREATOR),
            "Who will win the match?",
            labels(&["A", "B", "Draw"]),
            TEST_DURATION,
            TEST_START,
        )
        .unwrap()
    }

    #[test]
    fn test_new_market_starts_open_and_empty() {
        let market = create_test_market();
        assert_eq!(market.end_time(), TEST_END);
        assert_eq!(market.option_totals(), &[0, 0, 0]);
        assert_eq!(market.total_pool(), 0);
        assert!(!market.is_resolved());
        assert_eq!(market.winning_option(), None);
        assert_eq!(market.status(TEST_START), MarketStatus::Open);
        assert!(market.check_invariants().is_ok());
    }

    #[test]
    fn test_new_market_validation() {
        let creator = account(CREATOR);
        let empty_question = Market::new(
            MarketId(0),
            creator.clone(),
            "   ",
            labels(&["A", "B"]),
            10,
            TEST_START,
        );
        assert!(matches!(empty_question, Err(LedgerError::InvalidMarket(_))));

        let one_outcome = Market::new(
            MarketId(0),
            creator.clone(),
            "Q?",
            labels(&["A"]),
            10,
            TEST_START,
        );
        assert!(matches!(one_outcome, Err(LedgerError::InvalidOutcome(_))));

        let blank_outcome = Market::new(
            MarketId(0),
            creator.clone(),
            "Q?",
            labels(&["A", ""]),
            10,
            TEST_START,
        );
        assert!(matches!(blank_outcome, Err(LedgerError::InvalidOutcome(_))));

        let zero_duration =
            Market::new(MarketId(0), creator.clone(), "Q?", labels(&["A", "B"]), 0, TEST_START);
        assert!(matches!(zero_duration, Err(LedgerError::InvalidMarket(_))));

        let overflow = Market::new(MarketId(0), creator, "Q?", labels(&["A", "B"]), 1, u64::MAX);
        assert!(matches!(overflow, Err(LedgerError::ArithmeticOverflow(_))));
    }

    #[test]
    fn test_add_stake_keeps_pool_in_sync() {
        let mut market = create_test_market();
        market.add_stake(0, 100).unwrap();
        market.add_stake(2, 50).unwrap();
        market.add_stake(0, 25).unwrap();

        assert_eq!(market.option_totals(), &[125, 0, 50]);
        assert_eq!(market.total_pool(), 175);
        assert!(market.check_invariants().is_ok());

        assert!(matches!(
            market.add_stake(3, 1),
            Err(LedgerError::InvalidOutcome(_))
        ));
        assert!(matches!(
            market.add_stake(1, u64::MAX),
            Err(LedgerError::ArithmeticOverflow(_))
        ));
        assert_eq!(market.option_totals(), &[125, 0, 50]);
        assert_eq!(market.total_pool(), 175);
    }

    #[test]
    fn test_resolve_boundaries() {
        let creator = account(CREATOR);

        let mut early = create_test_market();
        let result = early.resolve(&creator, 0, TEST_END - 1);
        assert!(matches!(
            result,
            Err(LedgerError::MarketStillActive { end_time, .. }) if end_time == TEST_END
        ));
        assert!(!early.is_resolved());

        let mut on_time = create_test_market();
        on_time.resolve(&creator, 1, TEST_END).unwrap();
        assert!(on_time.is_resolved());
        assert_eq!(on_time.winning_option(), Some(1));
        assert_eq!(on_time.resolved_at(), Some(TEST_END));
        assert_eq!(on_time.status(TEST_END), MarketStatus::Resolved);
    }

    #[test]
    fn test_resolve_rejections_leave_market_untouched() {
        let mut market = create_test_market();
        let creator = account(CREATOR);

        assert!(matches!(
            market.resolve(&account(9), 0, TEST_END),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            market.resolve(&creator, 3, TEST_END),
            Err(LedgerError::InvalidOutcome(_))
        ));
        assert_eq!(market.winning_option(), None);

        market.resolve(&creator, 2, TEST_END).unwrap();
        assert!(matches!(
            market.resolve(&creator, 0, TEST_END + 10),
            Err(LedgerError::AlreadyResolved(MarketId(0)))
        ));
        assert_eq!(market.winning_option(), Some(2));
        assert_eq!(market.resolved_at(), Some(TEST_END));
    }

    #[test]
    fn test_status_transitions() {
        let mut market = create_test_market();
        assert!(market.is_open(TEST_END - 1));
        assert!(!market.is_open(TEST_END));
        assert_eq!(market.status(TEST_END), MarketStatus::AwaitingResolution);

        market.resolve(&account(CREATOR), 0, TEST_END + 5).unwrap();
        assert!(!market.is_open(TEST_START));
        assert_eq!(market.status(TEST_START), MarketStatus::Resolved);
    }

    #[test]
    fn test_odds() {
        let mut market = create_test_market();
        market.add_stake(0, 100).unwrap();
        market.add_stake(1, 300).unwrap();

        let odds = market.odds();
        assert_eq!(odds[0], Some(4.0));
        assert!((odds[1].unwrap() - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(odds[2], None);
    }

    #[test]
    fn test_registry_allocates_sequential_ids() {
        let mut registry = MarketRegistry::default();
        let creator = account(CREATOR);
        let first = registry
            .create(&creator, "First?", labels(&["Y", "N"]), 10, TEST_START)
            .unwrap();
        let rejected = registry.create(&creator, "", labels(&["Y", "N"]), 10, TEST_START);
        assert!(rejected.is_err());
        let second = registry
            .create(&creator, "Second?", labels(&["Y", "N"]), 10, TEST_START)
            .unwrap();

        assert_eq!(first, MarketId(0));
        assert_eq!(second, MarketId(1));
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.get(second).unwrap().question(), "Second?");
        assert!(matches!(
            registry.get(MarketId(2)),
            Err(LedgerError::InvalidMarket(_))
        ));
        assert!(registry.check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_detects_tampering() {
        let market = create_test_market();
        let mut json = serde_json::to_value(&market).unwrap();
        json["total_pool"] = serde_json::json!(5);
        let tampered: Market = serde_json::from_value(json).unwrap();
        assert!(matches!(
            tampered.check_invariants(),
            Err(LedgerError::InvalidMarket(_))
        ));

        let mut json = serde_json::to_value(&market).unwrap();
        json["winning_option"] = serde_json::json!(1);
        let tampered: Market = serde_json::from_value(json).unwrap();
        assert!(tampered.check_invariants().is_err());
    }
}
