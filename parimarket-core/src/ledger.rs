//! # Prediction Ledger
//!
//! The public entry points. Each operation checks every precondition before
//! its first write, so a rejected call leaves the ledger exactly as it was.
//! Mutating operations take `&mut self`; callers sharing a ledger across
//! threads must put it behind a lock.

use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    betting::{BetHistoryEntry, BettingLedger},
    claims::ClaimTracker,
    config::LedgerConfig,
    error::Result,
    events::{LedgerEvent, RecordedEvent},
    fees,
    market::{Market, MarketId, MarketRegistry, MarketStatus},
    treasury::Treasury,
    utils::AccountId,
    LedgerError,
};

/// Books of every market, stake, claim and the aggregate balance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionLedger {
    config: LedgerConfig,
    markets: MarketRegistry,
    bets: BettingLedger,
    claims: ClaimTracker,

    /// Funds held by the ledger (in satoshis)
    balance: u64,

    /// Events not yet handed to a delivery mechanism
    #[serde(default)]
    outbox: Vec<RecordedEvent>,

    /// Sequence number of the next recorded event
    #[serde(default)]
    next_sequence: u64,
}

impl PredictionLedger {
    /// Initialize an empty ledger. The owner in `config` is fixed for good.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        info!(owner = config.owner.short(), "ledger initialized");
        Ok(Self {
            config,
            markets: MarketRegistry::default(),
            bets: BettingLedger::default(),
            claims: ClaimTracker::default(),
            balance: 0,
            outbox: Vec::new(),
            next_sequence: 0,
        })
    }

    /// Restore a ledger from its JSON form, rejecting inconsistent state.
    pub fn from_json(json: &str) -> Result<Self> {
        let ledger: Self = serde_json::from_str(json)?;
        ledger.check_invariants()?;
        Ok(ledger)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check config, market and stake consistency.
    pub fn check_invariants(&self) -> Result<()> {
        self.config.validate()?;
        self.markets.check_invariants()?;
        self.bets.check_against(self.markets.iter())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn owner(&self) -> &AccountId {
        &self.config.owner
    }

    /// Funds currently held by the ledger
    pub fn balance(&self) -> Amount {
        Amount::from_sat(self.balance)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Open a new market closing `duration` seconds after `now`.
    pub fn create_market(
        &mut self,
        creator: &AccountId,
        question: &str,
        outcomes: Vec<String>,
        duration: u64,
        now: u64,
    ) -> Result<MarketId> {
        let market_id = rejected(
            "create_market",
            self.markets
                .create(creator, question, outcomes, duration, now),
        )?;
        let end_time = self.markets.get(market_id)?.end_time();
        info!(
            market = %market_id,
            creator = creator.short(),
            end_time,
            "market created"
        );
        self.record(LedgerEvent::MarketCreated {
            market_id,
            creator: creator.clone(),
            question: question.to_string(),
            end_time,
        });
        Ok(market_id)
    }

    /// Stake `amount` on `outcome` of `market_id`. The amount is the value
    /// attached to the call and joins the ledger balance.
    pub fn place_bet(
        &mut self,
        bettor: &AccountId,
        market_id: MarketId,
        outcome: usize,
        amount: Amount,
        now: u64,
    ) -> Result<()> {
        let sat = amount.to_sat();
        let result = self.markets.get_mut(market_id).and_then(|market| {
            let balance = self
                .balance
                .checked_add(sat)
                .ok_or(LedgerError::ArithmeticOverflow("ledger balance"))?;
            self.bets
                .place_bet(market, bettor, outcome, sat, self.config.min_stake, now)?;
            self.balance = balance;
            Ok(())
        });
        rejected("place_bet", result)?;

        info!(
            market = %market_id,
            bettor = bettor.short(),
            outcome,
            amount = sat,
            "bet placed"
        );
        self.record(LedgerEvent::BetPlaced {
            market_id,
            bettor: bettor.clone(),
            outcome,
            amount: sat,
        });
        Ok(())
    }

    /// Resolve `market_id` to `winning_outcome`. Creator only, at or after
    /// the end time, once.
    pub fn resolve(
        &mut self,
        caller: &AccountId,
        market_id: MarketId,
        winning_outcome: usize,
        now: u64,
    ) -> Result<()> {
        let result = self
            .markets
            .get_mut(market_id)
            .and_then(|market| market.resolve(caller, winning_outcome, now));
        rejected("resolve", result)?;

        let total_pool = self.markets.get(market_id)?.total_pool();
        info!(
            market = %market_id,
            winning_outcome,
            total_pool,
            "market resolved"
        );
        self.record(LedgerEvent::MarketResolved {
            market_id,
            winning_outcome,
            total_pool,
        });
        Ok(())
    }

    /// Pay `claimant` their winnings from `market_id` through `treasury`.
    ///
    /// Succeeds at most once per market and claimant. If the treasury
    /// refuses, nothing is recorded and the claim may be retried.
    pub fn claim<T: Treasury + ?Sized>(
        &mut self,
        claimant: &AccountId,
        market_id: MarketId,
        treasury: &mut T,
    ) -> Result<Amount> {
        let result = self.markets.get(market_id).and_then(|market| {
            self.claims.claim(
                market,
                &self.bets,
                claimant,
                self.config.platform_fee_percent,
                &mut self.balance,
                treasury,
            )
        });
        let winnings = rejected("claim", result)?;

        info!(
            market = %market_id,
            claimant = claimant.short(),
            winnings,
            "winnings claimed"
        );
        self.record(LedgerEvent::WinningsClaimed {
            market_id,
            claimant: claimant.clone(),
            winnings,
        });
        Ok(Amount::from_sat(winnings))
    }

    /// Sweep the entire ledger balance to the owner.
    pub fn withdraw_fees<T: Treasury + ?Sized>(
        &mut self,
        caller: &AccountId,
        treasury: &mut T,
    ) -> Result<Amount> {
        let result = fees::sweep(&self.config.owner, caller, &mut self.balance, treasury);
        let amount = rejected("withdraw_fees", result)?;

        info!(amount, "fees withdrawn");
        if amount > 0 {
            self.record(LedgerEvent::FeesWithdrawn {
                owner: self.config.owner.clone(),
                amount,
            });
        }
        Ok(Amount::from_sat(amount))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn market(&self, market_id: MarketId) -> Result<&Market> {
        self.markets.get(market_id)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter()
    }

    pub fn market_count(&self) -> u64 {
        self.markets.count()
    }

    pub fn market_status(&self, market_id: MarketId, now: u64) -> Result<MarketStatus> {
        Ok(self.markets.get(market_id)?.status(now))
    }

    /// Decimal odds per outcome; `None` where nothing is staked
    pub fn odds(&self, market_id: MarketId) -> Result<Vec<Option<f64>>> {
        Ok(self.markets.get(market_id)?.odds())
    }

    /// Cumulative stake of `user` on `outcome` of `market_id`
    pub fn user_stake(&self, market_id: MarketId, outcome: usize, user: &AccountId) -> Result<Amount> {
        self.markets.get(market_id)?.ensure_outcome(outcome)?;
        Ok(Amount::from_sat(self.bets.stake_of(market_id, outcome, user)))
    }

    /// Every bet `user` ever placed, oldest first
    pub fn user_history(&self, user: &AccountId) -> &[BetHistoryEntry] {
        self.bets.history_of(user)
    }

    pub fn user_history_page(
        &self,
        user: &AccountId,
        offset: usize,
        limit: usize,
    ) -> &[BetHistoryEntry] {
        self.bets.history_page(user, offset, limit)
    }

    /// What `claim` would pay right now, without claiming
    pub fn preview_claim(&self, market_id: MarketId, claimant: &AccountId) -> Result<Amount> {
        let market = self.markets.get(market_id)?;
        let winnings = self.claims.preview(
            market,
            &self.bets,
            claimant,
            self.config.platform_fee_percent,
        )?;
        Ok(Amount::from_sat(winnings))
    }

    pub fn has_claimed(&self, market_id: MarketId, claimant: &AccountId) -> bool {
        self.claims.has_claimed(market_id, claimant)
    }

    /// Events recorded since the last drain
    pub fn pending_events(&self) -> &[RecordedEvent] {
        &self.outbox
    }

    /// Hand over and clear the recorded events
    pub fn drain_events(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn record(&mut self, event: LedgerEvent) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.outbox.push(RecordedEvent { sequence, event });
    }
}

/// Log a rejected operation and pass the result through.
fn rejected<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        debug!(operation, error = %e, "operation rejected");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account, btc, constants::*, create_binary_market, create_test_ledger, RejectingTreasury};
    use crate::{AccountBook, MIN_STAKE};

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = LedgerConfig::new(account(OWNER));
        config.platform_fee_percent = 150;
        assert!(matches!(
            PredictionLedger::new(config),
            Err(LedgerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_market() {
        let mut ledger = create_test_ledger();
        let missing = MarketId(0);
        let mut book = AccountBook::default();

        assert!(matches!(
            ledger.place_bet(&account(3), missing, 0, btc(1), TEST_START),
            Err(LedgerError::InvalidMarket(_))
        ));
        assert!(matches!(
            ledger.resolve(&account(CREATOR), missing, 0, TEST_END),
            Err(LedgerError::InvalidMarket(_))
        ));
        assert!(matches!(
            ledger.claim(&account(3), missing, &mut book),
            Err(LedgerError::InvalidMarket(_))
        ));
        assert!(matches!(
            ledger.user_stake(missing, 0, &account(3)),
            Err(LedgerError::InvalidMarket(_))
        ));
        assert_eq!(ledger.balance(), Amount::ZERO);
        assert!(ledger.pending_events().is_empty());
    }

    #[test]
    fn test_bet_moves_value_into_balance() {
        let mut ledger = create_test_ledger();
        let market_id = create_binary_market(&mut ledger);
        let alice = account(3);

        ledger
            .place_bet(&alice, market_id, 1, Amount::from_sat(MIN_STAKE), TEST_START)
            .unwrap();
        assert_eq!(ledger.balance(), Amount::from_sat(MIN_STAKE));

        let rejected = ledger.place_bet(&alice, market_id, 1, Amount::from_sat(MIN_STAKE - 1), TEST_START);
        assert!(matches!(rejected, Err(LedgerError::StakeTooLow { .. })));
        assert_eq!(ledger.balance(), Amount::from_sat(MIN_STAKE));
        assert_eq!(ledger.user_stake(market_id, 1, &alice).unwrap(), Amount::from_sat(MIN_STAKE));
        assert!(matches!(
            ledger.user_stake(market_id, 2, &alice),
            Err(LedgerError::InvalidOutcome(_))
        ));
    }

    #[test]
    fn test_events_follow_successful_operations() {
        let mut ledger = create_test_ledger();
        let market_id = create_binary_market(&mut ledger);
        let alice = account(3);
        let mut book = AccountBook::default();

        ledger.place_bet(&alice, market_id, 0, btc(1), TEST_START).unwrap();
        ledger
            .place_bet(&alice, market_id, 0, btc(1), TEST_END)
            .unwrap_err();
        ledger.resolve(&account(CREATOR), market_id, 0, TEST_END).unwrap();
        ledger
            .claim(&alice, market_id, &mut RejectingTreasury::default())
            .unwrap_err();
        ledger.claim(&alice, market_id, &mut book).unwrap();
        ledger.withdraw_fees(&account(OWNER), &mut book).unwrap();

        let events = ledger.drain_events();
        let names: Vec<_> = events.iter().map(|e| e.event.name()).collect();
        assert_eq!(
            names,
            vec![
                "MarketCreated",
                "BetPlaced",
                "MarketResolved",
                "WinningsClaimed",
                "FeesWithdrawn"
            ]
        );
        let sequences: Vec<_> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(ledger.pending_events().is_empty());

        assert_eq!(
            events[3].event,
            LedgerEvent::WinningsClaimed {
                market_id,
                claimant: alice,
                winnings: 98_000_000,
            }
        );
    }

    #[test]
    fn test_preview_matches_claim() {
        let mut ledger = create_test_ledger();
        let market_id = create_binary_market(&mut ledger);
        let alice = account(3);
        let bob = account(4);
        ledger.place_bet(&alice, market_id, 0, btc(2), TEST_START).unwrap();
        ledger.place_bet(&bob, market_id, 0, btc(1), TEST_START).unwrap();
        ledger.place_bet(&account(5), market_id, 1, btc(3), TEST_START).unwrap();

        assert!(matches!(
            ledger.preview_claim(market_id, &alice),
            Err(LedgerError::NotResolved(_))
        ));
        ledger.resolve(&account(CREATOR), market_id, 0, TEST_END).unwrap();

        let preview = ledger.preview_claim(market_id, &alice).unwrap();
        let mut book = AccountBook::default();
        let paid = ledger.claim(&alice, market_id, &mut book).unwrap();
        assert_eq!(preview, paid);
        assert_eq!(paid, Amount::from_sat(392_000_000));
        assert!(ledger.has_claimed(market_id, &alice));
        assert!(!ledger.has_claimed(market_id, &bob));
    }

    #[test]
    fn test_status_and_odds() {
        let mut ledger = create_test_ledger();
        let market_id = create_binary_market(&mut ledger);
        ledger.place_bet(&account(3), market_id, 0, btc(1), TEST_START).unwrap();
        ledger.place_bet(&account(4), market_id, 1, btc(3), TEST_START).unwrap();

        assert_eq!(ledger.market_status(market_id, TEST_START).unwrap(), MarketStatus::Open);
        assert_eq!(
            ledger.market_status(market_id, TEST_END).unwrap(),
            MarketStatus::AwaitingResolution
        );
        assert_eq!(ledger.odds(market_id).unwrap()[0], Some(4.0));
    }

    #[test]
    fn test_json_round_trip_and_tamper_detection() {
        let mut ledger = create_test_ledger();
        let market_id = create_binary_market(&mut ledger);
        ledger.place_bet(&account(3), market_id, 0, btc(1), TEST_START).unwrap();

        let json = ledger.to_json().unwrap();
        let restored = PredictionLedger::from_json(&json).unwrap();
        assert_eq!(restored, ledger);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["markets"]["markets"][0]["option_totals"] = serde_json::json!([5, 0]);
        value["markets"]["markets"][0]["total_pool"] = serde_json::json!(5);
        let tampered = serde_json::to_string(&value).unwrap();
        assert!(matches!(
            PredictionLedger::from_json(&tampered),
            Err(LedgerError::InvalidMarket(_))
        ));
    }
}
