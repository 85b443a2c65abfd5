//! Common test utilities for parimarket-core tests.
//!
//! This module provides shared functionality for testing across all modules,
//! including deterministic account generation, ledger setup and treasuries
//! that misbehave on purpose.

use crate::{
    ledger::PredictionLedger,
    market::MarketId,
    treasury::{TransferError, Treasury},
    utils::AccountId,
    LedgerConfig,
};
use bitcoin::secp256k1::{Keypair, Secp256k1, SecretKey};
use bitcoin::Amount;

/// Generate a valid account id for testing purposes.
/// Uses deterministic key generation based on the index for reproducible tests.
/// The index must be non-zero.
pub fn account(index: u8) -> AccountId {
    let secp = Secp256k1::new();
    // Create a deterministic private key for testing
    let mut secret_bytes = [0u8; 32];
    secret_bytes[0] = index;
    secret_bytes[31] = index;
    let secret_key = SecretKey::from_slice(&secret_bytes).unwrap();
    let keypair = Keypair::from_secret_key(&secp, &secret_key);
    let (x_only, _parity) = keypair.x_only_public_key();
    AccountId::from_x_only(&x_only)
}

/// Create a ledger owned by `account(1)` with default constants.
pub fn create_test_ledger() -> PredictionLedger {
    PredictionLedger::new(LedgerConfig::new(account(constants::OWNER))).unwrap()
}

/// Open a two-outcome market ("A", "B") created by `account(2)` at
/// [`constants::TEST_START`] lasting [`constants::TEST_DURATION`] seconds.
pub fn create_binary_market(ledger: &mut PredictionLedger) -> MarketId {
    ledger
        .create_market(
            &account(constants::CREATOR),
            "Who will win the match?",
            vec!["A".to_string(), "B".to_string()],
            constants::TEST_DURATION,
            constants::TEST_START,
        )
        .unwrap()
}

/// Whole bitcoins as an [`Amount`]
pub fn btc(whole: u64) -> Amount {
    Amount::from_sat(whole * 100_000_000)
}

/// Treasury that refuses every transfer.
#[derive(Debug, Default)]
pub struct RejectingTreasury {
    /// Number of transfers attempted
    pub attempts: usize,
}

impl Treasury for RejectingTreasury {
    fn pay_out(&mut self, to: &AccountId, _amount: Amount) -> Result<(), TransferError> {
        self.attempts += 1;
        Err(TransferError::Rejected(to.to_string()))
    }
}

/// Common test constants
pub mod constants {
    /// Market creation time (Jan 1, 2025)
    pub const TEST_START: u64 = 1735689600;

    /// Market duration in seconds
    pub const TEST_DURATION: u64 = 100;

    /// End time of markets opened by `create_binary_market`
    pub const TEST_END: u64 = TEST_START + TEST_DURATION;

    /// Account index of the platform operator
    pub const OWNER: u8 = 1;

    /// Account index of the market creator
    pub const CREATOR: u8 = 2;
}
