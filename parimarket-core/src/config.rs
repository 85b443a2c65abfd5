//! Ledger configuration.

use serde::{Deserialize, Serialize};

use crate::{error::Result, utils::AccountId, LedgerError, MIN_STAKE, PLATFORM_FEE_PERCENT};

/// Parameters fixed when a ledger is initialized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Platform operator, the only account allowed to sweep fees
    pub owner: AccountId,

    /// Minimum accepted stake (in satoshis)
    #[serde(default = "default_min_stake")]
    pub min_stake: u64,

    /// Fee retained from each pool at distribution time, in percent
    #[serde(default = "default_platform_fee")]
    pub platform_fee_percent: u8,
}

fn default_min_stake() -> u64 {
    MIN_STAKE
}

fn default_platform_fee() -> u8 {
    PLATFORM_FEE_PERCENT
}

impl LedgerConfig {
    /// Configuration with the crate's default stake minimum and fee.
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            min_stake: MIN_STAKE,
            platform_fee_percent: PLATFORM_FEE_PERCENT,
        }
    }

    /// Parse a configuration from JSON; omitted fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_stake == 0 {
            return Err(LedgerError::InvalidConfig(
                "min_stake must be positive".to_string(),
            ));
        }
        if self.platform_fee_percent > 100 {
            return Err(LedgerError::InvalidConfig(format!(
                "platform fee of {}% exceeds 100%",
                self.platform_fee_percent
            )));
        }
        Ok(())
    }
}
