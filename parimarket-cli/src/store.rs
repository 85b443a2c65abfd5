//! JSON state file holding the ledger and the payout credit book.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parimarket_core::{AccountBook, LedgerConfig, PredictionLedger};
use serde::{Deserialize, Serialize};

/// Everything the CLI persists between invocations
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct State {
    pub ledger: PredictionLedger,

    /// Payouts credited by claims and fee sweeps
    #[serde(default)]
    pub book: AccountBook,
}

impl State {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        Ok(Self {
            ledger: PredictionLedger::new(config)?,
            book: AccountBook::default(),
        })
    }

    /// Read and validate a state file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        let state: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file {}", path.display()))?;
        state
            .ledger
            .check_invariants()
            .with_context(|| format!("State file {} is inconsistent", path.display()))?;
        Ok(state)
    }

    /// Write the state next to `path` and move it into place.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace state file {}", path.display()))?;
        Ok(())
    }
}

/// Read a ledger configuration from a JSON file
pub async fn load_config(path: &Path) -> Result<LedgerConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    LedgerConfig::from_json(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
