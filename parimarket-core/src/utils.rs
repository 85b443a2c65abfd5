//! # Utility Functions
//!
//! Account identities, hashing and display helpers shared across the ledger.

use crate::{error::Result, LedgerError};
use bitcoin::{amount::Denomination, secp256k1::XOnlyPublicKey, Amount};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Identity of a ledger participant.
///
/// A lowercase hex-encoded 32-byte x-only public key. Signature checks happen
/// outside the ledger; the key is only validated to be a point on the curve.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Parse and validate a hex-encoded x-only public key.
    pub fn new(pubkey_hex: &str) -> Result<Self> {
        let normalized = pubkey_hex.trim().to_ascii_lowercase();
        let bytes = hex::decode(&normalized)
            .map_err(|e| LedgerError::InvalidAccount(format!("{pubkey_hex}: {e}")))?;
        if bytes.len() != 32 {
            return Err(LedgerError::InvalidAccount(format!(
                "expected 32-byte key, got {} bytes",
                bytes.len()
            )));
        }
        XOnlyPublicKey::from_slice(&bytes)
            .map_err(|e| LedgerError::InvalidAccount(format!("{pubkey_hex}: {e}")))?;
        Ok(Self(normalized))
    }

    /// Build an account id from an already parsed key.
    pub fn from_x_only(key: &XOnlyPublicKey) -> Self {
        Self(hex::encode(key.serialize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines and terminal output
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl TryFrom<String> for AccountId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<AccountId> for String {
    fn from(account: AccountId) -> Self {
        account.0
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash a message using SHA256
pub fn sha256_hash(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    let hash = hasher.finalize();
    hex::encode(hash)
}

/// Convert satoshis to Bitcoin
pub fn satoshi_to_btc(satoshi: u64) -> f64 {
    Amount::from_sat(satoshi).to_btc()
}

/// Format a satoshi amount as a BTC string without float rounding
pub fn format_btc(satoshi: u64) -> String {
    format!(
        "{} BTC",
        Amount::from_sat(satoshi).display_in(Denomination::Bitcoin)
    )
}

/// Format timestamp as human-readable string
pub fn format_timestamp(timestamp: u64) -> String {
    use chrono::DateTime;
    let dt = DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
