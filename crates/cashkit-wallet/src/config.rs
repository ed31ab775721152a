//! Engine configuration: fee rate, dust threshold and coinbase maturity.

use serde::{Deserialize, Serialize};

use cashkit_core::amount::Amount;
use cashkit_core::constants::{COINBASE_MATURITY, DEFAULT_FEE_PER_BYTE, DUST_THRESHOLD};

use crate::error::WalletError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Fee rate in satoshis per serialized byte.
    pub fee_per_byte: u64,
    /// Change at or below this many satoshis is absorbed into the fee.
    pub dust_threshold: u64,
    /// Confirmations a coinbase output needs before it is spendable.
    pub coinbase_maturity: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            fee_per_byte: DEFAULT_FEE_PER_BYTE,
            dust_threshold: DUST_THRESHOLD,
            coinbase_maturity: COINBASE_MATURITY,
        }
    }
}

impl WalletConfig {
    /// Load configuration from `CASHKIT_*` environment variables, falling
    /// back to the defaults for unset ones.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Used by [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fee_per_byte = parse_var(&lookup, "CASHKIT_FEE_PER_BYTE", defaults.fee_per_byte)?;
        let dust_threshold =
            parse_var(&lookup, "CASHKIT_DUST_THRESHOLD", defaults.dust_threshold)?;
        let coinbase_maturity =
            parse_var(&lookup, "CASHKIT_COINBASE_MATURITY", defaults.coinbase_maturity)?;

        let config = Self {
            fee_per_byte,
            dust_threshold,
            coinbase_maturity,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.fee_per_byte == 0 {
            return Err(WalletError::Config("fee_per_byte must be positive".into()));
        }
        Ok(())
    }

    pub fn dust(&self) -> Amount {
        Amount::from_sat(self.dust_threshold)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, WalletError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WalletError::Config(format!("{key} must be a non-negative integer"))),
        None => Ok(default),
    }
}
