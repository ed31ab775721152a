//! Size-based fee estimation for compressed-key P2PKH transactions.
//!
//! `size = 8 + cs(inputs) + cs(outputs) + 148 * inputs + 34 * outputs`,
//! `fee = fee_per_byte * size`, where `cs(n)` is the CompactSize length of
//! the count (1 byte below 253, 3 bytes up to 65535). For the usual shapes
//! this is `10 + 148 * inputs + 34 * outputs`.
//! The per-input figure assumes a 72-byte signature (71-byte DER plus the
//! sighash byte), which is the largest a low-S signature can be, so a signed
//! transaction is never larger than its estimate.

use cashkit_core::amount::Amount;
use cashkit_core::constants::{P2PKH_INPUT_SIZE, P2PKH_OUTPUT_SIZE, TX_FIXED_SIZE};
use cashkit_core::types::{compact_size_len, Utxo};

use crate::config::WalletConfig;
use crate::request::SendRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeEstimator {
    fee_per_byte: u64,
    dust_threshold: u64,
}

impl FeeEstimator {
    pub fn new(fee_per_byte: u64, dust_threshold: u64) -> Self {
        Self {
            fee_per_byte,
            dust_threshold,
        }
    }

    pub fn from_config(config: &WalletConfig) -> Self {
        Self::new(config.fee_per_byte, config.dust_threshold)
    }

    /// Estimated serialized size in bytes.
    pub fn tx_size(n_inputs: usize, n_outputs: usize) -> u64 {
        let (n_in, n_out) = (n_inputs as u64, n_outputs as u64);
        TX_FIXED_SIZE
            .saturating_add(compact_size_len(n_in))
            .saturating_add(compact_size_len(n_out))
            .saturating_add(P2PKH_INPUT_SIZE.saturating_mul(n_in))
            .saturating_add(P2PKH_OUTPUT_SIZE.saturating_mul(n_out))
    }

    /// Fee for a transaction of the given shape.
    pub fn fee_for(&self, n_inputs: usize, n_outputs: usize) -> Amount {
        Amount::from_sat(
            self.fee_per_byte
                .saturating_mul(Self::tx_size(n_inputs, n_outputs)),
        )
    }

    /// Fee for spending `inputs` into `outputs`, deciding whether a change
    /// output will exist.
    ///
    /// The fee is first computed with one extra change output. If what is
    /// left over after that fee is at or below the dust threshold, the change
    /// output is dropped and the fee is recomputed without it.
    pub fn estimate(&self, inputs: &[Utxo], outputs: &[SendRequest]) -> Amount {
        let fee_with_change = self.fee_for(inputs.len(), outputs.len() + 1);

        let input_total: u128 = inputs.iter().map(|u| u128::from(u.amount.as_sat())).sum();
        let spend: u128 = outputs.iter().map(|r| u128::from(r.amount().as_sat())).sum();
        let needed = spend + u128::from(fee_with_change.as_sat());

        if input_total > needed && input_total - needed > u128::from(self.dust_threshold) {
            fee_with_change
        } else {
            self.fee_for(inputs.len(), outputs.len())
        }
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::from_config(&WalletConfig::default())
    }
}
