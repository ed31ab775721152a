//! Largest-first coin selection.
//!
//! Eligible UTXOs are sorted by value descending, ties broken by outpoint
//! `(txid, index)` ascending, and the shortest prefix covering the target is
//! taken. This minimizes the input count, and with it the fee, at the price
//! of sometimes larger change. Selection depends only on the set of
//! candidates, not on the order they arrive in.

use tracing::debug;

use cashkit_core::amount::Amount;
use cashkit_core::constants::COINBASE_MATURITY;
use cashkit_core::types::Utxo;

use crate::error::WalletError;
use crate::fee::FeeEstimator;
use crate::request::SendRequest;

/// UTXOs chosen to fund a transaction, in the order they become inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingSet {
    pub utxos: Vec<Utxo>,
    /// Sum of `utxos` amounts.
    pub total: Amount,
}

impl FundingSet {
    pub fn new(utxos: Vec<Utxo>) -> Result<Self, WalletError> {
        let total = Amount::sum(utxos.iter().map(|u| u.amount))?;
        Ok(Self { utxos, total })
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoinSelector {
    coinbase_maturity: u32,
}

impl CoinSelector {
    pub fn new(coinbase_maturity: u32) -> Self {
        Self { coinbase_maturity }
    }

    /// UTXOs spendable at `best_height`, in the order given.
    pub fn eligible(&self, utxos: &[Utxo], best_height: u32) -> Vec<Utxo> {
        utxos
            .iter()
            .filter(|u| u.is_mature(best_height, self.coinbase_maturity))
            .cloned()
            .collect()
    }

    /// Select UTXOs for `target`, or all eligible ones when `target` is `None`.
    ///
    /// Fails with `NoUtxos` when nothing is eligible and with
    /// `InsufficientFunds` when the eligible total is below the target.
    pub fn select(
        &self,
        utxos: &[Utxo],
        target: Option<Amount>,
        best_height: u32,
    ) -> Result<FundingSet, WalletError> {
        let eligible = self.eligible(utxos, best_height);
        if eligible.is_empty() {
            return Err(WalletError::NoUtxos);
        }

        let Some(target) = target else {
            return FundingSet::new(eligible);
        };
        if target.is_zero() {
            return Err(WalletError::InvalidAmount("target must be non-zero".into()));
        }

        let sorted = largest_first(eligible);
        let mut selected = Vec::new();
        let mut total = Amount::ZERO;
        for utxo in &sorted {
            selected.push(utxo.clone());
            total = total.checked_add(utxo.amount)?;
            if total >= target {
                return Ok(FundingSet {
                    utxos: selected,
                    total,
                });
            }
        }

        Err(WalletError::InsufficientFunds {
            have: total.as_sat(),
            need: target.as_sat(),
        })
    }

    /// Select inputs for `requests` and settle the fee they imply.
    ///
    /// The first fee is estimated against every eligible UTXO and selection
    /// runs with `target = spend + fee`. The fee is then re-estimated for the
    /// inputs actually chosen and selection repeats until the fee stops
    /// changing. Each round can only shrink the fee and the selected prefix,
    /// so the loop settles within `eligible.len()` rounds.
    ///
    /// If even the first round is underfunded, a greedy walk that prices
    /// every prefix on its own gets a last chance, since small inputs can
    /// cost more in fee than they add.
    pub fn fund(
        &self,
        utxos: &[Utxo],
        requests: &[SendRequest],
        estimator: &FeeEstimator,
        best_height: u32,
    ) -> Result<(FundingSet, Amount), WalletError> {
        let eligible = self.eligible(utxos, best_height);
        if eligible.is_empty() {
            return Err(WalletError::NoUtxos);
        }
        let spend = Amount::sum(requests.iter().map(|r| r.amount()))?;

        let mut fee = estimator.estimate(&eligible, requests);
        debug!(
            candidates = eligible.len(),
            spend = spend.as_sat(),
            fee = fee.as_sat(),
            "first-pass fee"
        );

        let mut funding = match self.select(&eligible, Some(spend.checked_add(fee)?), best_height) {
            Ok(funding) => funding,
            Err(WalletError::InsufficientFunds { .. }) => {
                return self.fund_by_prefix(eligible, requests, spend, fee, estimator);
            }
            Err(e) => return Err(e),
        };

        for _ in 0..=eligible.len() {
            let refined = estimator.estimate(&funding.utxos, requests);
            if refined == fee {
                debug!(inputs = funding.len(), fee = fee.as_sat(), "selection settled");
                return Ok((funding, fee));
            }
            fee = refined;
            funding = self.select(&eligible, Some(spend.checked_add(fee)?), best_height)?;
        }

        let fee = estimator.estimate(&funding.utxos, requests);
        Ok((funding, fee))
    }

    fn fund_by_prefix(
        &self,
        eligible: Vec<Utxo>,
        requests: &[SendRequest],
        spend: Amount,
        full_fee: Amount,
        estimator: &FeeEstimator,
    ) -> Result<(FundingSet, Amount), WalletError> {
        let sorted = largest_first(eligible);
        let have = Amount::sum(sorted.iter().map(|u| u.amount))?;

        for n in 1..=sorted.len() {
            let prefix = &sorted[..n];
            let fee = estimator.estimate(prefix, requests);
            let total = Amount::sum(prefix.iter().map(|u| u.amount))?;
            if total >= spend.checked_add(fee)? {
                debug!(inputs = n, fee = fee.as_sat(), "funded by prefix walk");
                return Ok((
                    FundingSet {
                        utxos: prefix.to_vec(),
                        total,
                    },
                    fee,
                ));
            }
        }

        Err(WalletError::InsufficientFunds {
            have: have.as_sat(),
            need: spend.as_sat().saturating_add(full_fee.as_sat()),
        })
    }
}

impl Default for CoinSelector {
    fn default() -> Self {
        Self::new(COINBASE_MATURITY)
    }
}

fn largest_first(mut utxos: Vec<Utxo>) -> Vec<Utxo> {
    utxos.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.outpoint.cmp(&b.outpoint))
    });
    utxos
}
