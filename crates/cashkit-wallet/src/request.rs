//! Payment requests.
//!
//! [`SendRequest`] is always valid once constructed: a decoded address and
//! a non-zero amount. [`RawSendRequest`] is the untyped shape hosts hand in
//! (JSON and similar); [`RawSendRequest::validate`] turns it into a typed
//! request or a [`WalletError::InvalidRequest`] naming the bad entry.

use serde::{Deserialize, Serialize};

use cashkit_core::address::{Address, Network};
use cashkit_core::amount::{Amount, Unit};

use crate::error::WalletError;

/// One payment: destination and a positive amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    destination: Address,
    amount: Amount,
}

impl SendRequest {
    pub fn new(destination: Address, amount: Amount) -> Result<Self, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount("payment amount is zero".into()));
        }
        Ok(Self {
            destination,
            amount,
        })
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Fail with `NetworkMismatch` unless the destination is on `network`.
    pub fn check_network(&self, network: Network) -> Result<(), WalletError> {
        check_network(&self.destination, network)
    }
}

/// Sweep the whole spendable balance to one destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendMaxRequest {
    pub destination: Address,
}

impl SendMaxRequest {
    pub fn new(destination: Address) -> Self {
        Self { destination }
    }
}

/// Amount as it arrives from a host: a decimal string and a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAmount {
    pub value: String,
    pub unit: String,
}

/// Untyped payment request, e.g.
/// `{"cashaddr": "bchreg:q...", "amount": {"value": "3000", "unit": "sat"}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSendRequest {
    pub cashaddr: String,
    pub amount: RawAmount,
}

impl RawSendRequest {
    pub fn new(cashaddr: impl Into<String>, value: impl Into<String>, unit: Unit) -> Self {
        Self {
            cashaddr: cashaddr.into(),
            amount: RawAmount {
                value: value.into(),
                unit: unit.to_string(),
            },
        }
    }

    /// Validate entry `index` of a batch for a wallet on `network`.
    ///
    /// Network mismatches keep their own error kind; every other defect is
    /// reported as `InvalidRequest`.
    pub fn validate(&self, index: usize, network: Network) -> Result<SendRequest, WalletError> {
        let invalid = |reason: String| WalletError::InvalidRequest { index, reason };

        let destination: Address = self
            .cashaddr
            .parse()
            .map_err(|e| invalid(format!("cashaddr: {e}")))?;
        check_network(&destination, network)?;

        let unit: Unit = self
            .amount
            .unit
            .parse()
            .map_err(|e| invalid(format!("unit: {e}")))?;
        let amount = Amount::from_decimal_str(&self.amount.value, unit)
            .map_err(|e| invalid(format!("amount: {e}")))?;
        if amount.is_zero() {
            return Err(invalid("amount: must be positive".into()));
        }

        SendRequest::new(destination, amount)
    }
}

/// Validate a whole batch, stopping at the first bad entry.
pub fn validate_batch(
    raw: &[RawSendRequest],
    network: Network,
) -> Result<Vec<SendRequest>, WalletError> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| r.validate(i, network))
        .collect()
}

pub(crate) fn check_network(address: &Address, network: Network) -> Result<(), WalletError> {
    if address.network() != network {
        return Err(WalletError::NetworkMismatch {
            expected: network,
            found: address.network(),
        });
    }
    Ok(())
}
