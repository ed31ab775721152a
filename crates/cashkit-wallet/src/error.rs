//! Wallet error types.

use cashkit_core::address::Network;
use cashkit_core::error::{AddressError, AmountError, CryptoError, SourceError, WifError};
use thiserror::Error;

/// Errors surfaced by wallet operations. None are retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The operation needs a private key (or address) the wallet does not hold.
    #[error("wallet has no key material")]
    NoKeyMaterial,

    /// The wallet holds no eligible unspent outputs.
    #[error("no UTXOs available")]
    NoUtxos,

    /// Eligible outputs cannot cover the target plus fee.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Eligible balance in satoshis.
        have: u64,
        /// Required amount in satoshis.
        need: u64,
    },

    /// The maximum sendable amount is zero.
    #[error("no max amount to send")]
    NothingToSend,

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// A destination or watched address belongs to another network.
    #[error("network mismatch: wallet is {expected}, address is {found}")]
    NetworkMismatch { expected: Network, found: Network },

    /// The submitter reported that the network rejected the transaction.
    #[error("transaction rejected: {0}")]
    SubmissionRejected(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// An untyped send request failed boundary validation.
    #[error("invalid request #{index}: {reason}")]
    InvalidRequest { index: usize, reason: String },

    #[error("build error: {0}")]
    BuildError(String),

    /// Collaborator I/O failure other than a rejection.
    #[error(transparent)]
    Source(SourceError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Wif(#[from] WifError),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("configuration: {0}")]
    Config(String),

    /// A wallet id string that is not `<kind>:<network>:<value>`.
    #[error("invalid wallet id: {0}")]
    InvalidWalletId(String),
}

impl From<SourceError> for WalletError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Rejected(reason) => WalletError::SubmissionRejected(reason),
            other => WalletError::Source(other),
        }
    }
}
