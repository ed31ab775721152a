//! # cashkit-wallet - single-key Bitcoin Cash wallet engine.
//!
//! Selects coins largest-first, prices transactions with a fixed size
//! model, builds and signs P2PKH transactions with the replay-protected
//! sighash, and drives the whole send pipeline against injected
//! collaborators.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`config`]: fee rate, dust threshold, coinbase maturity
//! - [`keys`]: zeroized key material and WIF import
//! - [`request`]: validated and untyped payment requests
//! - [`coin_selection`]: largest-first selection and fee settlement
//! - [`fee`]: size-based fee estimation
//! - [`builder`]: transaction assembly and signing
//! - [`response`]: balance, send and UTXO listings
//! - [`wallet`]: high-level wallet composition

pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod error;
pub mod fee;
pub mod keys;
pub mod request;
pub mod response;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{signature_hash, SignedTransaction, TransactionBuilder};
pub use coin_selection::{CoinSelector, FundingSet};
pub use config::WalletConfig;
pub use error::WalletError;
pub use fee::FeeEstimator;
pub use keys::{SecretKey, WalletKeyMaterial};
pub use request::{validate_batch, RawAmount, RawSendRequest, SendMaxRequest, SendRequest};
pub use response::{BalanceResponse, SendResponse, UtxoResponse, UtxoView};
pub use wallet::{Wallet, WalletServices};
