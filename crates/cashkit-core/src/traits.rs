//! Collaborator interfaces the wallet engine depends on.
//!
//! - [`UtxoSource`]: unspent outputs and chain height for an address
//! - [`TransactionSubmitter`]: broadcast of signed transactions
//!
//! Both are async and fallible. Implementations may sit on an Electrum
//! connection, an RPC node or an in-memory mock.

use async_trait::async_trait;

use crate::address::Address;
use crate::error::SourceError;
use crate::types::{Hash256, Utxo};

/// Read access to the UTXO set and chain tip.
#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// Current unspent outputs paying to `address`, including mempool ones.
    async fn get_utxos(&self, address: &Address) -> Result<Vec<Utxo>, SourceError>;

    /// Height of the best block.
    async fn best_height(&self) -> Result<u32, SourceError>;
}

/// Broadcast of fully signed transactions.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit serialized transaction bytes. Returns the txid the network
    /// accepted the transaction under.
    async fn submit(&self, raw_tx: &[u8]) -> Result<Hash256, SourceError>;
}
