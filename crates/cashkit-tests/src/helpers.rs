//! Shared helpers for integration and property tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use cashkit_core::address::{Address, AddressKind, Network};
use cashkit_core::amount::Amount;
use cashkit_core::constants::SIGHASH_ALL_FORKID;
use cashkit_core::crypto::{CryptoProvider, Secp256k1Provider};
use cashkit_core::error::SourceError;
use cashkit_core::script::p2pkh_pubkey_hash;
use cashkit_core::traits::{TransactionSubmitter, UtxoSource};
use cashkit_core::types::{Hash256, OutPoint, Transaction, Utxo};
use cashkit_wallet::{signature_hash, Wallet, WalletKeyMaterial, WalletServices};

/// Private key with every byte set to `seed` (seed must be non-zero).
pub fn secret(seed: u8) -> [u8; 32] {
    [seed; 32]
}

/// Regtest key material for `secret(seed)`.
pub fn regtest_key(seed: u8) -> WalletKeyMaterial {
    WalletKeyMaterial::from_private_key(secret(seed), Network::Regtest, &Secp256k1Provider::new())
        .unwrap()
}

/// A regtest P2PKH address nobody holds the key for.
pub fn regtest_address(tag: u8) -> Address {
    Address::new(Network::Regtest, AddressKind::P2pkh, [tag; 20])
}

#[derive(Clone, Debug)]
struct Entry {
    utxo: Utxo,
    script_pubkey: Vec<u8>,
}

#[derive(Default)]
struct NodeState {
    height: u32,
    utxos: BTreeMap<OutPoint, Entry>,
    funded: u64,
    reject_next: Option<String>,
    offline: bool,
    accepted: Vec<Vec<u8>>,
}

/// In-memory node acting as both UTXO source and submitter.
///
/// Submissions are checked the way a relaying node would check them: every
/// input must exist, every signature must verify under the replay-protected
/// sighash, outputs may not exceed inputs and the fee must cover one
/// satoshi per byte. Accepted transactions spend their inputs and add their
/// outputs to the mempool (no block height).
pub struct MockNode {
    crypto: Secp256k1Provider,
    state: Mutex<NodeState>,
}

impl MockNode {
    pub fn new(height: u32) -> Arc<Self> {
        Arc::new(Self {
            crypto: Secp256k1Provider::new(),
            state: Mutex::new(NodeState {
                height,
                ..NodeState::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, address: &Address, sats: u64, height: Option<u32>, coinbase: bool) -> OutPoint {
        let mut state = self.state();
        state.funded += 1;
        let txid = Hash256(self.crypto.double_sha256(&state.funded.to_le_bytes()));
        let outpoint = OutPoint::new(txid, 0);
        let mut utxo = Utxo::new(outpoint, Amount::from_sat(sats), height);
        utxo.coinbase = coinbase;
        state.utxos.insert(
            outpoint,
            Entry {
                utxo,
                script_pubkey: address.locking_script(),
            },
        );
        outpoint
    }

    /// Credit a confirmed output to `address` at the current height.
    pub fn fund(&self, address: &Address, sats: u64) -> OutPoint {
        let height = self.height();
        self.insert(address, sats, Some(height), false)
    }

    /// Credit an unconfirmed output to `address`.
    pub fn fund_unconfirmed(&self, address: &Address, sats: u64) -> OutPoint {
        self.insert(address, sats, None, false)
    }

    /// Credit a coinbase output mined at the current height.
    pub fn fund_coinbase(&self, address: &Address, sats: u64) -> OutPoint {
        let height = self.height();
        self.insert(address, sats, Some(height), true)
    }

    pub fn height(&self) -> u32 {
        self.state().height
    }

    /// Advance the tip by `blocks`.
    pub fn mine(&self, blocks: u32) {
        let mut state = self.state();
        state.height = state.height.saturating_add(blocks);
    }

    /// Reject the next submission with `reason`.
    pub fn reject_next(&self, reason: &str) {
        self.state().reject_next = Some(reason.to_string());
    }

    /// Make every call fail as if the node were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Raw bytes of every accepted transaction, oldest first.
    pub fn accepted(&self) -> Vec<Vec<u8>> {
        self.state().accepted.clone()
    }

    /// The most recently accepted transaction, decoded.
    pub fn last_transaction(&self) -> Option<Transaction> {
        let state = self.state();
        state
            .accepted
            .last()
            .and_then(|raw| Transaction::deserialize(raw).ok())
    }

    /// Sum of every unspent output paying to `address`, mature or not.
    pub fn balance_of(&self, address: &Address) -> u64 {
        let script = address.locking_script();
        self.state()
            .utxos
            .values()
            .filter(|e| e.script_pubkey == script)
            .map(|e| e.utxo.amount.as_sat())
            .sum()
    }

    fn verify_input(
        &self,
        tx: &Transaction,
        index: usize,
        entry: &Entry,
    ) -> Result<(), SourceError> {
        let rejected = |reason: &str| SourceError::Rejected(format!("input {index}: {reason}"));

        let (sig, pubkey) = split_p2pkh_script_sig(&tx.inputs[index].script_sig)
            .ok_or_else(|| rejected("non-standard script_sig"))?;
        let (&hash_type, der) = sig.split_last().ok_or_else(|| rejected("empty signature"))?;
        if u32::from(hash_type) != SIGHASH_ALL_FORKID {
            return Err(rejected("unexpected sighash type"));
        }
        let expected = p2pkh_pubkey_hash(&entry.script_pubkey)
            .ok_or_else(|| rejected("spent output is not P2PKH"))?;
        if self.crypto.hash160(pubkey) != expected {
            return Err(rejected("public key does not match"));
        }

        let digest = signature_hash(tx, index, &entry.script_pubkey, entry.utxo.amount, &self.crypto)
            .map_err(|e| rejected(&e.to_string()))?;
        self.crypto
            .verify_digest(&digest, der, pubkey)
            .map_err(|_| rejected("signature verification failed"))
    }
}

/// `<push sig> <push pubkey>` split into its two pushes.
fn split_p2pkh_script_sig(script: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&sig_len, rest) = script.split_first()?;
    let sig_len = usize::from(sig_len);
    if sig_len == 0 || sig_len > 75 || rest.len() < sig_len {
        return None;
    }
    let (sig, rest) = rest.split_at(sig_len);
    let (&pk_len, pubkey) = rest.split_first()?;
    if usize::from(pk_len) != pubkey.len() || pubkey.len() != 33 {
        return None;
    }
    Some((sig, pubkey))
}

#[async_trait]
impl UtxoSource for MockNode {
    async fn get_utxos(&self, address: &Address) -> Result<Vec<Utxo>, SourceError> {
        let state = self.state();
        if state.offline {
            return Err(SourceError::Unavailable("node offline".into()));
        }
        let script = address.locking_script();
        Ok(state
            .utxos
            .values()
            .filter(|e| e.script_pubkey == script)
            .map(|e| e.utxo.clone())
            .collect())
    }

    async fn best_height(&self) -> Result<u32, SourceError> {
        let state = self.state();
        if state.offline {
            return Err(SourceError::Unavailable("node offline".into()));
        }
        Ok(state.height)
    }
}

#[async_trait]
impl TransactionSubmitter for MockNode {
    async fn submit(&self, raw_tx: &[u8]) -> Result<Hash256, SourceError> {
        if self.state().offline {
            return Err(SourceError::Unavailable("node offline".into()));
        }
        if let Some(reason) = self.state().reject_next.take() {
            return Err(SourceError::Rejected(reason));
        }

        let tx = Transaction::deserialize(raw_tx).map_err(|e| SourceError::Malformed(e.to_string()))?;
        if tx.inputs.is_empty() || tx.outputs.is_empty() {
            return Err(SourceError::Rejected("bad-txns-empty".into()));
        }

        let spent: Vec<Entry> = {
            let state = self.state();
            tx.inputs
                .iter()
                .map(|input| {
                    state
                        .utxos
                        .get(&input.previous_output)
                        .cloned()
                        .ok_or_else(|| SourceError::Rejected("bad-txns-inputs-missingorspent".into()))
                })
                .collect::<Result<_, _>>()?
        };
        for (index, entry) in spent.iter().enumerate() {
            self.verify_input(&tx, index, entry)?;
        }

        let input_total: u64 = spent.iter().map(|e| e.utxo.amount.as_sat()).sum();
        let output_total = tx
            .total_output_value()
            .map_err(|e| SourceError::Rejected(e.to_string()))?;
        if output_total > input_total {
            return Err(SourceError::Rejected("bad-txns-in-belowout".into()));
        }
        if input_total - output_total < raw_tx.len() as u64 {
            return Err(SourceError::Rejected("min relay fee not met".into()));
        }

        let txid = tx.txid(&self.crypto);
        let mut state = self.state();
        // Inputs may have been spent since they were looked up.
        if tx
            .inputs
            .iter()
            .any(|input| !state.utxos.contains_key(&input.previous_output))
        {
            return Err(SourceError::Rejected("txn-mempool-conflict".into()));
        }
        for input in &tx.inputs {
            state.utxos.remove(&input.previous_output);
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            let outpoint = OutPoint::new(txid, index as u32);
            state.utxos.insert(
                outpoint,
                Entry {
                    utxo: Utxo::new(outpoint, Amount::from_sat(output.value), None),
                    script_pubkey: output.script_pubkey.clone(),
                },
            );
        }
        state.accepted.push(raw_tx.to_vec());
        Ok(txid)
    }
}

/// Wallet services wired to `node` with default configuration.
pub fn services(node: &Arc<MockNode>) -> WalletServices {
    WalletServices::new(
        node.clone(),
        node.clone(),
        Arc::new(Secp256k1Provider::new()),
    )
}

/// A regtest wallet holding `secret(seed)`.
pub fn regtest_wallet(node: &Arc<MockNode>, seed: u8) -> Wallet {
    Wallet::with_key(regtest_key(seed), services(node))
}

/// A regtest wallet holding `secret(seed)`, funded with one confirmed
/// output per entry of `values`.
pub fn funded_wallet(node: &Arc<MockNode>, seed: u8, values: &[u64]) -> Wallet {
    let wallet = regtest_wallet(node, seed);
    if let Some(address) = wallet.address() {
        for &v in values {
            node.fund(address, v);
        }
    }
    wallet
}
