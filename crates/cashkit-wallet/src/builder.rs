//! Transaction assembly and signing.
//!
//! The builder takes a funding set, the payment requests, the wallet key and
//! a fee that has already been settled, and produces a fully signed
//! transaction:
//! 1. Outputs: one per request in the order given, then change if any
//! 2. Change: the remainder goes back to the wallet's address when it is
//!    above the dust threshold; otherwise it is added to the fee. If the
//!    fee was priced without a change output, the change gives up the
//!    cost of its own bytes
//! 3. Signing: every input commits to the BCH replay-protected digest
//!    (`SIGHASH_ALL | SIGHASH_FORKID`)
//!
//! # Sighash preimage
//!
//! For input `i` the signed digest is double SHA-256 over
//! `version || hashPrevouts || hashSequence || outpoint_i || scriptCode ||
//! value_i || sequence_i || hashOutputs || lock_time || sighash_type`, where
//! the `hash*` fields are double SHA-256 of all outpoints, sequences and
//! outputs respectively. The script code is the P2PKH locking script of the
//! key that owns the input.

use tracing::debug;

use cashkit_core::amount::Amount;
use cashkit_core::constants::{
    DEFAULT_FEE_PER_BYTE, DUST_THRESHOLD, MAX_SIGNATURE_SIZE, SEQUENCE_FINAL, SIGHASH_ALL_FORKID,
    TX_VERSION,
};
use cashkit_core::crypto::CryptoProvider;
use cashkit_core::script::p2pkh_unlocking_script;
use cashkit_core::types::{write_compact_size, Hash256, Transaction, TxInput, TxOutput};

use crate::coin_selection::FundingSet;
use crate::error::WalletError;
use crate::fee::FeeEstimator;
use crate::keys::WalletKeyMaterial;
use crate::request::SendRequest;

/// A signed transaction ready for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The decoded transaction.
    pub tx: Transaction,
    /// Wire serialization.
    pub bytes: Vec<u8>,
    pub txid: Hash256,
    /// Effective fee, including any remainder too small for change.
    pub fee: Amount,
    /// Value of the change output, if one was created.
    pub change: Option<Amount>,
    pub input_total: Amount,
    pub output_total: Amount,
}

impl SignedTransaction {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn raw_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Builds and signs P2PKH transactions through an injected [`CryptoProvider`].
///
/// # Example
/// ```ignore
/// let signed = TransactionBuilder::new(&crypto)
///     .dust_threshold(Amount::from_sat(546))
///     .build(&funding, &requests, &key, fee, false)?;
/// ```
pub struct TransactionBuilder<'a> {
    crypto: &'a dyn CryptoProvider,
    dust_threshold: Amount,
    fee_per_byte: u64,
    lock_time: u32,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(crypto: &'a dyn CryptoProvider) -> Self {
        Self {
            crypto,
            dust_threshold: Amount::from_sat(DUST_THRESHOLD),
            fee_per_byte: DEFAULT_FEE_PER_BYTE,
            lock_time: 0,
        }
    }

    /// Override the dust threshold used for the change decision.
    pub fn dust_threshold(mut self, dust: Amount) -> Self {
        self.dust_threshold = dust;
        self
    }

    /// Fee rate a change output is priced at when the supplied fee left it
    /// out. Should match the rate the fee was estimated with.
    pub fn fee_per_byte(mut self, rate: u64) -> Self {
        self.fee_per_byte = rate;
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    /// Assemble and sign a transaction spending every UTXO in `funding`.
    ///
    /// With `discard_change` set no change output is created and the whole
    /// remainder goes to the fee; this is the sweep path.
    pub fn build(
        &self,
        funding: &FundingSet,
        requests: &[SendRequest],
        key: &WalletKeyMaterial,
        fee: Amount,
        discard_change: bool,
    ) -> Result<SignedTransaction, WalletError> {
        if requests.is_empty() {
            return Err(WalletError::BuildError("no recipients".into()));
        }
        if funding.is_empty() {
            return Err(WalletError::BuildError("no inputs".into()));
        }
        for r in requests {
            if r.amount().is_zero() {
                return Err(WalletError::InvalidAmount("recipient amount is zero".into()));
            }
            r.check_network(key.network())?;
        }

        let input_total = Amount::sum(funding.utxos.iter().map(|u| u.amount))?;
        let spend = Amount::sum(requests.iter().map(|r| r.amount()))?;
        let need = spend.checked_add(fee)?;
        if input_total < need {
            return Err(WalletError::InsufficientFunds {
                have: input_total.as_sat(),
                need: need.as_sat(),
            });
        }
        let remainder = input_total.checked_sub(need)?;

        // A change output the fee left unpriced pays for its own bytes.
        let estimator = FeeEstimator::new(self.fee_per_byte, self.dust_threshold.as_sat());
        let fee_with_change = estimator.fee_for(funding.len(), requests.len() + 1);
        let output_cost =
            fee_with_change.saturating_sub(estimator.fee_for(funding.len(), requests.len()));
        let unpaid = fee_with_change.saturating_sub(fee).min(output_cost);
        let change = if discard_change {
            None
        } else {
            remainder
                .checked_sub(unpaid)
                .ok()
                .filter(|c| *c > self.dust_threshold)
        };
        let effective_fee = input_total
            .checked_sub(spend)?
            .checked_sub(change.unwrap_or(Amount::ZERO))?;

        let inputs = funding
            .utxos
            .iter()
            .map(|u| TxInput {
                previous_output: u.outpoint,
                script_sig: Vec::new(),
                sequence: SEQUENCE_FINAL,
            })
            .collect();

        let mut outputs: Vec<TxOutput> = requests
            .iter()
            .map(|r| TxOutput {
                value: r.amount().as_sat(),
                script_pubkey: r.destination().locking_script(),
            })
            .collect();
        if let Some(change) = change {
            outputs.push(TxOutput {
                value: change.as_sat(),
                script_pubkey: key.address().locking_script(),
            });
        }

        let mut tx = Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: self.lock_time,
        };

        self.sign(&mut tx, funding, key)?;

        let output_total = Amount::from_sat(
            tx.total_output_value()
                .map_err(|e| WalletError::BuildError(e.to_string()))?,
        );
        let bytes = tx.serialize();
        let txid = tx.txid(self.crypto);

        debug!(
            %txid,
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee = effective_fee.as_sat(),
            change = change.map(|c| c.as_sat()).unwrap_or(0),
            size = bytes.len(),
            "transaction built"
        );

        Ok(SignedTransaction {
            tx,
            bytes,
            txid,
            fee: effective_fee,
            change,
            input_total,
            output_total,
        })
    }

    /// Sign every input in place. Input `i` spends `funding.utxos[i]`.
    fn sign(
        &self,
        tx: &mut Transaction,
        funding: &FundingSet,
        key: &WalletKeyMaterial,
    ) -> Result<(), WalletError> {
        let script_code = key.address().locking_script();
        let cache = SighashCache::new(tx, self.crypto);

        let mut script_sigs = Vec::with_capacity(tx.inputs.len());
        for (i, utxo) in funding.utxos.iter().enumerate() {
            let digest = cache.digest(tx, i, &script_code, utxo.amount, self.crypto);
            let mut sig = self.crypto.sign_digest(&digest, key.secret().as_bytes())?;
            if sig.len() as u64 >= MAX_SIGNATURE_SIZE {
                return Err(WalletError::BuildError(format!(
                    "signature for input {i} is {} bytes, size model allows {}",
                    sig.len(),
                    MAX_SIGNATURE_SIZE - 1
                )));
            }
            sig.push(SIGHASH_ALL_FORKID as u8);
            script_sigs.push(p2pkh_unlocking_script(&sig, key.public_key()));
        }

        for (input, script_sig) in tx.inputs.iter_mut().zip(script_sigs) {
            input.script_sig = script_sig;
        }
        Ok(())
    }
}

/// Digests shared by every input's preimage.
struct SighashCache {
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl SighashCache {
    fn new(tx: &Transaction, crypto: &dyn CryptoProvider) -> Self {
        let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
        for input in &tx.inputs {
            prevouts.extend_from_slice(input.previous_output.txid.as_bytes());
            prevouts.extend_from_slice(&input.previous_output.index.to_le_bytes());
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }
        let mut outputs = Vec::with_capacity(tx.outputs.len() * 34);
        for output in &tx.outputs {
            output.encode_to(&mut outputs);
        }
        Self {
            hash_prevouts: crypto.double_sha256(&prevouts),
            hash_sequence: crypto.double_sha256(&sequences),
            hash_outputs: crypto.double_sha256(&outputs),
        }
    }

    fn digest(
        &self,
        tx: &Transaction,
        index: usize,
        script_code: &[u8],
        value: Amount,
        crypto: &dyn CryptoProvider,
    ) -> [u8; 32] {
        let input = &tx.inputs[index];
        let mut preimage = Vec::with_capacity(156 + script_code.len());
        preimage.extend_from_slice(&tx.version.to_le_bytes());
        preimage.extend_from_slice(&self.hash_prevouts);
        preimage.extend_from_slice(&self.hash_sequence);
        preimage.extend_from_slice(input.previous_output.txid.as_bytes());
        preimage.extend_from_slice(&input.previous_output.index.to_le_bytes());
        write_compact_size(&mut preimage, script_code.len() as u64);
        preimage.extend_from_slice(script_code);
        preimage.extend_from_slice(&value.as_sat().to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
        preimage.extend_from_slice(&self.hash_outputs);
        preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
        preimage.extend_from_slice(&SIGHASH_ALL_FORKID.to_le_bytes());
        crypto.double_sha256(&preimage)
    }
}

/// Digest signed for input `index` of `tx`, which spends `value` locked by
/// `script_code`. Used to verify signatures produced by the builder.
pub fn signature_hash(
    tx: &Transaction,
    index: usize,
    script_code: &[u8],
    value: Amount,
    crypto: &dyn CryptoProvider,
) -> Result<[u8; 32], WalletError> {
    if index >= tx.inputs.len() {
        return Err(WalletError::BuildError(format!("input {index} out of range")));
    }
    Ok(SighashCache::new(tx, crypto).digest(tx, index, script_code, value, crypto))
}
