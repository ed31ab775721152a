//! Core protocol types: hashes, outpoints, UTXOs and wire transactions.
//!
//! Transactions use the standard Bitcoin serialization: little-endian
//! integers and CompactSize length prefixes. Hashes are stored in wire byte
//! order and displayed reversed, the way block explorers show txids.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::amount::Amount;
use crate::crypto::CryptoProvider;
use crate::error::TransactionError;

/// A 32-byte hash in wire byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the conventional reversed hex form (64 chars).
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let mut bytes = hex::decode(s).map_err(|e| TransactionError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TransactionError::InvalidHashLength(bytes.len()));
        }
        bytes.reverse();
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Reversed hex form used for display.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference to a specific output of a previous transaction.
///
/// Ordered by `(txid, index)`, which is the selection tie-break.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// An unspent output owned by the wallet's key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub amount: Amount,
    /// Height of the block that confirmed the output; `None` while in the mempool.
    pub block_height: Option<u32>,
    /// Whether the output was created by a coinbase transaction.
    #[serde(default)]
    pub coinbase: bool,
}

impl Utxo {
    pub fn new(outpoint: OutPoint, amount: Amount, block_height: Option<u32>) -> Self {
        Self {
            outpoint,
            amount,
            block_height,
            coinbase: false,
        }
    }

    /// Whether this output may be spent at `best_height`.
    ///
    /// Coinbase outputs need `maturity` confirmations; an unconfirmed
    /// coinbase output is never spendable.
    pub fn is_mature(&self, best_height: u32, maturity: u32) -> bool {
        if !self.coinbase {
            return true;
        }
        match self.block_height {
            Some(h) => best_height.saturating_sub(h) >= maturity && best_height >= h,
            None => false,
        }
    }
}

/// A transaction input spending a previous output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    /// Append the wire encoding of this output to `buf`.
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_compact_size(buf, self.script_pubkey.len() as u64);
        buf.extend_from_slice(&self.script_pubkey);
    }
}

/// A transaction in its wire shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Standard wire serialization.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10 + self.inputs.len() * 148 + self.outputs.len() * 34);
        buf.extend_from_slice(&self.version.to_le_bytes());

        write_compact_size(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.previous_output.txid.as_bytes());
            buf.extend_from_slice(&input.previous_output.index.to_le_bytes());
            write_compact_size(&mut buf, input.script_sig.len() as u64);
            buf.extend_from_slice(&input.script_sig);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_compact_size(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.encode_to(&mut buf);
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Parse a transaction from its wire serialization.
    ///
    /// The whole slice must be consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader { bytes, pos: 0 };
        let version = r.read_u32()?;

        let n_in = r.read_compact_size()?;
        let mut inputs = Vec::new();
        for _ in 0..n_in {
            let txid = Hash256(r.read_array()?);
            let index = r.read_u32()?;
            let len = r.read_compact_size()? as usize;
            let script_sig = r.read_bytes(len)?.to_vec();
            let sequence = r.read_u32()?;
            inputs.push(TxInput {
                previous_output: OutPoint { txid, index },
                script_sig,
                sequence,
            });
        }

        let n_out = r.read_compact_size()?;
        let mut outputs = Vec::new();
        for _ in 0..n_out {
            let value = r.read_u64()?;
            let len = r.read_compact_size()? as usize;
            let script_pubkey = r.read_bytes(len)?.to_vec();
            outputs.push(TxOutput {
                value,
                script_pubkey,
            });
        }

        let lock_time = r.read_u32()?;
        if r.pos != bytes.len() {
            return Err(TransactionError::TrailingBytes(bytes.len() - r.pos));
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Transaction id: double SHA-256 of the serialization.
    pub fn txid(&self, crypto: &dyn CryptoProvider) -> Hash256 {
        Hash256(crypto.double_sha256(&self.serialize()))
    }

    /// Sum of all output values. Returns an error on overflow.
    pub fn total_output_value(&self) -> Result<u64, TransactionError> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
            .ok_or(TransactionError::ValueOverflow)
    }
}

/// Encoded length of `n` as a CompactSize integer.
pub fn compact_size_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Append a CompactSize-encoded integer.
pub fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], TransactionError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(TransactionError::Truncated(self.pos))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32, TransactionError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64, TransactionError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_compact_size(&mut self) -> Result<u64, TransactionError> {
        let [first] = self.read_array::<1>()?;
        Ok(match first {
            0xfd => u64::from(u16::from_le_bytes(self.read_array()?)),
            0xfe => u64::from(self.read_u32()?),
            0xff => self.read_u64()?,
            n => u64::from(n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Provider;

    fn sample_tx() -> Transaction {
        Transaction {
            version: 2,
            inputs: vec![TxInput {
                previous_output: OutPoint::new(Hash256([0x11; 32]), 3),
                script_sig: vec![0xAA; 107],
                sequence: 0xffff_ffff,
            }],
            outputs: vec![
                TxOutput {
                    value: 4000,
                    script_pubkey: vec![0x76; 25],
                },
                TxOutput {
                    value: 774,
                    script_pubkey: vec![0x76; 25],
                },
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn hash_hex_is_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        let h = Hash256(bytes);
        let s = h.to_hex();
        assert_eq!(s.len(), 64);
        assert!(s.ends_with("01"));
        assert_eq!(Hash256::from_hex(&s).unwrap(), h);
    }

    #[test]
    fn hash_from_hex_rejects_bad_input() {
        assert!(matches!(
            Hash256::from_hex("zz"),
            Err(TransactionError::InvalidHex(_))
        ));
        assert_eq!(
            Hash256::from_hex("abcd"),
            Err(TransactionError::InvalidHashLength(2))
        );
    }

    #[test]
    fn outpoint_ordering_by_txid_then_index() {
        let a = OutPoint::new(Hash256([1; 32]), 5);
        let b = OutPoint::new(Hash256([1; 32]), 7);
        let c = OutPoint::new(Hash256([2; 32]), 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn coinbase_maturity() {
        let mut u = Utxo::new(OutPoint::new(Hash256::ZERO, 0), Amount::from_sat(1), Some(100));
        assert!(u.is_mature(100, 100));
        u.coinbase = true;
        assert!(!u.is_mature(199, 100));
        assert!(u.is_mature(200, 100));
        u.block_height = None;
        assert!(!u.is_mature(10_000, 100));
    }

    #[test]
    fn serialized_size_matches_layout() {
        let tx = sample_tx();
        // 4 + 1 + (36 + 1 + 107 + 4) + 1 + 2 * 34 + 4
        assert_eq!(tx.serialize().len(), 226);
    }

    #[test]
    fn deserialize_inverts_serialize() {
        let tx = sample_tx();
        let parsed = Transaction::deserialize(&tx.serialize()).unwrap();
        assert_eq!(parsed, tx);
    }

    #[test]
    fn deserialize_rejects_truncated_and_trailing() {
        let bytes = sample_tx().serialize();
        assert!(matches!(
            Transaction::deserialize(&bytes[..bytes.len() - 1]),
            Err(TransactionError::Truncated(_))
        ));
        let mut longer = bytes.clone();
        longer.push(0);
        assert_eq!(
            Transaction::deserialize(&longer),
            Err(TransactionError::TrailingBytes(1))
        );
    }

    #[test]
    fn compact_size_boundaries() {
        let mut buf = Vec::new();
        write_compact_size(&mut buf, 0xfc);
        assert_eq!(buf, vec![0xfc]);
        buf.clear();
        write_compact_size(&mut buf, 0xfd);
        assert_eq!(buf, vec![0xfd, 0xfd, 0x00]);
        buf.clear();
        write_compact_size(&mut buf, 0x1_0000);
        assert_eq!(buf, vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn compact_size_len_matches_encoding() {
        for n in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000] {
            let mut buf = Vec::new();
            write_compact_size(&mut buf, n);
            assert_eq!(compact_size_len(n), buf.len() as u64, "n = {n:#x}");
        }
    }

    #[test]
    fn txid_is_deterministic() {
        let crypto = Secp256k1Provider::new();
        let tx = sample_tx();
        assert_eq!(tx.txid(&crypto), tx.clone().txid(&crypto));
        let mut other = tx.clone();
        other.outputs[0].value += 1;
        assert_ne!(tx.txid(&crypto), other.txid(&crypto));
    }

    #[test]
    fn total_output_value_overflow() {
        let mut tx = sample_tx();
        assert_eq!(tx.total_output_value().unwrap(), 4774);
        tx.outputs[0].value = u64::MAX;
        assert_eq!(tx.total_output_value(), Err(TransactionError::ValueOverflow));
    }
}
