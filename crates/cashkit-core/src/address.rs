//! CashAddr address encoding for Bitcoin Cash.
//!
//! Addresses have the form `prefix:payload` where the prefix names the
//! network:
//! - Mainnet: `bitcoincash:q...`
//! - Testnet: `bchtest:q...`
//! - Regtest: `bchreg:q...`
//!
//! The payload is a version byte (type and hash size) followed by a 20-byte
//! hash, packed into 5-bit groups and protected by a 40-bit BCH checksum
//! that commits to the prefix. Decoding accepts a payload without its
//! prefix and infers the network from whichever prefix verifies.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::CryptoProvider;
use crate::error::AddressError;
use crate::script::{p2pkh_locking_script, p2sh_locking_script};

/// CashAddr character set for encoding 5-bit values.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Number of 5-bit checksum characters.
const CHECKSUM_LEN: usize = 8;

/// Size code for a 160-bit hash in the version byte.
const HASH_SIZE_160: u8 = 0;

/// Network a wallet or address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Testnet, Network::Regtest];

    /// CashAddr prefix for this network.
    pub fn cashaddr_prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "bitcoincash",
            Network::Testnet => "bchtest",
            Network::Regtest => "bchreg",
        }
    }

    /// Look up a network from a CashAddr prefix.
    pub fn from_cashaddr_prefix(prefix: &str) -> Result<Self, AddressError> {
        match prefix {
            "bitcoincash" => Ok(Network::Mainnet),
            "bchtest" => Ok(Network::Testnet),
            "bchreg" => Ok(Network::Regtest),
            _ => Err(AddressError::UnknownPrefix(prefix.to_string())),
        }
    }

    /// WIF version byte. Testnet and regtest share one.
    pub fn wif_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet | Network::Regtest => 0xef,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        f.write_str(s)
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(AddressError::UnknownPrefix(other.to_string())),
        }
    }
}

/// What the address hash commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Pay to public key hash.
    P2pkh,
    /// Pay to script hash.
    P2sh,
}

impl AddressKind {
    fn type_bits(&self) -> u8 {
        match self {
            AddressKind::P2pkh => 0,
            AddressKind::P2sh => 1,
        }
    }

    fn from_type_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(AddressKind::P2pkh),
            1 => Some(AddressKind::P2sh),
            _ => None,
        }
    }
}

/// A CashAddr-encoded destination.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    kind: AddressKind,
    hash: [u8; 20],
}

impl Address {
    pub fn new(network: Network, kind: AddressKind, hash: [u8; 20]) -> Self {
        Self {
            network,
            kind,
            hash,
        }
    }

    /// P2PKH address for a compressed public key.
    pub fn from_public_key(
        public_key: &[u8; 33],
        network: Network,
        crypto: &dyn CryptoProvider,
    ) -> Self {
        Self::new(network, AddressKind::P2pkh, crypto.hash160(public_key))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }

    /// Output script paying to this address.
    pub fn locking_script(&self) -> Vec<u8> {
        match self.kind {
            AddressKind::P2pkh => p2pkh_locking_script(&self.hash),
            AddressKind::P2sh => p2sh_locking_script(&self.hash),
        }
    }

    /// Encode as a lowercase `prefix:payload` string.
    pub fn encode(&self) -> String {
        let prefix = self.network.cashaddr_prefix();

        let mut raw = Vec::with_capacity(21);
        raw.push((self.kind.type_bits() << 3) | HASH_SIZE_160);
        raw.extend_from_slice(&self.hash);
        let payload = convert_bits(&raw, 8, 5, true).unwrap_or_default();

        let checksum = create_checksum(prefix, &payload);

        let mut result = String::with_capacity(prefix.len() + 1 + payload.len() + CHECKSUM_LEN);
        result.push_str(prefix);
        result.push(':');
        for &d in payload.iter().chain(checksum.iter()) {
            result.push(CHARSET[d as usize] as char);
        }
        result
    }

    /// Decode a CashAddr string, with or without its prefix.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }
        let s = s.to_ascii_lowercase();

        match s.split_once(':') {
            Some((prefix, payload)) => {
                let network = Network::from_cashaddr_prefix(prefix)?;
                Self::decode_payload(network, payload)
            }
            None => {
                let mut last_err = AddressError::MissingPrefix;
                for network in Network::ALL {
                    match Self::decode_payload(network, &s) {
                        Ok(addr) => return Ok(addr),
                        Err(AddressError::InvalidChecksum) => {}
                        Err(e) => last_err = e,
                    }
                }
                Err(last_err)
            }
        }
    }

    fn decode_payload(network: Network, payload: &str) -> Result<Self, AddressError> {
        // 21 bytes pack into 34 groups of 5 bits.
        if payload.len() != 34 + CHECKSUM_LEN {
            return Err(AddressError::InvalidLength);
        }

        let mut data = Vec::with_capacity(payload.len());
        for c in payload.chars() {
            let pos = CHARSET
                .iter()
                .position(|&ch| ch as char == c)
                .ok_or(AddressError::InvalidCharacter(c))?;
            data.push(pos as u8);
        }

        if !verify_checksum(network.cashaddr_prefix(), &data) {
            return Err(AddressError::InvalidChecksum);
        }

        let raw = convert_bits(&data[..data.len() - CHECKSUM_LEN], 5, 8, false)
            .ok_or(AddressError::InvalidPadding)?;
        if raw.len() != 21 {
            return Err(AddressError::InvalidLength);
        }

        let version = raw[0];
        if version & 0x80 != 0 || version & 0x07 != HASH_SIZE_160 {
            return Err(AddressError::InvalidVersion(version));
        }
        let kind =
            AddressKind::from_type_bits(version >> 3).ok_or(AddressError::InvalidVersion(version))?;

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&raw[1..]);
        Ok(Self::new(network, kind, hash))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

// --- CashAddr internals ---

/// 40-bit BCH code polymod over 5-bit values.
fn polymod(values: &[u8]) -> u64 {
    const GEN: [u64; 5] = [
        0x98_f2bc_8e61,
        0x79_b76d_99e2,
        0xf3_3e5f_b3c4,
        0xae_2eab_e2a8,
        0x1e_4f43_e470,
    ];
    let mut chk: u64 = 1;
    for &v in values {
        let b = chk >> 35;
        chk = ((chk & 0x07_ffff_ffff) << 5) ^ u64::from(v);
        for (i, &g) in GEN.iter().enumerate() {
            if (b >> i) & 1 != 0 {
                chk ^= g;
            }
        }
    }
    chk ^ 1
}

/// Low five bits of each prefix character followed by a zero separator.
fn prefix_expand(prefix: &str) -> Vec<u8> {
    let mut ret: Vec<u8> = prefix.bytes().map(|c| c & 0x1f).collect();
    ret.push(0);
    ret
}

fn create_checksum(prefix: &str, payload: &[u8]) -> Vec<u8> {
    let mut values = prefix_expand(prefix);
    values.extend_from_slice(payload);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let m = polymod(&values);
    (0..CHECKSUM_LEN)
        .map(|i| ((m >> (5 * (CHECKSUM_LEN - 1 - i))) & 0x1f) as u8)
        .collect()
}

fn verify_checksum(prefix: &str, data: &[u8]) -> bool {
    let mut values = prefix_expand(prefix);
    values.extend_from_slice(data);
    polymod(&values) == 0
}

/// Convert between bit widths (8-bit bytes to and from 5-bit groups).
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::new();
    let maxv = (1u32 << to_bits) - 1;
    for &value in data {
        let v = u32::from(value);
        if v >> from_bits != 0 {
            return None;
        }
        acc = (acc << from_bits) | v;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            ret.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(ret)
}
