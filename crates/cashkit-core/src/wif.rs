//! Wallet Import Format for compressed secp256k1 private keys.
//!
//! `base58check(version || key[32] || 0x01)`. The version byte is 0x80 on
//! mainnet and 0xef on testnet and regtest, so a decoded WIF only tells
//! mainnet apart from "some test network".

use crate::address::Network;
use crate::crypto::is_valid_private_key;
use crate::error::WifError;

/// Flag appended to the key for compressed public keys.
const COMPRESSED_FLAG: u8 = 0x01;

/// Encode a private key as a compressed-key WIF string.
pub fn encode_wif(private_key: &[u8; 32], network: Network) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(network.wif_version());
    payload.extend_from_slice(private_key);
    payload.push(COMPRESSED_FLAG);
    bs58::encode(payload).with_check().into_string()
}

/// Decode a WIF string into its key bytes and version byte.
pub fn decode_wif(wif: &str) -> Result<([u8; 32], u8), WifError> {
    let payload = bs58::decode(wif.trim())
        .with_check(None)
        .into_vec()
        .map_err(|e| WifError::Base58(e.to_string()))?;

    match payload.len() {
        34 => {}
        33 => return Err(WifError::Uncompressed),
        n => return Err(WifError::InvalidLength(n)),
    }
    let version = payload[0];
    if version != 0x80 && version != 0xef {
        return Err(WifError::UnknownVersion(version));
    }
    if payload[33] != COMPRESSED_FLAG {
        return Err(WifError::Uncompressed);
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&payload[1..33]);
    if !is_valid_private_key(&key) {
        return Err(WifError::InvalidKey);
    }
    Ok((key, version))
}

/// Whether a WIF version byte is acceptable for `network`.
pub fn version_matches(version: u8, network: Network) -> bool {
    version == network.wif_version()
}
