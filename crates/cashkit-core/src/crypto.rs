//! secp256k1 signing and the hash functions used by P2PKH.
//!
//! The wallet engine never calls these primitives directly. It receives a
//! [`CryptoProvider`] and a [`SecureRandomSource`] so that tests and
//! alternative backends can substitute their own implementations.
//! [`Secp256k1Provider`] and [`OsRandom`] are the production defaults.

use rand::RngCore;
use ripemd::Ripemd160;
use secp256k1::{ecdsa, All, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CryptoError;

/// Hashing, key derivation and signing capability used by the wallet.
pub trait CryptoProvider: Send + Sync {
    /// Single SHA-256.
    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// RIPEMD-160.
    fn ripemd160(&self, data: &[u8]) -> [u8; 20];

    /// Compressed 33-byte public key for a 32-byte private key.
    fn derive_public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33], CryptoError>;

    /// DER-encoded ECDSA signature over a 32-byte digest (no sighash byte).
    ///
    /// Must be low-S and at most 71 bytes: the 148-byte input in the fee
    /// size model assumes it, and the transaction builder refuses longer
    /// signatures.
    fn sign_digest(&self, digest: &[u8; 32], private_key: &[u8; 32])
        -> Result<Vec<u8>, CryptoError>;

    /// Verify a DER signature over a digest against a compressed public key.
    fn verify_digest(
        &self,
        digest: &[u8; 32],
        signature_der: &[u8],
        public_key: &[u8],
    ) -> Result<(), CryptoError>;

    fn double_sha256(&self, data: &[u8]) -> [u8; 32] {
        self.sha256(&self.sha256(data))
    }

    /// RIPEMD-160 of SHA-256, the P2PKH public key hash.
    fn hash160(&self, data: &[u8]) -> [u8; 20] {
        self.ripemd160(&self.sha256(data))
    }
}

/// Source of secret key material.
pub trait SecureRandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating-system CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRandom;

impl SecureRandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(dest);
    }
}

/// Default [`CryptoProvider`] backed by libsecp256k1, `sha2` and `ripemd`.
///
/// Signatures are deterministic (RFC 6979) and always low-S, so a DER
/// signature never exceeds 71 bytes, the bound the fee size model is
/// built on.
pub struct Secp256k1Provider {
    secp: Secp256k1<All>,
}

impl Secp256k1Provider {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Secp256k1Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Secp256k1Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secp256k1Provider")
    }
}

impl CryptoProvider for Secp256k1Provider {
    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    fn ripemd160(&self, data: &[u8]) -> [u8; 20] {
        Ripemd160::digest(data).into()
    }

    fn derive_public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33], CryptoError> {
        let sk = SecretKey::from_slice(private_key).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(PublicKey::from_secret_key(&self.secp, &sk).serialize())
    }

    fn sign_digest(
        &self,
        digest: &[u8; 32],
        private_key: &[u8; 32],
    ) -> Result<Vec<u8>, CryptoError> {
        let sk = SecretKey::from_slice(private_key).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let msg = Message::from_digest(*digest);
        let sig = self.secp.sign_ecdsa(&msg, &sk);
        Ok(sig.serialize_der().to_vec())
    }

    fn verify_digest(
        &self,
        digest: &[u8; 32],
        signature_der: &[u8],
        public_key: &[u8],
    ) -> Result<(), CryptoError> {
        let pk = PublicKey::from_slice(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig =
            ecdsa::Signature::from_der(signature_der).map_err(|_| CryptoError::InvalidSignature)?;
        let msg = Message::from_digest(*digest);
        self.secp
            .verify_ecdsa(&msg, &sig, &pk)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

/// Whether `bytes` is a valid secp256k1 secret scalar.
pub fn is_valid_private_key(bytes: &[u8; 32]) -> bool {
    SecretKey::from_slice(bytes).is_ok()
}
