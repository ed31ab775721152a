//! The wallet's single signing key.
//!
//! Secret bytes live in a [`SecretKey`] that is zeroized on drop and never
//! shows up in `Debug` output. The only exported form is WIF.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use cashkit_core::address::{Address, Network};
use cashkit_core::crypto::{is_valid_private_key, CryptoProvider, SecureRandomSource};
use cashkit_core::error::CryptoError;
use cashkit_core::wif::{decode_wif, encode_wif, version_matches};

use crate::error::WalletError;

/// Attempts at drawing a valid scalar before giving up on a broken RNG.
const MAX_GENERATE_ATTEMPTS: usize = 8;

/// 32 bytes of secp256k1 secret scalar.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; 32],
}

impl SecretKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Raw secret bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        Self { bytes: self.bytes }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Private key, compressed public key and P2PKH address of one wallet.
#[derive(Clone)]
pub struct WalletKeyMaterial {
    secret: SecretKey,
    public_key: [u8; 33],
    address: Address,
    network: Network,
}

impl WalletKeyMaterial {
    /// Derive the public key and address for `private_key` on `network`.
    pub fn from_private_key(
        private_key: [u8; 32],
        network: Network,
        crypto: &dyn CryptoProvider,
    ) -> Result<Self, WalletError> {
        let secret = SecretKey::from_bytes(private_key);
        let public_key = crypto.derive_public_key(secret.as_bytes())?;
        let address = Address::from_public_key(&public_key, network, crypto);
        Ok(Self {
            secret,
            public_key,
            address,
            network,
        })
    }

    /// Import a compressed-key WIF. The WIF's version byte must belong to
    /// `network`; testnet and regtest share a version byte.
    pub fn from_wif(
        wif: &str,
        network: Network,
        crypto: &dyn CryptoProvider,
    ) -> Result<Self, WalletError> {
        let (key, version) = decode_wif(wif)?;
        let secret = SecretKey::from_bytes(key);
        if !version_matches(version, network) {
            let found = if version == Network::Mainnet.wif_version() {
                Network::Mainnet
            } else {
                Network::Testnet
            };
            return Err(WalletError::NetworkMismatch {
                expected: network,
                found,
            });
        }
        Self::from_private_key(*secret.as_bytes(), network, crypto)
    }

    /// Draw a fresh key from `rng`.
    pub fn generate(
        network: Network,
        crypto: &dyn CryptoProvider,
        rng: &dyn SecureRandomSource,
    ) -> Result<Self, WalletError> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let mut candidate = SecretKey::from_bytes([0u8; 32]);
            rng.fill_bytes(&mut candidate.bytes);
            if is_valid_private_key(candidate.as_bytes()) {
                return Self::from_private_key(*candidate.as_bytes(), network, crypto);
            }
        }
        Err(WalletError::Crypto(CryptoError::InvalidPrivateKey))
    }

    pub fn to_wif(&self) -> String {
        encode_wif(self.secret.as_bytes(), self.network)
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

impl fmt::Debug for WalletKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletKeyMaterial")
            .field("secret", &"[REDACTED]")
            .field("public_key", &hex::encode(self.public_key))
            .field("address", &self.address.encode())
            .field("network", &self.network)
            .finish()
    }
}
