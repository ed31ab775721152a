//! Error types for cashkit core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount overflow")] Overflow,
    #[error("amount underflow")] Underflow,
    #[error("invalid decimal: {0}")] InvalidDecimal(String),
    #[error("too many fractional digits for {unit}: {value}")] TooPrecise { value: String, unit: String },
    #[error("negative amount: {0}")] Negative(String),
    #[error("unknown unit: {0}")] UnknownUnit(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("unknown prefix: {0}")] UnknownPrefix(String),
    #[error("missing prefix")] MissingPrefix,
    #[error("invalid length")] InvalidLength,
    #[error("invalid checksum")] InvalidChecksum,
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid version byte: {0:#04x}")] InvalidVersion(u8),
    #[error("invalid padding bits")] InvalidPadding,
    #[error("mixed case")] MixedCase,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WifError {
    #[error("invalid base58check: {0}")] Base58(String),
    #[error("invalid WIF length: {0}")] InvalidLength(usize),
    #[error("unknown WIF version byte: {0:#04x}")] UnknownVersion(u8),
    #[error("uncompressed keys are not supported")] Uncompressed,
    #[error("private key out of range")] InvalidKey,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid private key")] InvalidPrivateKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
}

/// Failure reported by an external collaborator (UTXO source or submitter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("unavailable: {0}")] Unavailable(String),
    #[error("malformed response: {0}")] Malformed(String),
    #[error("transaction rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("truncated input at byte {0}")] Truncated(usize),
    #[error("trailing bytes after transaction: {0}")] TrailingBytes(usize),
    #[error("value overflow")] ValueOverflow,
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid hash length: {0}")] InvalidHashLength(usize),
}
