//! Protocol constants. All monetary values in satoshis (1 BCH = 10^8 sat).

/// Satoshis per whole BCH.
pub const COIN: u64 = 100_000_000;

/// Satoshis per bit (1 bit = 100 sat = 1 µBCH).
pub const SATS_PER_BIT: u64 = 100;

/// Maximum number of satoshis that can ever exist.
pub const MAX_MONEY: u64 = 21_000_000 * COIN;

/// Outputs at or below this value are not worth creating as change.
pub const DUST_THRESHOLD: u64 = 546;

/// Blocks a coinbase output must be buried under before it can be spent.
pub const COINBASE_MATURITY: u32 = 100;

/// Default fee rate in satoshis per serialized byte.
pub const DEFAULT_FEE_PER_BYTE: u64 = 1;

/// Transaction version emitted by the builder.
pub const TX_VERSION: u32 = 2;

/// Sequence number for every input (final, no relative lock).
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// `SIGHASH_ALL`.
pub const SIGHASH_ALL: u32 = 0x01;

/// Replay-protection flag mixed into the sighash type.
pub const SIGHASH_FORKID: u32 = 0x40;

/// Sighash type committed to by every signature the builder produces.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

// --- Size model for compressed-key P2PKH ---

/// version (4) + lock time (4). The input and output counts are
/// CompactSize integers and are sized separately.
pub const TX_FIXED_SIZE: u64 = 8;

/// Worst-case DER signature plus the trailing sighash byte. Holds only for
/// low-S signatures (at most 71 DER bytes); the builder rejects longer ones.
pub const MAX_SIGNATURE_SIZE: u64 = 72;

/// Compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_SIZE: u64 = 33;

/// push(sig) + sig + push(pubkey) + pubkey.
pub const P2PKH_SCRIPT_SIG_SIZE: u64 = 1 + MAX_SIGNATURE_SIZE + 1 + COMPRESSED_PUBKEY_SIZE;

/// outpoint (36) + script length (1) + scriptSig + sequence (4).
pub const P2PKH_INPUT_SIZE: u64 = 36 + 1 + P2PKH_SCRIPT_SIG_SIZE + 4;

/// value (8) + script length (1) + locking script (25).
pub const P2PKH_OUTPUT_SIZE: u64 = 8 + 1 + 25;
