//! # cashkit-core
//! Amounts, addresses, keys and wire transactions for Bitcoin Cash, plus
//! the capability traits the wallet engine is written against.

pub mod address;
pub mod amount;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod script;
pub mod traits;
pub mod types;
pub mod wif;
