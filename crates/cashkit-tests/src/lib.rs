//! Integration test suite for cashkit.
//!
//! Wallets run end to end against [`helpers::MockNode`], an in-memory node
//! that serves UTXOs, verifies every signature it is handed and applies
//! accepted transactions to its UTXO set.

pub mod helpers;
