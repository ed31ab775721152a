//! Response shapes returned to the host.

use serde::{Deserialize, Serialize};

use cashkit_core::amount::{Amount, Unit};
use cashkit_core::types::{Hash256, Utxo};

/// Balance rendered exactly in every unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub sat: u64,
    pub bit: String,
    pub bch: String,
}

impl From<Amount> for BalanceResponse {
    fn from(amount: Amount) -> Self {
        Self {
            sat: amount.as_sat(),
            bit: amount.to_decimal_string(Unit::Bit),
            bch: amount.to_decimal_string(Unit::Bch),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// 64-char hex txid.
    pub transaction_id: String,
    pub balance: BalanceResponse,
}

impl SendResponse {
    pub fn new(txid: Hash256, balance: Amount) -> Self {
        Self {
            transaction_id: txid.to_hex(),
            balance: balance.into(),
        }
    }
}

/// One unspent output as listed to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoView {
    /// `"<txid>:<index>"`.
    pub utxo_id: String,
    pub txid: String,
    pub index: u32,
    pub sat: u64,
    pub block_height: Option<u32>,
    pub coinbase: bool,
}

impl From<&Utxo> for UtxoView {
    fn from(u: &Utxo) -> Self {
        Self {
            utxo_id: u.outpoint.to_string(),
            txid: u.outpoint.txid.to_hex(),
            index: u.outpoint.index,
            sat: u.amount.as_sat(),
            block_height: u.block_height,
            coinbase: u.coinbase,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoResponse {
    pub utxos: Vec<UtxoView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashkit_core::types::OutPoint;

    #[test]
    fn balance_units() {
        let b = BalanceResponse::from(Amount::from_sat(12_345));
        assert_eq!(b.sat, 12_345);
        assert_eq!(b.bit, "123.45");
        assert_eq!(b.bch, "0.00012345");
        let zero = BalanceResponse::from(Amount::ZERO);
        assert_eq!((zero.sat, zero.bit.as_str(), zero.bch.as_str()), (0, "0", "0"));
    }

    #[test]
    fn utxo_id_format() {
        let u = Utxo::new(
            OutPoint::new(Hash256([0xab; 32]), 7),
            Amount::from_sat(900),
            None,
        );
        let v = UtxoView::from(&u);
        assert_eq!(v.utxo_id, format!("{}:7", "ab".repeat(32)));
        assert_eq!(v.block_height, None);
    }

    #[test]
    fn send_response_json() {
        let r = SendResponse::new(Hash256([0x01; 32]), Amount::from_sat(774));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["transaction_id"].as_str().unwrap().len(), 64);
        assert_eq!(json["balance"]["sat"], 774);
        assert_eq!(json["balance"]["bch"], "0.00000774");
    }
}
