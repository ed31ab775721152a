//! Exact monetary amounts and display units.
//!
//! An [`Amount`] is always an integer number of satoshis. Display units are
//! converted with integer arithmetic only: decimal strings are parsed digit
//! by digit and formatted back the same way, so `0.1 BCH` is exactly
//! `10_000_000` sat with no binary floating point in between.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{COIN, SATS_PER_BIT};
use crate::error::AmountError;

/// Denomination an amount is expressed in at the API boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Satoshi, the indivisible base unit.
    Sat,
    /// 100 satoshis.
    Bit,
    /// 10^8 satoshis.
    Bch,
}

impl Unit {
    /// Satoshis in one whole unit.
    pub fn sats_per_unit(&self) -> u64 {
        match self {
            Unit::Sat => 1,
            Unit::Bit => SATS_PER_BIT,
            Unit::Bch => COIN,
        }
    }

    /// Number of fractional decimal digits the unit can carry.
    pub fn decimals(&self) -> usize {
        match self {
            Unit::Sat => 0,
            Unit::Bit => 2,
            Unit::Bch => 8,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Sat => "sat",
            Unit::Bit => "bit",
            Unit::Bch => "bch",
        };
        f.write_str(s)
    }
}

impl FromStr for Unit {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sat" | "sats" | "satoshi" | "satoshis" => Ok(Unit::Sat),
            "bit" | "bits" => Ok(Unit::Bit),
            "bch" => Ok(Unit::Bch),
            other => Err(AmountError::UnknownUnit(other.to_string())),
        }
    }
}

/// A non-negative quantity of satoshis.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Amount of `sats` satoshis.
    pub const fn from_sat(sats: u64) -> Self {
        Self(sats)
    }

    /// Amount of `value` whole units. Fails if the satoshi value overflows.
    pub fn new(value: u64, unit: Unit) -> Result<Self, AmountError> {
        value
            .checked_mul(unit.sats_per_unit())
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Parse an exact decimal string such as `"0.00012345"` in `unit`.
    ///
    /// Fractional digits beyond the unit's precision are rejected unless
    /// they are all zero.
    pub fn from_decimal_str(s: &str, unit: Unit) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(AmountError::Negative(s.to_string()));
        }
        let s = s.strip_prefix('+').unwrap_or(s);

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmountError::InvalidDecimal(s.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::InvalidDecimal(s.to_string()));
        }

        let decimals = unit.decimals();
        let frac_trimmed = if frac_part.len() > decimals {
            let (kept, rest) = frac_part.split_at(decimals);
            if rest.bytes().any(|b| b != b'0') {
                return Err(AmountError::TooPrecise {
                    value: s.to_string(),
                    unit: unit.to_string(),
                });
            }
            kept
        } else {
            frac_part
        };

        let mut sats: u64 = 0;
        for b in int_part.bytes() {
            sats = sats
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or(AmountError::Overflow)?;
        }
        sats = sats
            .checked_mul(unit.sats_per_unit())
            .ok_or(AmountError::Overflow)?;

        let mut frac: u64 = 0;
        for b in frac_trimmed.bytes() {
            frac = frac * 10 + u64::from(b - b'0');
        }
        for _ in frac_trimmed.len()..decimals {
            frac *= 10;
        }

        sats.checked_add(frac).map(Self).ok_or(AmountError::Overflow)
    }

    /// Value in satoshis.
    pub const fn as_sat(&self) -> u64 {
        self.0
    }

    /// Exact decimal rendering in `unit`, without trailing zeros.
    pub fn to_decimal_string(&self, unit: Unit) -> String {
        let per = unit.sats_per_unit();
        let whole = self.0 / per;
        let frac = self.0 % per;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:0width$}", width = unit.decimals());
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, AmountError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(AmountError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, AmountError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(AmountError::Underflow)
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn sum<I: IntoIterator<Item = Amount>>(iter: I) -> Result<Self, AmountError> {
        iter.into_iter()
            .try_fold(Self::ZERO, |acc, a| acc.checked_add(a))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scales_by_unit() {
        assert_eq!(Amount::new(3, Unit::Sat).unwrap().as_sat(), 3);
        assert_eq!(Amount::new(3, Unit::Bit).unwrap().as_sat(), 300);
        assert_eq!(Amount::new(3, Unit::Bch).unwrap().as_sat(), 300_000_000);
    }

    #[test]
    fn new_overflow() {
        assert_eq!(Amount::new(u64::MAX, Unit::Bch), Err(AmountError::Overflow));
    }

    #[test]
    fn parse_exact_bch() {
        let a = Amount::from_decimal_str("0.00012345", Unit::Bch).unwrap();
        assert_eq!(a.as_sat(), 12_345);
        let b = Amount::from_decimal_str("0.1", Unit::Bch).unwrap();
        assert_eq!(b.as_sat(), 10_000_000);
        let c = Amount::from_decimal_str("21000000", Unit::Bch).unwrap();
        assert_eq!(c.as_sat(), 21_000_000 * COIN);
    }

    #[test]
    fn parse_bits_and_sats() {
        assert_eq!(Amount::from_decimal_str("1.5", Unit::Bit).unwrap().as_sat(), 150);
        assert_eq!(Amount::from_decimal_str("3000", Unit::Sat).unwrap().as_sat(), 3000);
        assert_eq!(Amount::from_decimal_str(".5", Unit::Bit).unwrap().as_sat(), 50);
    }

    #[test]
    fn parse_trailing_zeros_beyond_precision() {
        let a = Amount::from_decimal_str("1.000000000", Unit::Bch).unwrap();
        assert_eq!(a.as_sat(), COIN);
        assert_eq!(Amount::from_decimal_str("12.0", Unit::Sat).unwrap().as_sat(), 12);
    }

    #[test]
    fn parse_rejects_sub_satoshi() {
        let err = Amount::from_decimal_str("0.000000001", Unit::Bch).unwrap_err();
        assert!(matches!(err, AmountError::TooPrecise { .. }));
        let err = Amount::from_decimal_str("1.5", Unit::Sat).unwrap_err();
        assert!(matches!(err, AmountError::TooPrecise { .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Amount::from_decimal_str("-1", Unit::Sat),
            Err(AmountError::Negative(_))
        ));
        assert!(matches!(
            Amount::from_decimal_str("1e8", Unit::Sat),
            Err(AmountError::InvalidDecimal(_))
        ));
        assert!(matches!(
            Amount::from_decimal_str(".", Unit::Sat),
            Err(AmountError::InvalidDecimal(_))
        ));
        assert!(matches!(
            Amount::from_decimal_str("1.2.3", Unit::Bch),
            Err(AmountError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn parse_overflow() {
        let err = Amount::from_decimal_str("999999999999999999999", Unit::Sat).unwrap_err();
        assert_eq!(err, AmountError::Overflow);
    }

    #[test]
    fn format_decimal() {
        let a = Amount::from_sat(12_345);
        assert_eq!(a.to_decimal_string(Unit::Bch), "0.00012345");
        assert_eq!(a.to_decimal_string(Unit::Bit), "123.45");
        assert_eq!(a.to_decimal_string(Unit::Sat), "12345");
        assert_eq!(Amount::from_sat(COIN).to_decimal_string(Unit::Bch), "1");
        assert_eq!(Amount::from_sat(150_000_000).to_decimal_string(Unit::Bch), "1.5");
        assert_eq!(Amount::ZERO.to_decimal_string(Unit::Bch), "0");
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount::from_sat(10);
        let b = Amount::from_sat(3);
        assert_eq!(a.checked_sub(b).unwrap().as_sat(), 7);
        assert_eq!(b.checked_sub(a), Err(AmountError::Underflow));
        assert_eq!(
            Amount::from_sat(u64::MAX).checked_add(b),
            Err(AmountError::Overflow)
        );
        assert_eq!(b.saturating_sub(a), Amount::ZERO);
    }

    #[test]
    fn sum_amounts() {
        let total = Amount::sum([1, 2, 3].map(Amount::from_sat)).unwrap();
        assert_eq!(total.as_sat(), 6);
        assert!(Amount::sum([Amount::from_sat(u64::MAX), Amount::from_sat(1)]).is_err());
    }

    #[test]
    fn unit_from_str_aliases() {
        assert_eq!("sats".parse::<Unit>().unwrap(), Unit::Sat);
        assert_eq!("BCH".parse::<Unit>().unwrap(), Unit::Bch);
        assert_eq!("bits".parse::<Unit>().unwrap(), Unit::Bit);
        assert!("usd".parse::<Unit>().is_err());
    }

    #[test]
    fn unit_serde_lowercase() {
        let json = serde_json::to_string(&Unit::Bch).unwrap();
        assert_eq!(json, "\"bch\"");
        let amt = serde_json::to_string(&Amount::from_sat(42)).unwrap();
        assert_eq!(amt, "42");
    }

    proptest::proptest! {
        #[test]
        fn decimal_roundtrip_bch(sats in 0u64..=crate::constants::MAX_MONEY) {
            let a = Amount::from_sat(sats);
            let s = a.to_decimal_string(Unit::Bch);
            proptest::prop_assert_eq!(Amount::from_decimal_str(&s, Unit::Bch).unwrap(), a);
        }
    }
}
