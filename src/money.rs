// 💵 Amount - Exact money arithmetic in minor units
// Balances are integers (cents), never floats: money must not drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monetary amount in minor units (cents), currency-agnostic.
///
/// Stored in SQLite as INTEGER so balance updates stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from minor units (e.g. 12345 == 123.45)
    pub fn from_minor(minor: i64) -> Self {
        Amount(minor)
    }

    /// Build from whole major units (e.g. 100 == 100.00)
    pub fn from_major(major: i64) -> Self {
        Amount(major * 100)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Parse a user-written amount: "100", "100.50", "100,50",
    /// optionally suffixed with a currency marker ("€", "$", "euros", "dollars").
    pub fn parse_user_input(raw: &str) -> Option<Amount> {
        let mut s = raw.trim().to_lowercase();

        for suffix in ["euros", "euro", "dollars", "dollar", "€", "$", "eur", "usd"] {
            if let Some(stripped) = s.strip_suffix(suffix) {
                s = stripped.trim().to_string();
                break;
            }
        }

        // Accept both decimal separators
        let s = s.replace(',', ".");

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s.as_str(), ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !frac.is_empty() && (frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit())) {
            return None;
        }

        let major: i64 = whole.parse().ok()?;
        let minor: i64 = if frac.is_empty() {
            0
        } else if frac.len() == 1 {
            frac.parse::<i64>().ok()? * 10
        } else {
            frac.parse().ok()?
        };

        major.checked_mul(100)?.checked_add(minor).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse_user_input(s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_decimal() {
        assert_eq!(Amount::parse_user_input("100"), Some(Amount::from_major(100)));
        assert_eq!(Amount::parse_user_input("100.50"), Some(Amount::from_minor(10050)));
        assert_eq!(Amount::parse_user_input("100,50"), Some(Amount::from_minor(10050)));
        assert_eq!(Amount::parse_user_input("0.5"), Some(Amount::from_minor(50)));
    }

    #[test]
    fn test_parse_currency_suffixes() {
        assert_eq!(Amount::parse_user_input("100€"), Some(Amount::from_major(100)));
        assert_eq!(Amount::parse_user_input("100 euros"), Some(Amount::from_major(100)));
        assert_eq!(Amount::parse_user_input("42.75 $"), Some(Amount::from_minor(4275)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Amount::parse_user_input("abc"), None);
        assert_eq!(Amount::parse_user_input("10.123"), None);
        assert_eq!(Amount::parse_user_input(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_minor(10050).to_string(), "100.50");
        assert_eq!(Amount::from_minor(-250).to_string(), "-2.50");
        assert_eq!(Amount::from_minor(5).to_string(), "0.05");
    }

    #[test]
    fn test_exact_arithmetic() {
        let a = Amount::from_minor(50000);
        let b = Amount::from_major(100);
        assert_eq!(a.checked_sub(b), Some(Amount::from_minor(40000)));
        assert_eq!(b.checked_add(b), Some(Amount::from_major(200)));
    }
}
