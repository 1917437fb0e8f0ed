//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Non-negative amount of money with exactly two fraction digits.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Money(Decimal);

impl Money {
    /// Number of fraction digits every [`Money`] amount carries.
    pub const SCALE: u32 = 2;

    /// Zero [`Money`].
    pub const ZERO: Self = Self::from_cents(0);

    /// Largest [`Money`] amount fitting a `NUMERIC(14, 2)` column.
    pub const MAX: Self = Self(Decimal::from_parts(
        276_447_231, // 99_999_999_999_999 cents
        23_283,
        0,
        false,
        Self::SCALE,
    ));

    /// Creates a new [`Money`] if the provided `amount` is non-negative, does
    /// not exceed [`Money::MAX`] and has at most [`Money::SCALE`] significant
    /// fraction digits.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return None;
        }
        if amount.normalize().scale() > Self::SCALE || amount > Self::MAX.0 {
            return None;
        }

        let mut amount = amount;
        amount.set_sign_positive(true);
        amount.rescale(Self::SCALE);
        Some(Self(amount))
    }

    /// Creates a new [`Money`] from the provided amount of cents.
    #[must_use]
    pub const fn from_cents(cents: u32) -> Self {
        Self(Decimal::from_parts(cents, 0, 0, false, Self::SCALE))
    }

    /// Returns the [`Decimal`] amount of this [`Money`].
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiplies this [`Money`] by the provided `factor`.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_mul(self, factor: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(factor)).and_then(Self::new)
    }

    /// Adds the provided [`Money`] to this one.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).and_then(Self::new)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Money`")
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use std::{fmt, str::FromStr as _};

    use serde::{
        de::{self, Visitor},
        Deserialize, Deserializer, Serialize, Serializer,
    };

    use super::Money;

    impl Serialize for Money {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Money {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            /// [`Visitor`] accepting both string and numeric amounts.
            struct MoneyVisitor;

            impl Visitor<'_> for MoneyVisitor {
                type Value = Money;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(
                        "a non-negative amount up to 999999999999.99 with \
                         at most two fraction digits",
                    )
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                    Money::from_str(v).map_err(E::custom)
                }

                fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                    self.visit_str(&v.to_string())
                }

                fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                    self.visit_str(&v.to_string())
                }

                fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                    // Shortest round-trip representation of the float.
                    self.visit_str(&v.to_string())
                }
            }

            deserializer.deserialize_any(MoneyVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Money;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rescales_to_two_digits() {
        let m = Money::new(decimal("15000")).unwrap();
        assert_eq!(m.amount().scale(), 2);
        assert_eq!(m.to_string(), "15000.00");

        assert_eq!(Money::new(decimal("0.5")).unwrap().to_string(), "0.50");
        assert_eq!(Money::new(decimal("1.230")).unwrap().to_string(), "1.23");
    }

    #[test]
    fn rejects_invalid_amounts() {
        assert!(Money::new(decimal("-0.01")).is_none());
        assert!(Money::new(decimal("1.005")).is_none());
        assert!(Money::from_str("abc").is_err());
        assert!(Money::from_str("-5").is_err());
    }

    #[test]
    fn bounded_by_column_precision() {
        assert_eq!(Money::MAX.to_string(), "999999999999.99");
        assert_eq!(
            Money::from_str("999999999999.99").unwrap(),
            Money::MAX,
        );
        assert!(Money::from_str("1000000000000.00").is_err());
        assert!(Money::from_str("10000000000000.00").is_err());
        assert!(Money::MAX.checked_add(Money::from_cents(1)).is_none());
        assert!(Money::MAX.checked_mul(2).is_none());
    }

    #[test]
    fn multiplies_without_drift() {
        let rate = Money::from_cents(2000);
        assert_eq!(rate.to_string(), "20.00");
        assert_eq!(
            rate.checked_mul(10).unwrap(),
            Money::from_str("200").unwrap(),
        );
        assert_eq!(rate.checked_mul(10).unwrap().to_string(), "200.00");
        assert_eq!(
            Money::from_str("0.10").unwrap().checked_mul(3).unwrap(),
            Money::from_str("0.30").unwrap(),
        );
    }

    #[test]
    fn zero() {
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::new(decimal("-0")).unwrap(), Money::ZERO);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_strings_and_numbers() {
        let m: Money = serde_json::from_str("\"15000.00\"").unwrap();
        assert_eq!(m.to_string(), "15000.00");

        let m: Money = serde_json::from_str("99.9").unwrap();
        assert_eq!(m.to_string(), "99.90");

        let m: Money = serde_json::from_str("7").unwrap();
        assert_eq!(m.to_string(), "7.00");

        assert!(serde_json::from_str::<Money>("\"1.001\"").is_err());
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"7.00\"");
    }
}
