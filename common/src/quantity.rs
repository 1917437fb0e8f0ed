//! [`Quantity`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Non-negative count of units.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "i32", into = "i32")
)]
pub struct Quantity(i32);

impl Quantity {
    /// Zero [`Quantity`].
    pub const ZERO: Self = Self(0);

    /// Creates a new [`Quantity`] if the provided `value` is non-negative.
    #[must_use]
    pub const fn new(value: i32) -> Option<Self> {
        if value < 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the inner value of this [`Quantity`].
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Indicates whether this [`Quantity`] is greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Adds `n` units to this [`Quantity`].
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_add(self, n: u32) -> Option<Self> {
        let n = i32::try_from(n).ok()?;
        self.0.checked_add(n).map(Self)
    }

    /// Subtracts `n` units from this [`Quantity`].
    ///
    /// [`None`] is returned if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, n: u32) -> Option<Self> {
        let n = i32::try_from(n).ok()?;
        self.0.checked_sub(n).and_then(Self::new)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = &'static str;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("`Quantity` cannot be negative")
    }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl FromStr for Quantity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        i32::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Quantity`")
    }
}

#[cfg(test)]
mod tests {
    use super::Quantity;

    #[test]
    fn never_goes_negative() {
        let q = Quantity::new(2).unwrap();
        assert_eq!(q.checked_sub(2), Some(Quantity::ZERO));
        assert_eq!(q.checked_sub(3), None);
        assert_eq!(Quantity::new(-1), None);
        assert!(!Quantity::ZERO.is_positive());
    }

    #[test]
    fn add_overflows_to_none() {
        let max = Quantity::new(i32::MAX).unwrap();
        assert_eq!(max.checked_add(1), None);
        assert_eq!(Quantity::ZERO.checked_add(u32::MAX), None);
        assert_eq!(Quantity::ZERO.checked_add(5).map(Quantity::get), Some(5));
    }
}
