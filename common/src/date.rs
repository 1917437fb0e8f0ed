//! Calendar [`Date`] definitions.

use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use time::macros::format_description;

/// Calendar date without a time component.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Date(time::Date);

impl Date {
    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn from_calendar(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Returns the current [`Date`] in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(time::OffsetDateTime::now_utc().date())
    }

    /// Returns the number of whole days from this [`Date`] to the `end` one.
    ///
    /// Negative if `end` is before this [`Date`].
    #[must_use]
    pub fn days_until(self, end: Self) -> i64 {
        (end.0 - self.0).whole_days()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self
            .0
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for Date {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| "invalid `Date`, expected `YYYY-MM-DD`")
    }
}

impl From<time::Date> for Date {
    fn from(date: time::Date) -> Self {
        Self(date)
    }
}

impl From<Date> for time::Date {
    fn from(date: Date) -> Self {
        date.0
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use std::str::FromStr as _;

    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Date;

    impl Serialize for Date {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Date {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            Date::from_str(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::Date;

    #[test]
    fn parses_and_formats_iso_dates() {
        let d = Date::from_str("2024-03-01").unwrap();
        assert_eq!(d, Date::from_calendar(2024, 3, 1).unwrap());
        assert_eq!(d.to_string(), "2024-03-01");

        assert!(Date::from_str("2024-02-30").is_err());
        assert!(Date::from_str("01.03.2024").is_err());
        assert!(Date::from_calendar(2024, 13, 1).is_none());
    }

    #[test]
    fn counts_days_between() {
        let start = Date::from_calendar(2024, 1, 1).unwrap();
        let end = Date::from_calendar(2024, 1, 10).unwrap();

        assert_eq!(start.days_until(end), 9);
        assert_eq!(start.days_until(start), 0);
        assert_eq!(end.days_until(start), -9);

        // Leap day is counted.
        let feb = Date::from_calendar(2024, 2, 28).unwrap();
        let mar = Date::from_calendar(2024, 3, 1).unwrap();
        assert_eq!(feb.days_until(mar), 2);
    }
}
