//! [`Customer`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Quantity};
use derive_more::{AsRef, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;

use crate::domain::{company, Car};

use super::macros::is_trimmed_within;

/// Customer of a [`Company`].
///
/// [`Company`]: crate::domain::Company
#[derive(Clone, Debug)]
pub struct Customer {
    /// ID of this [`Customer`].
    pub id: Id,

    /// ID of the [`Company`] this [`Customer`] belongs to.
    ///
    /// [`Company`]: crate::domain::Company
    pub company_id: company::Id,

    /// [`Name`] of this [`Customer`].
    pub name: Name,

    /// [`Email`] of this [`Customer`].
    pub email: Email,

    /// [`Phone`] of this [`Customer`].
    pub phone: Phone,

    /// [`Address`] of this [`Customer`].
    pub address: Address,

    /// [`History`] of [`Car`]s bought by this [`Customer`].
    pub purchases: History,

    /// [`History`] of [`Car`]s leased by this [`Customer`].
    pub leases: History,

    /// [`DateTime`] when this [`Customer`] was created.
    pub created_at: CreationDateTime,
}

impl Customer {
    /// Records a purchase of the provided [`Car`] by this [`Customer`].
    ///
    /// # Errors
    ///
    /// If the purchases counter overflows.
    pub fn record_purchase(
        &mut self,
        car: &Car,
    ) -> Result<(), CounterOverflow> {
        self.purchases.record(&car.description())
    }

    /// Records a lease of the provided [`Car`] by this [`Customer`].
    ///
    /// # Errors
    ///
    /// If the leases counter overflows.
    pub fn record_lease(&mut self, car: &Car) -> Result<(), CounterOverflow> {
        self.leases.record(&car.description())
    }
}

/// Running totals of a [`Customer`]'s purchases or leases.
///
/// Updated once per recorded purchase or lease, and never recomputed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct History {
    /// Number of recorded entries.
    count: Quantity,

    /// Descriptions of the recorded [`Car`]s.
    summary: Summary,
}

impl History {
    /// Restores a [`History`] from its persisted parts.
    #[must_use]
    pub fn restore(count: Quantity, summary: Summary) -> Self {
        Self { count, summary }
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub const fn count(&self) -> Quantity {
        self.count
    }

    /// Returns the [`Summary`] of the recorded [`Car`]s.
    #[must_use]
    pub const fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Records a new entry with the provided `description`.
    fn record(&mut self, description: &str) -> Result<(), CounterOverflow> {
        self.count = self.count.checked_add(1).ok_or(CounterOverflow)?;
        self.summary.append(description);
        Ok(())
    }
}

/// Free-text log of [`Car`] descriptions.
#[derive(AsRef, Clone, Debug, Default, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Summary(String);

impl Summary {
    /// Separator between the entries of a [`Summary`].
    pub const SEPARATOR: &'static str = ", ";

    /// Creates a new [`Summary`] out of the persisted text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Appends the provided `entry` to this [`Summary`].
    fn append(&mut self, entry: &str) {
        if !self.0.is_empty() {
            self.0.push_str(Self::SEPARATOR);
        }
        self.0.push_str(entry);
    }
}

/// Error of a [`History`] counter overflow.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`History` counter overflow")]
pub struct CounterOverflow;

define_id! {
    #[doc = "ID of a [`Customer`]."]
    Id
}

define_text! {
    #[doc = "Name of a [`Customer`]."]
    Name,
    check = |s| is_trimmed_within(s, 100),
}

define_text! {
    #[doc = "Postal address of a [`Customer`]."]
    Address,
    check = |s| is_trimmed_within(s, 1024),
}

define_text! {
    #[doc = "Email address of a [`Customer`]."]
    Email,
    check = |s| {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex")
        });

        s.len() <= 254 && REGEX.is_match(s)
    },
}

define_text! {
    #[doc = "Phone number of a [`Customer`]."]
    Phone,
    check = |s| {
        /// Regular expression checking [`Phone`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\+?[0-9][0-9 \-()]{4,18}[0-9]$")
                .expect("valid regex")
        });

        REGEX.is_match(s)
    },
}

/// [`DateTime`] when a [`Customer`] was created.
pub type CreationDateTime = DateTimeOf<(Customer, unit::Creation)>;

#[cfg(test)]
mod tests {
    use common::{DateTimeOf, Quantity};

    use crate::domain::{
        car::{self, Stock},
        company, Car,
    };

    use super::{Address, Customer, Email, History, Id, Name, Phone};

    fn car(brand: &str, model: &str, year: i32) -> Car {
        Car {
            id: car::Id::new(),
            company_id: company::Id::new(),
            brand: car::Brand::new(brand),
            model: car::Model::new(model),
            year: car::Year::new(year),
            color: None,
            engine: None,
            more_info: None,
            stock: Stock::new(Quantity::ZERO),
            created_at: DateTimeOf::now(),
        }
    }

    fn customer() -> Customer {
        Customer {
            id: Id::new(),
            company_id: company::Id::new(),
            name: Name::new("Jane Roe").unwrap(),
            email: Email::new("jane@example.com").unwrap(),
            phone: Phone::new("+1 555-010-9999").unwrap(),
            address: Address::new("1 Main St").unwrap(),
            purchases: History::default(),
            leases: History::default(),
            created_at: DateTimeOf::now(),
        }
    }

    #[test]
    fn records_purchases_and_leases_separately() {
        let mut customer = customer();

        customer.record_purchase(&car("Toyota", "Corolla", 2020)).unwrap();
        customer.record_purchase(&car("Honda", "Civic", 2019)).unwrap();
        customer.record_lease(&car("BMW", "X5", 2022)).unwrap();

        assert_eq!(customer.purchases.count(), Quantity::new(2).unwrap());
        assert_eq!(
            customer.purchases.summary().as_ref(),
            "Toyota Corolla (2020), Honda Civic (2019)",
        );
        assert_eq!(customer.leases.count(), Quantity::new(1).unwrap());
        assert_eq!(customer.leases.summary().as_ref(), "BMW X5 (2022)");
    }

    #[test]
    fn validates_contacts() {
        assert!(Email::new("not-an-email").is_none());
        assert!(Email::new("a@b.co").is_some());
        assert!(Phone::new("12").is_none());
        assert!(Phone::new("555 0100").is_some());
        assert!(Phone::new("٥٥٥ ٠١٠٠").is_none());
        assert!(Name::new(" padded").is_none());
        assert!(Name::new("").is_none());
    }
}
