//! [`Car`] definitions and its inventory [`Stock`].

use std::num::NonZeroU32;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Quantity};
use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

use crate::domain::company;

use super::macros::is_trimmed_within;

/// Car model offered by a [`Company`].
///
/// A single [`Car`] record describes all the units of the same model, their
/// availability is tracked by its [`Stock`].
///
/// [`Company`]: crate::domain::Company
#[derive(Clone, Debug)]
pub struct Car {
    /// ID of this [`Car`].
    pub id: Id,

    /// ID of the [`Company`] this [`Car`] belongs to.
    ///
    /// [`Company`]: crate::domain::Company
    pub company_id: company::Id,

    /// Brand of this [`Car`].
    pub brand: Option<Brand>,

    /// Model of this [`Car`].
    pub model: Option<Model>,

    /// Production [`Year`] of this [`Car`].
    pub year: Option<Year>,

    /// Color of this [`Car`].
    pub color: Option<Color>,

    /// Engine of this [`Car`].
    pub engine: Option<Engine>,

    /// Additional information about this [`Car`].
    pub more_info: Option<Info>,

    /// Inventory [`Stock`] of this [`Car`].
    pub stock: Stock,

    /// [`DateTime`] when this [`Car`] was created.
    pub created_at: CreationDateTime,
}

impl Car {
    /// Returns a human-readable description of this [`Car`] in the
    /// `<brand> <model> (<year>)` format, omitting the unknown parts.
    ///
    /// Falls back to the [`Car`]'s ID if nothing is known about it.
    #[must_use]
    pub fn description(&self) -> String {
        let mut out = [
            self.brand.as_ref().map(AsRef::<str>::as_ref),
            self.model.as_ref().map(AsRef::<str>::as_ref),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        if let Some(year) = self.year {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("({year})"));
        }

        if out.is_empty() {
            format!("Car {}", self.id)
        } else {
            out
        }
    }
}

/// Inventory counters of a [`Car`].
///
/// All the operations are all-or-nothing: a failed one leaves the [`Stock`]
/// untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stock {
    /// Number of units available for sale or lease.
    total_available: Quantity,

    /// Number of units currently leased.
    ///
    /// [`None`] if the [`Car`] was never leased.
    in_lease: Option<Quantity>,

    /// Indicator whether any unit is available.
    in_stock: bool,

    /// Number of sale events (not units) of the [`Car`].
    sold_count: Quantity,
}

impl Stock {
    /// Creates a new [`Stock`] with the provided number of available units.
    #[must_use]
    pub fn new(total_available: Quantity) -> Self {
        Self::restore(total_available, None, Quantity::ZERO)
    }

    /// Restores a [`Stock`] from its persisted counters.
    #[must_use]
    pub fn restore(
        total_available: Quantity,
        in_lease: Option<Quantity>,
        sold_count: Quantity,
    ) -> Self {
        let mut stock = Self {
            total_available,
            in_lease,
            in_stock: false,
            sold_count,
        };
        stock.recompute_in_stock();
        stock
    }

    /// Returns the number of units available for sale or lease.
    #[must_use]
    pub const fn total_available(&self) -> Quantity {
        self.total_available
    }

    /// Returns the number of currently leased units, if the [`Car`] was ever
    /// leased.
    #[must_use]
    pub const fn in_lease(&self) -> Option<Quantity> {
        self.in_lease
    }

    /// Indicates whether any unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.in_stock
    }

    /// Returns the number of sale events.
    #[must_use]
    pub const fn sold_count(&self) -> Quantity {
        self.sold_count
    }

    /// Overrides the number of available units, as a manual inventory
    /// correction.
    pub fn set_total_available(&mut self, total_available: Quantity) {
        self.total_available = total_available;
        self.recompute_in_stock();
    }

    /// Sells `n` units in a single sale event.
    ///
    /// # Errors
    ///
    /// With [`StockError::Insufficient`] if less than `n` units are available.
    pub fn sell(&mut self, n: NonZeroU32) -> Result<(), StockError> {
        let total_available = self.take(n)?;
        let sold_count =
            self.sold_count.checked_add(1).ok_or(StockError::Overflow)?;

        self.total_available = total_available;
        self.sold_count = sold_count;
        self.recompute_in_stock();
        Ok(())
    }

    /// Leases `n` units.
    ///
    /// # Errors
    ///
    /// With [`StockError::Insufficient`] if less than `n` units are available.
    pub fn lease(&mut self, n: NonZeroU32) -> Result<(), StockError> {
        let total_available = self.take(n)?;
        let in_lease = self
            .in_lease
            .unwrap_or_default()
            .checked_add(n.get())
            .ok_or(StockError::Overflow)?;

        self.total_available = total_available;
        self.in_lease = Some(in_lease);
        self.recompute_in_stock();
        Ok(())
    }

    /// Puts a single leased unit back into the stock.
    ///
    /// # Errors
    ///
    /// With [`StockError::InvalidState`] if no unit is leased at the moment.
    pub fn mark_returned(&mut self) -> Result<(), StockError> {
        let in_lease = self
            .in_lease
            .and_then(|q| q.checked_sub(1))
            .ok_or(StockError::InvalidState)?;
        let total_available = self
            .total_available
            .checked_add(1)
            .ok_or(StockError::Overflow)?;

        self.in_lease = Some(in_lease);
        self.total_available = total_available;
        self.recompute_in_stock();
        Ok(())
    }

    /// Reverts a [`Stock::mark_returned()`], taking a single unit back into
    /// the lease.
    ///
    /// # Errors
    ///
    /// With [`StockError::Insufficient`] if no unit is available.
    pub fn unmark_returned(&mut self) -> Result<(), StockError> {
        self.lease(NonZeroU32::MIN)
    }

    /// Computes the number of available units left after taking `n` of them.
    fn take(&self, n: NonZeroU32) -> Result<Quantity, StockError> {
        self.total_available.checked_sub(n.get()).ok_or(
            StockError::Insufficient {
                requested: n,
                available: self.total_available,
            },
        )
    }

    /// Recomputes the [`Stock::in_stock()`] indicator.
    fn recompute_in_stock(&mut self) {
        self.in_stock = self.total_available.is_positive();
    }
}

/// Error of a [`Stock`] operation.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum StockError {
    /// Not enough units available.
    #[display("Not enough cars available: requested {requested}, \
               available {available}")]
    Insufficient {
        /// Number of requested units.
        requested: NonZeroU32,

        /// Number of available units.
        available: Quantity,
    },

    /// No leased unit to be returned.
    #[display("No leased cars to be returned")]
    InvalidState,

    /// Counter overflow.
    #[display("Inventory counter overflow")]
    Overflow,
}

define_id! {
    #[doc = "ID of a [`Car`]."]
    Id
}

define_text! {
    #[doc = "Brand of a [`Car`]."]
    Brand,
    check = |s| is_trimmed_within(s, 50),
}

define_text! {
    #[doc = "Model of a [`Car`]."]
    Model,
    check = |s| is_trimmed_within(s, 50),
}

define_text! {
    #[doc = "Color of a [`Car`]."]
    Color,
    check = |s| is_trimmed_within(s, 20),
}

define_text! {
    #[doc = "Engine of a [`Car`]."]
    Engine,
    check = |s| is_trimmed_within(s, 20),
}

define_text! {
    #[doc = "Free-form information about a [`Car`]."]
    Info,
    check = |s| !s.trim().is_empty() && s.chars().count() <= 4096,
}

/// Production year of a [`Car`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Year(i32);

impl Year {
    /// First year a car was ever produced.
    const MIN: i32 = 1886;

    /// Creates a new [`Year`] if the provided `year` is realistic.
    #[must_use]
    pub fn new(year: i32) -> Option<Self> {
        (Self::MIN..=9999).contains(&year).then_some(Self(year))
    }

    /// Returns the inner value of this [`Year`].
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

/// [`DateTime`] when a [`Car`] was created.
pub type CreationDateTime = DateTimeOf<(Car, unit::Creation)>;

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use common::{DateTimeOf, Quantity};

    use crate::domain::company;

    use super::{Brand, Car, Id, Model, Stock, StockError, Year};

    fn qty(n: i32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn n(v: u32) -> NonZeroU32 {
        NonZeroU32::new(v).unwrap()
    }

    fn car() -> Car {
        Car {
            id: Id::new(),
            company_id: company::Id::new(),
            brand: Brand::new("Toyota"),
            model: Model::new("Corolla"),
            year: Year::new(2020),
            color: None,
            engine: None,
            more_info: None,
            stock: Stock::new(qty(5)),
            created_at: DateTimeOf::now(),
        }
    }

    #[test]
    fn sell_decrements_available_and_counts_events() {
        let mut stock = Stock::new(qty(5));

        stock.sell(n(3)).unwrap();
        assert_eq!(stock.total_available(), qty(2));
        assert_eq!(stock.sold_count(), qty(1));
        assert!(stock.in_stock());

        stock.sell(n(2)).unwrap();
        assert_eq!(stock.total_available(), qty(0));
        assert_eq!(stock.sold_count(), qty(2));
        assert!(!stock.in_stock());
    }

    #[test]
    fn failed_sell_leaves_stock_unchanged() {
        let mut stock = Stock::new(qty(2));
        let before = stock;

        assert_eq!(
            stock.sell(n(3)),
            Err(StockError::Insufficient {
                requested: n(3),
                available: qty(2),
            }),
        );
        assert_eq!(stock, before);
    }

    #[test]
    fn lease_counts_leased_units() {
        let mut stock = Stock::new(qty(5));
        assert_eq!(stock.in_lease(), None);

        stock.lease(n(2)).unwrap();
        assert_eq!(stock.total_available(), qty(3));
        assert_eq!(stock.in_lease(), Some(qty(2)));

        stock.lease(n(1)).unwrap();
        assert_eq!(stock.in_lease(), Some(qty(3)));

        let before = stock;
        assert!(matches!(
            stock.lease(n(3)),
            Err(StockError::Insufficient { .. }),
        ));
        assert_eq!(stock, before);
    }

    #[test]
    fn return_round_trip_restores_counters() {
        let mut stock = Stock::new(qty(1));
        stock.lease(n(1)).unwrap();
        assert!(!stock.in_stock());
        let leased = stock;

        stock.mark_returned().unwrap();
        assert_eq!(stock.total_available(), qty(1));
        assert_eq!(stock.in_lease(), Some(qty(0)));
        assert!(stock.in_stock());

        stock.unmark_returned().unwrap();
        assert_eq!(stock, leased);
    }

    #[test]
    fn return_requires_leased_unit() {
        let mut never_leased = Stock::new(qty(3));
        assert_eq!(
            never_leased.mark_returned(),
            Err(StockError::InvalidState),
        );

        let mut stock = Stock::new(qty(1));
        stock.lease(n(1)).unwrap();
        stock.mark_returned().unwrap();
        let before = stock;
        assert_eq!(stock.mark_returned(), Err(StockError::InvalidState));
        assert_eq!(stock, before);
    }

    #[test]
    fn unreturn_requires_available_unit() {
        let mut stock = Stock::new(qty(0));
        assert!(matches!(
            stock.unmark_returned(),
            Err(StockError::Insufficient { .. }),
        ));
        assert_eq!(stock.total_available(), qty(0));
    }

    #[test]
    fn restore_recomputes_in_stock() {
        assert!(Stock::restore(qty(1), None, qty(0)).in_stock());
        assert!(!Stock::restore(qty(0), Some(qty(4)), qty(9)).in_stock());

        let mut stock = Stock::new(qty(0));
        stock.set_total_available(qty(7));
        assert!(stock.in_stock());
    }

    #[test]
    fn describes_known_parts() {
        let mut car = car();
        assert_eq!(car.description(), "Toyota Corolla (2020)");

        car.model = None;
        assert_eq!(car.description(), "Toyota (2020)");

        car.brand = None;
        assert_eq!(car.description(), "(2020)");

        car.year = None;
        assert_eq!(car.description(), format!("Car {}", car.id));
    }
}
