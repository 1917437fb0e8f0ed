//! [`Leasing`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Money};

#[cfg(doc)]
use crate::domain::{Car, Customer};
use crate::domain::{
    car::{self, Stock, StockError},
    company, customer,
};

/// Lease of a single [`Car`] unit to a [`Customer`] for a [`Period`].
#[derive(Clone, Debug)]
pub struct Leasing {
    /// ID of this [`Leasing`].
    pub id: Id,

    /// ID of the [`Company`] this [`Leasing`] belongs to.
    ///
    /// [`Company`]: crate::domain::Company
    pub company_id: company::Id,

    /// ID of the [`Customer`] leasing the [`Car`].
    pub customer_id: customer::Id,

    /// ID of the leased [`Car`].
    pub car_id: car::Id,

    /// [`Period`] of this [`Leasing`].
    period: Period,

    /// Price of this [`Leasing`], derived from its [`Period`].
    amount: Money,

    /// [`Status`] of this [`Leasing`].
    status: Status,

    /// [`DateTime`] when this [`Leasing`] was recorded.
    pub created_at: CreationDateTime,
}

impl Leasing {
    /// Price of a single leasing day.
    pub const DAILY_RATE: Money = Money::from_cents(2000);

    /// Creates a new [`Status::Active`] [`Leasing`].
    #[must_use]
    pub fn new(
        company_id: company::Id,
        customer_id: customer::Id,
        car_id: car::Id,
        period: Period,
    ) -> Self {
        Self {
            id: Id::new(),
            company_id,
            customer_id,
            car_id,
            amount: Self::calc_amount(&period),
            period,
            status: Status::Active,
            created_at: DateTimeOf::now(),
        }
    }

    /// Restores a [`Leasing`] from its persisted parts.
    #[expect(clippy::too_many_arguments, reason = "mirrors the stored row")]
    #[must_use]
    pub fn restore(
        id: Id,
        company_id: company::Id,
        customer_id: customer::Id,
        car_id: car::Id,
        period: Period,
        amount: Money,
        status: Status,
        created_at: CreationDateTime,
    ) -> Self {
        Self {
            id,
            company_id,
            customer_id,
            car_id,
            period,
            amount,
            status,
            created_at,
        }
    }

    /// Calculates the price of the provided [`Period`].
    ///
    /// Both the start and the end days are paid.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn calc_amount(period: &Period) -> Money {
        let days = u32::try_from(period.days() + 1)
            .expect("`Period` is never negative and fits `u32`");
        Self::DAILY_RATE
            .checked_mul(days)
            .expect("`Period` is bounded by `Date` range")
    }

    /// Returns the [`Period`] of this [`Leasing`].
    #[must_use]
    pub const fn period(&self) -> Period {
        self.period
    }

    /// Returns the price of this [`Leasing`].
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the [`Status`] of this [`Leasing`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Indicates whether the leased [`Car`] is returned.
    #[must_use]
    pub fn is_returned(&self) -> bool {
        self.status == Status::Returned
    }

    /// Changes the [`Period`] of this [`Leasing`], recalculating its amount.
    pub fn set_period(&mut self, period: Period) {
        self.period = period;
        self.amount = Self::calc_amount(&period);
    }

    /// Changes the returned flag of this [`Leasing`].
    ///
    /// Returns the [`Transition`] to be applied to the leased [`Car`]'s
    /// [`Stock`], if any.
    #[must_use]
    pub fn set_returned(&mut self, returned: bool) -> Option<Transition> {
        let to = if returned {
            Status::Returned
        } else {
            Status::Active
        };
        let transition = self.status.transition(to);
        self.status = to;
        transition
    }
}

/// Inclusive range of [`Date`]s a [`Leasing`] lasts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Period {
    /// First day of this [`Period`].
    start: Date,

    /// Last day of this [`Period`].
    end: Date,
}

impl Period {
    /// Creates a new [`Period`] if the `end` is not before the `start`.
    #[must_use]
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Returns the first day of this [`Period`].
    #[must_use]
    pub const fn start(&self) -> Date {
        self.start
    }

    /// Returns the last day of this [`Period`].
    #[must_use]
    pub const fn end(&self) -> Date {
        self.end
    }

    /// Returns the number of whole days between the start and the end.
    #[must_use]
    pub fn days(&self) -> i64 {
        self.start.days_until(self.end)
    }
}

define_kind! {
    #[doc = "Status of a [`Leasing`]."]
    enum Status {
        #[doc = "[`Car`] unit is with the [`Customer`]."]
        Active = 1,

        #[doc = "[`Car`] unit is back in the [`Stock`]."]
        Returned = 2,
    }
}

impl Status {
    /// Computes the [`Transition`] from this [`Status`] to the provided one.
    ///
    /// [`None`] if the [`Status`] doesn't change.
    #[must_use]
    pub const fn transition(self, to: Self) -> Option<Transition> {
        match (self, to) {
            (Self::Active, Self::Returned) => Some(Transition::Return),
            (Self::Returned, Self::Active) => Some(Transition::Unreturn),
            (Self::Active, Self::Active) | (Self::Returned, Self::Returned) => {
                None
            }
        }
    }
}

/// Change of a [`Leasing`]'s [`Status`] affecting the [`Stock`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Leased unit is returned into the [`Stock`].
    Return,

    /// Previously returned unit is taken back into the lease.
    Unreturn,
}

impl Transition {
    /// Applies this [`Transition`] to the provided [`Stock`].
    ///
    /// # Errors
    ///
    /// If the [`Stock`] doesn't allow this [`Transition`].
    pub fn apply(self, stock: &mut Stock) -> Result<(), StockError> {
        match self {
            Self::Return => stock.mark_returned(),
            Self::Unreturn => stock.unmark_returned(),
        }
    }
}

define_id! {
    #[doc = "ID of a [`Leasing`]."]
    Id
}

/// [`DateTime`] when a [`Leasing`] was recorded.
pub type CreationDateTime = DateTimeOf<(Leasing, unit::Creation)>;

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use common::{Date, Money, Quantity};

    use crate::domain::{car, car::Stock, company, customer};

    use super::{Leasing, Period, Status, Transition};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn period(start: &str, end: &str) -> Period {
        Period::new(date(start), date(end)).unwrap()
    }

    #[test]
    fn charges_every_day_inclusively() {
        let amount = |s, e| Leasing::calc_amount(&period(s, e)).to_string();

        assert_eq!(amount("2024-01-01", "2024-01-10"), "200.00");
        assert_eq!(amount("2024-03-01", "2024-03-05"), "100.00");
        assert_eq!(amount("2024-05-05", "2024-05-05"), "20.00");
        assert_eq!(amount("2024-02-28", "2024-03-01"), "60.00");
    }

    #[test]
    fn rejects_reversed_period() {
        assert!(Period::new(date("2024-01-10"), date("2024-01-09")).is_none());
    }

    #[test]
    fn recalculates_amount_on_period_change() {
        let mut leasing = Leasing::new(
            company::Id::new(),
            customer::Id::new(),
            car::Id::new(),
            period("2024-01-01", "2024-01-01"),
        );
        assert_eq!(leasing.amount(), Money::from_cents(2000));

        leasing.set_period(period("2024-01-01", "2024-01-03"));
        assert_eq!(leasing.amount(), Money::from_cents(6000));
    }

    #[test]
    fn computes_transitions() {
        use Status::{Active, Returned};

        assert_eq!(Active.transition(Returned), Some(Transition::Return));
        assert_eq!(Returned.transition(Active), Some(Transition::Unreturn));
        assert_eq!(Active.transition(Active), None);
        assert_eq!(Returned.transition(Returned), None);
    }

    #[test]
    fn toggling_returned_round_trips_stock() {
        let mut stock = Stock::new(Quantity::new(2).unwrap());
        stock.lease(NonZeroU32::MIN).unwrap();
        let leased = stock;

        let mut leasing = Leasing::new(
            company::Id::new(),
            customer::Id::new(),
            car::Id::new(),
            period("2024-01-01", "2024-01-02"),
        );

        assert_eq!(leasing.set_returned(false), None);

        let t = leasing.set_returned(true).unwrap();
        t.apply(&mut stock).unwrap();
        assert!(leasing.is_returned());
        assert_eq!(stock.total_available(), Quantity::new(2).unwrap());
        assert_eq!(stock.in_lease(), Some(Quantity::ZERO));

        assert_eq!(leasing.set_returned(true), None);

        let t = leasing.set_returned(false).unwrap();
        t.apply(&mut stock).unwrap();
        assert_eq!(stock, leased);
    }
}
