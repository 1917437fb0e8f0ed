//! [`Command`] for recording a new [`Leasing`].

use std::num::NonZeroU32;

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{
        car, customer,
        leasing::Period,
        user, Car, Company, Customer, Leasing,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for leasing a single [`Car`] unit to a [`Customer`].
///
/// Moves the unit into the lease, prices the [`Leasing`] by its [`Period`]
/// and records the lease in the [`Customer`]'s history, all at once.
#[derive(Clone, Copy, Debug)]
pub struct RecordLease {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Customer`] leasing the [`Car`].
    pub customer_id: customer::Id,

    /// ID of the [`Car`] being leased.
    pub car_id: car::Id,

    /// First day of the [`Leasing`].
    pub start_date: Date,

    /// Last day of the [`Leasing`].
    pub end_date: Date,
}

impl<Db> Command<RecordLease> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Car, car::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Customer, customer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Customer>, customer::Id>>,
            Ok = Option<Customer>,
            Err = Traced<database::Error>,
        > + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Update<Customer>, Err = Traced<database::Error>>
        + Database<Insert<Leasing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Leasing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RecordLease) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RecordLease {
            initiator_id,
            customer_id,
            car_id,
            start_date,
            end_date,
        } = cmd;

        let period = Period::new(start_date, end_date)
            .ok_or(E::InvalidDateRange {
                start: start_date,
                end: end_date,
            })
            .map_err(tracerr::wrap!())?;

        let company = self
            .database()
            .execute(Select(By::<Option<Company>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotCompanyOwner(initiator_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Always `Car` first, then `Customer`, to avoid deadlocks.
        tx.execute(Lock(By::<Car, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Customer, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        let mut customer = tx
            .execute(Select(By::<Option<Customer>, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CustomerNotExists(customer_id))
            .map_err(tracerr::wrap!())?;

        car.stock
            .lease(NonZeroU32::MIN)
            .map_err(|source| tracerr::new!(E::Stock { car_id, source }))?;

        let leasing = Leasing::new(company.id, customer_id, car_id, period);

        customer.record_lease(&car).map_err(|_| {
            tracerr::new!(E::CustomerHistoryOverflow(customer_id))
        })?;

        tx.execute(Update(car))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(leasing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Update(customer))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::debug!(
            leasing_id = %leasing.id,
            amount = %leasing.amount(),
            "lease recorded",
        );

        Ok(leasing)
    }
}

/// Error of [`RecordLease`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] with the provided ID does not exist in the [`Company`].
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`Customer`] leases counter overflowed.
    #[display("`Customer(id: {_0})` leases counter overflow")]
    CustomerHistoryOverflow(#[error(not(source))] customer::Id),

    /// [`Customer`] with the provided ID does not exist in the [`Company`].
    #[display("`Customer(id: {_0})` does not exist")]
    CustomerNotExists(#[error(not(source))] customer::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// End [`Date`] of the [`Leasing`] is before its start [`Date`].
    #[display("`Leasing` cannot end on {end} before it starts on {start}")]
    InvalidDateRange {
        /// Requested first day.
        start: Date,

        /// Requested last day.
        end: Date,
    },

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),

    /// [`car::Stock`] of the [`Car`] doesn't allow the lease.
    #[display("`Car(id: {car_id})` cannot be leased: {source}")]
    Stock {
        /// ID of the [`Car`].
        car_id: car::Id,

        /// [`car::StockError`] preventing the lease.
        source: car::StockError,
    },
}
