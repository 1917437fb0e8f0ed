//! [`Command`] for updating a [`Leasing`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{car::Stock, Customer, User};
use crate::{
    domain::{
        car,
        leasing::{self, Period},
        user, Car, Company, Leasing,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for changing the [`Period`] or the returned flag of a
/// [`Leasing`].
///
/// Changing the [`Period`] recalculates the amount. Toggling the returned
/// flag moves the leased unit between the lease and the [`Stock`] of the
/// [`Car`]. The [`Customer`] history is never touched.
#[derive(Clone, Copy, Debug)]
pub struct UpdateLeasing {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Leasing`] to update.
    pub leasing_id: leasing::Id,

    /// New first day, if it should be changed.
    pub start_date: Option<Date>,

    /// New last day, if it should be changed.
    pub end_date: Option<Date>,

    /// New returned flag, if it should be changed.
    pub returned: Option<bool>,
}

impl<Db> Command<UpdateLeasing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Leasing>, leasing::Id>>,
            Ok = Option<Leasing>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Car, car::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Leasing, leasing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Leasing>, leasing::Id>>,
            Ok = Option<Leasing>,
            Err = Traced<database::Error>,
        > + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Update<Leasing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Leasing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateLeasing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateLeasing {
            initiator_id,
            leasing_id,
            start_date,
            end_date,
            returned,
        } = cmd;

        let company = self
            .database()
            .execute(Select(By::<Option<Company>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotCompanyOwner(initiator_id))
            .map_err(tracerr::wrap!())?;

        // The leased `Car` never changes, so it's safe to learn it before
        // taking the locks in the `Car`-first order.
        let car_id = self
            .database()
            .execute(Select(By::<Option<Leasing>, _>::new(leasing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|l| l.company_id == company.id)
            .ok_or(E::LeasingNotExists(leasing_id))
            .map_err(tracerr::wrap!())?
            .car_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Car, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Leasing, _>::new(leasing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut leasing = tx
            .execute(Select(By::<Option<Leasing>, _>::new(leasing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|l| l.company_id == company.id)
            .ok_or(E::LeasingNotExists(leasing_id))
            .map_err(tracerr::wrap!())?;

        if start_date.is_some() || end_date.is_some() {
            let current = leasing.period();
            let start = start_date.unwrap_or(current.start());
            let end = end_date.unwrap_or(current.end());
            let period = Period::new(start, end)
                .ok_or(E::InvalidDateRange { start, end })
                .map_err(tracerr::wrap!())?;
            leasing.set_period(period);
        }

        let transition = returned.and_then(|r| leasing.set_returned(r));
        if let Some(transition) = transition {
            let mut car = tx
                .execute(Select(By::<Option<Car>, _>::new(car_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CarNotExists(car_id))
                .map_err(tracerr::wrap!())?;
            transition
                .apply(&mut car.stock)
                .map_err(|source| tracerr::new!(E::Stock { car_id, source }))?;
            tx.execute(Update(car))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Update(leasing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(leasing)
    }
}

/// Error of [`UpdateLeasing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Leased [`Car`] doesn't exist anymore.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

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

    /// [`Leasing`] with the provided ID does not exist in the [`Company`].
    #[display("`Leasing(id: {_0})` does not exist")]
    LeasingNotExists(#[error(not(source))] leasing::Id),

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),

    /// [`Stock`] of the [`Car`] doesn't allow the status change.
    #[display("`Car(id: {car_id})` stock cannot change: {source}")]
    Stock {
        /// ID of the [`Car`].
        car_id: car::Id,

        /// [`car::StockError`] preventing the change.
        source: car::StockError,
    },
}
