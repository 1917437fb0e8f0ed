//! [`Command`] for leasing units of a [`Car`] without recording a
//! [`Leasing`].

use std::num::NonZeroU32;

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Leasing, User};
use crate::{
    domain::{car, user, Car, Company},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for leasing units of a [`Car`].
#[derive(Clone, Copy, Debug)]
pub struct LeaseCar {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Car`] to lease.
    pub car_id: car::Id,

    /// Number of units to lease.
    pub quantity: NonZeroU32,
}

impl<Db> Command<LeaseCar> for Service<Db>
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
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: LeaseCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let LeaseCar {
            initiator_id,
            car_id,
            quantity,
        } = cmd;

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

        // Avoid lost updates of the `Car` counters.
        tx.execute(Lock(By::new(car_id)))
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

        car.stock
            .lease(quantity)
            .map_err(|source| tracerr::new!(E::Stock { car_id, source }))?;

        tx.execute(Update(car.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(car)
    }
}

/// Error of [`LeaseCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] with the provided ID does not exist in the [`Company`].
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

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
