//! [`Command`] for deleting a [`Car`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Leasing, Transaction, User};
use crate::{
    domain::{car, user, Car, Company},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Car`] along with its [`Transaction`]s and
/// [`Leasing`]s.
#[derive(Clone, Copy, Debug)]
pub struct DeleteCar {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Car`] to delete.
    pub car_id: car::Id,
}

impl<Db> Command<DeleteCar> for Service<Db>
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
        > + Database<Delete<By<Car, car::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteCar {
            initiator_id,
            car_id,
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

        tx.execute(Lock(By::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Delete(By::<Car, _>::new(car.id)))
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

/// Error of [`DeleteCar`] [`Command`] execution.
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
}
