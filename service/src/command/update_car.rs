//! [`Command`] for updating a [`Car`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{car::Stock, User};
use crate::{
    domain::{car, user, Car, Company},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for replacing the description of a [`Car`] and, optionally,
/// correcting its available units.
///
/// Counters of the sold and leased units are never edited directly.
#[derive(Clone, Debug)]
pub struct UpdateCar {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Car`] to update.
    pub car_id: car::Id,

    /// New brand of the [`Car`].
    pub brand: Option<car::Brand>,

    /// New model of the [`Car`].
    pub model: Option<car::Model>,

    /// New production year of the [`Car`].
    pub year: Option<car::Year>,

    /// New color of the [`Car`].
    pub color: Option<car::Color>,

    /// New engine of the [`Car`].
    pub engine: Option<car::Engine>,

    /// New additional information about the [`Car`].
    pub more_info: Option<car::Info>,

    /// New number of available units, if it should be corrected.
    pub total_available: Option<Quantity>,
}

impl<Db> Command<UpdateCar> for Service<Db>
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

    async fn execute(&self, cmd: UpdateCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCar {
            initiator_id,
            car_id,
            brand,
            model,
            year,
            color,
            engine,
            more_info,
            total_available,
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

        let mut car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;

        car.brand = brand;
        car.model = model;
        car.year = year;
        car.color = color;
        car.engine = engine;
        car.more_info = more_info;
        if let Some(total) = total_available {
            car.stock.set_total_available(total);
        }

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

/// Error of [`UpdateCar`] [`Command`] execution.
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
