//! [`Command`] for creating a new [`Car`].

use common::{
    operations::{By, Insert, Select},
    DateTimeOf, Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{
        car::{self, Stock},
        user, Car, Company,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adding a new [`Car`] to the initiator's [`Company`].
#[derive(Clone, Debug)]
pub struct CreateCar {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// Brand of a new [`Car`].
    pub brand: Option<car::Brand>,

    /// Model of a new [`Car`].
    pub model: Option<car::Model>,

    /// Production year of a new [`Car`].
    pub year: Option<car::Year>,

    /// Color of a new [`Car`].
    pub color: Option<car::Color>,

    /// Engine of a new [`Car`].
    pub engine: Option<car::Engine>,

    /// Additional information about a new [`Car`].
    pub more_info: Option<car::Info>,

    /// Number of units available initially.
    pub total_available: Quantity,
}

impl<Db> Command<CreateCar> for Service<Db>
where
    Db: Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        > + Database<Insert<Car>, Err = Traced<database::Error>>,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCar {
            initiator_id,
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

        let car = Car {
            id: car::Id::new(),
            company_id: company.id,
            brand,
            model,
            year,
            color,
            engine,
            more_info,
            stock: Stock::new(total_available),
            created_at: DateTimeOf::now(),
        };
        self.database()
            .execute(Insert(car.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(car)
    }
}

/// Error of [`CreateCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),
}
