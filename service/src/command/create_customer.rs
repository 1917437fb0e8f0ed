//! [`Command`] for creating a new [`Customer`].

use common::{
    operations::{By, Insert, Select},
    DateTimeOf,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{
        customer::{self, History},
        user, Company, Customer,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adding a new [`Customer`] to the initiator's [`Company`].
#[derive(Clone, Debug)]
pub struct CreateCustomer {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// Name of a new [`Customer`].
    pub name: customer::Name,

    /// Email of a new [`Customer`].
    pub email: customer::Email,

    /// Phone of a new [`Customer`].
    pub phone: customer::Phone,

    /// Address of a new [`Customer`].
    pub address: customer::Address,
}

impl<Db> Command<CreateCustomer> for Service<Db>
where
    Db: Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        > + Database<Insert<Customer>, Err = Traced<database::Error>>,
{
    type Ok = Customer;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateCustomer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCustomer {
            initiator_id,
            name,
            email,
            phone,
            address,
        } = cmd;

        let company = self
            .database()
            .execute(Select(By::<Option<Company>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotCompanyOwner(initiator_id))
            .map_err(tracerr::wrap!())?;

        let customer = Customer {
            id: customer::Id::new(),
            company_id: company.id,
            name,
            email,
            phone,
            address,
            purchases: History::default(),
            leases: History::default(),
            created_at: DateTimeOf::now(),
        };
        self.database()
            .execute(Insert(customer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(customer)
    }
}

/// Error of [`CreateCustomer`] [`Command`] execution.
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
