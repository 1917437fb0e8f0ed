//! [`Command`] for deleting a [`Customer`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Leasing, Transaction, User};
use crate::{
    domain::{customer, user, Company, Customer},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Customer`] along with its [`Transaction`]s and
/// [`Leasing`]s.
#[derive(Clone, Copy, Debug)]
pub struct DeleteCustomer {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Customer`] to delete.
    pub customer_id: customer::Id,
}

impl<Db> Command<DeleteCustomer> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Customer, customer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Customer>, customer::Id>>,
            Ok = Option<Customer>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Customer, customer::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Customer;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteCustomer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteCustomer {
            initiator_id,
            customer_id,
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

        tx.execute(Lock(By::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let customer = tx
            .execute(Select(By::<Option<Customer>, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CustomerNotExists(customer_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Delete(By::<Customer, _>::new(customer.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(customer)
    }
}

/// Error of [`DeleteCustomer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Customer`] with the provided ID does not exist in the [`Company`].
    #[display("`Customer(id: {_0})` does not exist")]
    CustomerNotExists(#[error(not(source))] customer::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),
}
