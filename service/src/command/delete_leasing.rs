//! [`Command`] for deleting a [`Leasing`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Car, Customer, User};
use crate::{
    domain::{leasing, user, Company, Leasing},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Leasing`].
///
/// The leased [`Car`] unit is not returned into the stock, and the
/// [`Customer`] history keeps the lease.
#[derive(Clone, Copy, Debug)]
pub struct DeleteLeasing {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Leasing`] to delete.
    pub leasing_id: leasing::Id,
}

impl<Db> Command<DeleteLeasing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Leasing, leasing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Leasing>, leasing::Id>>,
            Ok = Option<Leasing>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Leasing, leasing::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Leasing;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteLeasing,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteLeasing {
            initiator_id,
            leasing_id,
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

        tx.execute(Lock(By::new(leasing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let leasing = tx
            .execute(Select(By::<Option<Leasing>, _>::new(leasing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|t| t.company_id == company.id)
            .ok_or(E::LeasingNotExists(leasing_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Delete(By::<Leasing, _>::new(leasing.id)))
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

/// Error of [`DeleteLeasing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),

    /// [`Leasing`] with the provided ID does not exist in the
    /// [`Company`].
    #[display("`Leasing(id: {_0})` does not exist")]
    LeasingNotExists(#[error(not(source))] leasing::Id),
}
