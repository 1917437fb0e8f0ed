//! [`Command`] for updating the initiator's [`Company`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{company, user, Company},
    infra::{
        database::{self, COMPANY_NAME_CONSTRAINT},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for updating the [`Company`] owned by the initiator.
#[derive(Clone, Debug)]
pub struct UpdateCompany {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// New name of the [`Company`], if it should be changed.
    pub name: Option<company::Name>,

    /// New address of the [`Company`], replacing the current one.
    pub address: Option<company::Address>,
}

impl<Db> Command<UpdateCompany> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Company, company::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        > + Database<Update<Company>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Company;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateCompany) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCompany {
            initiator_id,
            name,
            address,
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

        tx.execute(Lock(By::new(company.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut company = tx
            .execute(Select(By::<Option<Company>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotCompanyOwner(initiator_id))
            .map_err(tracerr::wrap!())?;

        if let Some(name) = name {
            company.name = name;
        }
        company.address = address;

        let occupied = |e: Traced<database::Error>| {
            if e.as_ref().is_unique_violation(Some(COMPANY_NAME_CONSTRAINT)) {
                tracerr::new!(E::NameOccupied(company.name.clone()))
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            }
        };
        tx.execute(Update(company.clone()))
            .await
            .map_err(occupied)
            .map(drop)?;
        tx.execute(Commit).await.map_err(occupied).map(drop)?;

        Ok(company)
    }
}

/// Error of [`UpdateCompany`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`company::Name`] is occupied by another [`Company`].
    #[display("`Company(name: {_0})` already exists")]
    NameOccupied(#[error(not(source))] company::Name),

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),
}
