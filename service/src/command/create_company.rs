//! [`Command`] for creating a new [`Company`].

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{company, user, Company},
    infra::{
        database::{self, COMPANY_NAME_CONSTRAINT, COMPANY_OWNER_CONSTRAINT},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Company`] owned by the initiator.
#[derive(Clone, Debug)]
pub struct CreateCompany {
    /// ID of the [`User`] creating the [`Company`].
    pub initiator_id: user::Id,

    /// Name of a new [`Company`].
    pub name: company::Name,

    /// Address of a new [`Company`].
    pub address: Option<company::Address>,
}

impl<Db> Command<CreateCompany> for Service<Db>
where
    Db: Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        > + Database<Insert<Company>, Err = Traced<database::Error>>,
{
    type Ok = Company;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateCompany) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCompany {
            initiator_id,
            name,
            address,
        } = cmd;

        let owned = self
            .database()
            .execute(Select(By::<Option<Company>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if owned.is_some() {
            return Err(tracerr::new!(E::AlreadyOwnsCompany(initiator_id)));
        }

        let company = Company::new(name, address, initiator_id);
        self.database()
            .execute(Insert(company.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(COMPANY_NAME_CONSTRAINT))
                {
                    tracerr::new!(E::NameOccupied(company.name.clone()))
                } else if e
                    .as_ref()
                    .is_unique_violation(Some(COMPANY_OWNER_CONSTRAINT))
                {
                    tracerr::new!(E::AlreadyOwnsCompany(initiator_id))
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })
            .map(drop)?;

        Ok(company)
    }
}

/// Error of [`CreateCompany`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`User`] already owns a [`Company`].
    #[display("`User(id: {_0})` already owns a `Company`")]
    AlreadyOwnsCompany(#[error(not(source))] user::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`company::Name`] is occupied by another [`Company`].
    #[display("`Company(name: {_0})` already exists")]
    NameOccupied(#[error(not(source))] company::Name),
}
