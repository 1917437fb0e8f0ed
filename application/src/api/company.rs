//! [`Company`]-related API definitions.

use axum::{extract::rejection::JsonRejection, routing::get, Json, Router};
use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, company, user},
    Command as _,
};

use crate::{api, define_error, error::FieldErrors, AsError, Context, Error};

/// Builds the [`Router`] of the [`Company`] endpoints.
pub(super) fn router() -> Router {
    Router::new().route("/companies", get(get_own).post(create).put(update))
}

/// Company owned by the authenticated user.
#[derive(Clone, Debug, Serialize)]
pub struct Company {
    /// ID of this [`Company`].
    pub id: company::Id,

    /// Unique name of this [`Company`].
    pub name: String,

    /// Postal address of this [`Company`].
    pub address: Option<String>,

    /// ID of the user owning this [`Company`].
    pub owner_id: user::Id,

    /// IDs of the users being members of this [`Company`].
    pub member_ids: Vec<user::Id>,

    /// [`DateTime`] when this [`Company`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,
}

impl From<domain::Company> for Company {
    fn from(company: domain::Company) -> Self {
        Self {
            id: company.id,
            name: company.name.into(),
            address: company.address.map(Into::into),
            owner_id: company.owner_id,
            member_ids: company.member_ids,
            created_at: company.created_at.coerce(),
        }
    }
}

/// Body of a [`Company`] creation or update request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Request {
    /// Name of the [`Company`].
    pub name: Option<String>,

    /// Postal address of the [`Company`].
    pub address: Option<String>,
}

impl Request {
    /// Message of an invalid name.
    const INVALID_NAME: &'static str =
        "must be 1 to 100 characters without surrounding whitespace";

    /// Message of an invalid address.
    const INVALID_ADDRESS: &'static str =
        "must be 1 to 1024 characters without surrounding whitespace";

    /// Validates this [`Request`] as a [`command::CreateCompany`].
    ///
    /// # Errors
    ///
    /// If any of the fields is invalid or the name is missing.
    pub fn into_create(
        self,
        initiator_id: user::Id,
    ) -> Result<command::CreateCompany, Error> {
        let mut errors = FieldErrors::default();
        let name = errors.required(
            "name",
            self.name.map(company::Name::new),
            Self::INVALID_NAME,
        );
        let address = errors.optional(
            "address",
            self.address.map(company::Address::new),
            Self::INVALID_ADDRESS,
        );

        match name {
            Some(name) if errors.is_empty() => Ok(command::CreateCompany {
                initiator_id,
                name,
                address,
            }),
            _ => Err(errors.into()),
        }
    }

    /// Validates this [`Request`] as a [`command::UpdateCompany`].
    ///
    /// # Errors
    ///
    /// If any of the provided fields is invalid.
    pub fn into_update(
        self,
        initiator_id: user::Id,
    ) -> Result<command::UpdateCompany, Error> {
        let mut errors = FieldErrors::default();
        let name = errors.optional(
            "name",
            self.name.map(company::Name::new),
            Self::INVALID_NAME,
        );
        let address = errors.optional(
            "address",
            self.address.map(company::Address::new),
            Self::INVALID_ADDRESS,
        );

        errors.or_value(command::UpdateCompany {
            initiator_id,
            name,
            address,
        })
    }
}

/// Returns the [`Company`] owned by the authenticated user.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "getCompany", otel.name = api::SPAN_NAME),
)]
async fn get_own(ctx: Context) -> Result<Json<Company>, Error> {
    api::owned_company(&ctx).await.map(|c| Json(c.into()))
}

/// Creates a new [`Company`] owned by the authenticated user.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "createCompany", otel.name = api::SPAN_NAME),
)]
async fn create(
    ctx: Context,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Company>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_create(ctx.user_id())?;

    let company = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(company.into())))
}

/// Updates the [`Company`] owned by the authenticated user.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "updateCompany", otel.name = api::SPAN_NAME),
)]
async fn update(
    ctx: Context,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<Json<Company>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_update(ctx.user_id())?;

    ctx.service()
        .execute(cmd)
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

define_error! {
    enum CompanyError {
        #[code = "ALREADY_OWNS_COMPANY"]
        #[status = CONFLICT]
        #[message = "Authenticated user already owns a company"]
        AlreadyOwns,

        #[code = "COMPANY_NAME_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "Company name is occupied by another company"]
        NameOccupied,
    }
}

impl AsError for command::create_company::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AlreadyOwnsCompany(_) => {
                Some(CompanyError::AlreadyOwns.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(CompanyError::NameOccupied.into()),
        }
    }
}

impl AsError for command::update_company::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(CompanyError::NameOccupied.into()),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use service::{command, domain::user};

    use crate::AsError as _;

    use super::Request;

    #[test]
    fn requires_name_on_create() {
        let err = Request::default()
            .into_create(user::Id::new())
            .unwrap_err();

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.fields["name"], ["is required"]);
    }

    #[test]
    fn reports_every_invalid_field() {
        let err = Request {
            name: Some(" Cars ".into()),
            address: Some(String::new()),
        }
        .into_update(user::Id::new())
        .unwrap_err();

        assert_eq!(err.fields.len(), 2);
        assert!(err.fields.contains_key("name"));
        assert!(err.fields.contains_key("address"));
    }

    #[test]
    fn keeps_name_on_partial_update() {
        let cmd = Request {
            name: None,
            address: Some("Main st. 1".into()),
        }
        .into_update(user::Id::new())
        .unwrap();

        assert!(cmd.name.is_none());
        assert_eq!(String::from(cmd.address.unwrap()), "Main st. 1");
    }

    #[test]
    fn maps_execution_errors() {
        use command::{
            create_company::ExecutionError as CreateError,
            update_company::ExecutionError as UpdateError,
        };

        let err = CreateError::AlreadyOwnsCompany(user::Id::new()).as_error();
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(err.code, "ALREADY_OWNS_COMPANY");

        let err = UpdateError::NotCompanyOwner(user::Id::new()).as_error();
        assert_eq!(err.status_code, http::StatusCode::FORBIDDEN);
    }
}
