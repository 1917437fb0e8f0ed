//! [`Customer`]-related API definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    routing::get,
    Json, Router,
};
use common::{DateTime, Quantity};
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, customer, user},
    query, read, Command as _,
};

use crate::{api, define_error, error::FieldErrors, AsError, Context, Error};

/// Builds the [`Router`] of the [`Customer`] endpoints.
pub(super) fn router() -> Router {
    Router::new()
        .route("/customers", get(list).post(create))
        .route("/customers/:id", get(get_by_id).put(update).delete(delete))
}

/// Customer of a company.
#[derive(Clone, Debug, Serialize)]
pub struct Customer {
    /// ID of this [`Customer`].
    pub id: customer::Id,

    /// Name of this [`Customer`].
    pub name: String,

    /// Email address of this [`Customer`].
    pub email: String,

    /// Phone number of this [`Customer`].
    pub phone: String,

    /// Postal address of this [`Customer`].
    pub address: String,

    /// Purchases made by this [`Customer`].
    pub purchases: History,

    /// Leases taken by this [`Customer`].
    pub leases: History,

    /// [`DateTime`] when this [`Customer`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,
}

impl From<domain::Customer> for Customer {
    fn from(customer: domain::Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.into(),
            email: customer.email.into(),
            phone: customer.phone.into(),
            address: customer.address.into(),
            purchases: customer.purchases.into(),
            leases: customer.leases.into(),
            created_at: customer.created_at.coerce(),
        }
    }
}

/// Aggregated history of a [`Customer`]'s purchases or leases.
#[derive(Clone, Debug, Serialize)]
pub struct History {
    /// Number of recorded entries.
    pub count: Quantity,

    /// Descriptions of the cars involved, comma-separated.
    pub summary: String,
}

impl From<customer::History> for History {
    fn from(history: customer::History) -> Self {
        Self {
            count: history.count(),
            summary: history.summary().to_string(),
        }
    }
}

/// Body of a [`Customer`] creation or update request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Request {
    /// Name of the [`Customer`].
    pub name: Option<String>,

    /// Email address of the [`Customer`].
    pub email: Option<String>,

    /// Phone number of the [`Customer`].
    pub phone: Option<String>,

    /// Postal address of the [`Customer`].
    pub address: Option<String>,
}

/// Validated contact fields of a [`Request`].
struct Contacts {
    /// Name of the [`Customer`].
    name: customer::Name,

    /// Email address of the [`Customer`].
    email: customer::Email,

    /// Phone number of the [`Customer`].
    phone: customer::Phone,

    /// Postal address of the [`Customer`].
    address: customer::Address,
}

impl Request {
    /// Validates this [`Request`] as a [`command::CreateCustomer`].
    ///
    /// # Errors
    ///
    /// If any of the fields is missing or invalid.
    pub fn into_create(
        self,
        initiator_id: user::Id,
    ) -> Result<command::CreateCustomer, Error> {
        let Contacts {
            name,
            email,
            phone,
            address,
        } = self.contacts()?;

        Ok(command::CreateCustomer {
            initiator_id,
            name,
            email,
            phone,
            address,
        })
    }

    /// Validates this [`Request`] as a [`command::UpdateCustomer`].
    ///
    /// # Errors
    ///
    /// If any of the fields is missing or invalid.
    pub fn into_update(
        self,
        initiator_id: user::Id,
        customer_id: customer::Id,
    ) -> Result<command::UpdateCustomer, Error> {
        let Contacts {
            name,
            email,
            phone,
            address,
        } = self.contacts()?;

        Ok(command::UpdateCustomer {
            initiator_id,
            customer_id,
            name,
            email,
            phone,
            address,
        })
    }

    /// Validates the contact fields of this [`Request`].
    fn contacts(self) -> Result<Contacts, Error> {
        let mut errors = FieldErrors::default();
        let name = errors.required(
            "name",
            self.name.map(customer::Name::new),
            "must be 1 to 100 characters without extra spaces",
        );
        let email = errors.required(
            "email",
            self.email.map(customer::Email::new),
            "must be a valid email address",
        );
        let phone = errors.required(
            "phone",
            self.phone.map(customer::Phone::new),
            "must be a valid phone number",
        );
        let address = errors.required(
            "address",
            self.address.map(customer::Address::new),
            "must be 1 to 1024 characters without extra spaces",
        );

        match (name, email, phone, address) {
            (Some(name), Some(email), Some(phone), Some(address)) => {
                Ok(Contacts {
                    name,
                    email,
                    phone,
                    address,
                })
            }
            _ => Err(errors.into()),
        }
    }
}

/// Lists [`Customer`]s of the authenticated user's company.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "listCustomers", otel.name = api::SPAN_NAME),
)]
async fn list(
    ctx: Context,
    pagination: Result<Query<api::Pagination>, QueryRejection>,
) -> Result<api::Page<Customer>, Error> {
    let Query(pagination) = pagination.map_err(AsError::into_error)?;
    let arguments = pagination.arguments()?;
    let company = api::owned_company(&ctx).await?;

    let page = ctx
        .service()
        .execute(query::customers::List::by(
            read::customer::list::Selector {
                arguments,
                filter: read::customer::list::Filter {
                    company_id: company.id,
                },
            },
        ))
        .await
        .map_err(AsError::into_error)?;
    let mut customers = ctx
        .service()
        .execute(query::customers::ByIds::by(page.items.clone()))
        .await
        .map_err(AsError::into_error)?;

    Ok(api::Page {
        total_count: page.total_count,
        items: page
            .items
            .iter()
            .filter_map(|id| customers.remove(id))
            .map(Into::into)
            .collect(),
    })
}

/// Adds a new [`Customer`] to the authenticated user's company.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "createCustomer", otel.name = api::SPAN_NAME),
)]
async fn create(
    ctx: Context,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Customer>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_create(ctx.user_id())?;

    let customer = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(customer.into())))
}

/// Returns the [`Customer`] with the provided ID.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "getCustomer", otel.name = api::SPAN_NAME),
)]
async fn get_by_id(
    ctx: Context,
    id: Result<Path<customer::Id>, PathRejection>,
) -> Result<Json<Customer>, Error> {
    let Path(customer_id) = id.map_err(AsError::into_error)?;
    let company = api::owned_company(&ctx).await?;

    ctx.service()
        .execute(query::customer::ById::by(customer_id))
        .await
        .map_err(AsError::into_error)?
        .filter(|c| c.company_id == company.id)
        .map(|c| Json(c.into()))
        .ok_or_else(|| CustomerError::NotExists.into())
}

/// Updates contacts of the [`Customer`] with the provided ID.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "updateCustomer", otel.name = api::SPAN_NAME),
)]
async fn update(
    ctx: Context,
    id: Result<Path<customer::Id>, PathRejection>,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<Json<Customer>, Error> {
    let Path(customer_id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_update(ctx.user_id(), customer_id)?;

    ctx.service()
        .execute(cmd)
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`Customer`] with the provided ID along with their sales and
/// leases.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "deleteCustomer", otel.name = api::SPAN_NAME),
)]
async fn delete(
    ctx: Context,
    id: Result<Path<customer::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    let Path(customer_id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::DeleteCustomer {
            initiator_id: ctx.user_id(),
            customer_id,
        })
        .await
        .map(|_| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

define_error! {
    enum CustomerError {
        #[code = "CUSTOMER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Customer with the provided ID does not exist"]
        NotExists,
    }
}

impl AsError for command::create_customer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

impl AsError for command::update_customer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CustomerNotExists(_) => Some(CustomerError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

impl AsError for command::delete_customer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CustomerNotExists(_) => Some(CustomerError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use service::{
        command,
        domain::{customer, user},
    };

    use crate::AsError as _;

    use super::Request;

    fn request() -> Request {
        Request {
            name: Some("Jane Roe".into()),
            email: Some("jane@example.com".into()),
            phone: Some("+1 555 010 0100".into()),
            address: Some("Elm st. 5".into()),
        }
    }

    #[test]
    fn accepts_valid_contacts() {
        let cmd = request()
            .into_update(user::Id::new(), customer::Id::new())
            .unwrap();

        assert_eq!(String::from(cmd.email), "jane@example.com");
    }

    #[test]
    fn reports_invalid_and_missing_contacts() {
        let err = Request {
            email: Some("not-an-email".into()),
            phone: None,
            ..request()
        }
        .into_create(user::Id::new())
        .unwrap_err();

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.fields["email"], ["must be a valid email address"]);
        assert_eq!(err.fields["phone"], ["is required"]);
        assert!(!err.fields.contains_key("name"));
    }

    #[test]
    fn maps_missing_customer() {
        let err = command::update_customer::ExecutionError::CustomerNotExists(
            customer::Id::new(),
        )
        .as_error();

        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
        assert_eq!(err.code, "CUSTOMER_NOT_EXISTS");
    }
}
