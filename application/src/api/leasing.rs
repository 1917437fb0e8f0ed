//! [`Leasing`]-related API definitions.

use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    routing::{get, put},
    Json, Router,
};
use common::{Date, DateTime, Money};
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, car, customer, leasing, user},
    query, read, Command as _,
};

use crate::{api, define_error, error::FieldErrors, AsError, Context, Error};

/// Builds the [`Router`] of the [`Leasing`] endpoints.
pub(super) fn router() -> Router {
    Router::new()
        .route("/leases", get(list).post(create))
        .route("/leases/:id", get(get_by_id).put(update).delete(delete))
        .route("/leases/:id/returned", put(mark_returned))
}

/// Lease of a car to a customer.
#[derive(Clone, Debug, Serialize)]
pub struct Leasing {
    /// ID of this [`Leasing`].
    pub id: leasing::Id,

    /// ID of the customer leasing the car.
    pub customer_id: customer::Id,

    /// ID of the leased car.
    pub car_id: car::Id,

    /// First day of this [`Leasing`].
    pub start_date: Date,

    /// Last day of this [`Leasing`].
    pub end_date: Date,

    /// Price of this [`Leasing`].
    pub amount: Money,

    /// Indicator whether the leased car is returned.
    pub returned: bool,

    /// Customer leasing the car, if loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<api::customer::Customer>,

    /// Leased car, if loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car: Option<api::car::Car>,

    /// [`DateTime`] when this [`Leasing`] was recorded.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,
}

impl Leasing {
    /// Creates a new [`Leasing`] with its customer and car looked up in the
    /// provided maps.
    fn with_relations(
        leasing: domain::Leasing,
        customers: &HashMap<customer::Id, domain::Customer>,
        cars: &HashMap<car::Id, domain::Car>,
    ) -> Self {
        let customer = customers.get(&leasing.customer_id).cloned();
        let car = cars.get(&leasing.car_id).cloned();

        Self {
            customer: customer.map(Into::into),
            car: car.map(Into::into),
            ..leasing.into()
        }
    }
}

impl From<domain::Leasing> for Leasing {
    fn from(leasing: domain::Leasing) -> Self {
        let period = leasing.period();
        Self {
            id: leasing.id,
            customer_id: leasing.customer_id,
            car_id: leasing.car_id,
            start_date: period.start(),
            end_date: period.end(),
            amount: leasing.amount(),
            returned: leasing.is_returned(),
            customer: None,
            car: None,
            created_at: leasing.created_at.coerce(),
        }
    }
}

/// Body of a [`Leasing`] recording request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateRequest {
    /// ID of the customer leasing the car.
    pub customer_id: Option<String>,

    /// ID of the car being leased.
    pub car_id: Option<String>,

    /// First day of the lease in `YYYY-MM-DD` format.
    pub start_date: Option<String>,

    /// Last day of the lease in `YYYY-MM-DD` format.
    pub end_date: Option<String>,
}

impl CreateRequest {
    /// Validates this [`CreateRequest`] as a [`command::RecordLease`].
    ///
    /// # Errors
    ///
    /// If any of the fields is missing or invalid.
    pub fn into_command(
        self,
        initiator_id: user::Id,
    ) -> Result<command::RecordLease, Error> {
        let mut errors = FieldErrors::default();
        let customer_id = errors.required(
            "customer_id",
            self.customer_id.as_deref().map(api::parse),
            "must be a valid ID",
        );
        let car_id = errors.required(
            "car_id",
            self.car_id.as_deref().map(api::parse),
            "must be a valid ID",
        );
        let start_date = errors.required(
            "start_date",
            self.start_date.as_deref().map(api::parse),
            UpdateRequest::INVALID_DATE,
        );
        let end_date = errors.required(
            "end_date",
            self.end_date.as_deref().map(api::parse),
            UpdateRequest::INVALID_DATE,
        );

        match (customer_id, car_id, start_date, end_date) {
            (
                Some(customer_id),
                Some(car_id),
                Some(start_date),
                Some(end_date),
            ) => Ok(command::RecordLease {
                initiator_id,
                customer_id,
                car_id,
                start_date,
                end_date,
            }),
            _ => Err(errors.into()),
        }
    }
}

/// Body of a [`Leasing`] update request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateRequest {
    /// New first day of the lease in `YYYY-MM-DD` format.
    pub start_date: Option<String>,

    /// New last day of the lease in `YYYY-MM-DD` format.
    pub end_date: Option<String>,

    /// Indicator whether the leased car is returned.
    pub returned: Option<bool>,
}

impl UpdateRequest {
    /// Message of an invalid date.
    const INVALID_DATE: &'static str = "must be a date in YYYY-MM-DD format";

    /// Validates this [`UpdateRequest`] as a [`command::UpdateLeasing`].
    ///
    /// # Errors
    ///
    /// If any of the provided dates is invalid.
    pub fn into_command(
        self,
        initiator_id: user::Id,
        leasing_id: leasing::Id,
    ) -> Result<command::UpdateLeasing, Error> {
        let mut errors = FieldErrors::default();
        let start_date = errors.optional(
            "start_date",
            self.start_date.as_deref().map(api::parse),
            Self::INVALID_DATE,
        );
        let end_date = errors.optional(
            "end_date",
            self.end_date.as_deref().map(api::parse),
            Self::INVALID_DATE,
        );

        errors.or_value(command::UpdateLeasing {
            initiator_id,
            leasing_id,
            start_date,
            end_date,
            returned: self.returned,
        })
    }
}

/// Lists [`Leasing`]s of the authenticated user's company along with their
/// customers and cars.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "listLeases", otel.name = api::SPAN_NAME),
)]
async fn list(
    ctx: Context,
    pagination: Result<Query<api::Pagination>, QueryRejection>,
) -> Result<api::Page<Leasing>, Error> {
    let Query(pagination) = pagination.map_err(AsError::into_error)?;
    let arguments = pagination.arguments()?;
    let company = api::owned_company(&ctx).await?;

    let page = ctx
        .service()
        .execute(query::leasings::List::by(read::leasing::list::Selector {
            arguments,
            filter: read::leasing::list::Filter {
                company_id: company.id,
            },
        }))
        .await
        .map_err(AsError::into_error)?;
    let mut leasings = ctx
        .service()
        .execute(query::leasings::ByIds::by(page.items.clone()))
        .await
        .map_err(AsError::into_error)?;
    let leasings = page
        .items
        .iter()
        .filter_map(|id| leasings.remove(id))
        .collect::<Vec<_>>();

    let (customers, cars) = tokio::try_join!(
        ctx.service().execute(query::customers::ByIds::by(
            leasings.iter().map(|l| l.customer_id).unique().collect(),
        )),
        ctx.service().execute(query::cars::ByIds::by(
            leasings.iter().map(|l| l.car_id).unique().collect(),
        )),
    )
    .map_err(AsError::into_error)?;

    Ok(api::Page {
        total_count: page.total_count,
        items: leasings
            .into_iter()
            .map(|l| Leasing::with_relations(l, &customers, &cars))
            .collect(),
    })
}

/// Returns the [`Leasing`] with the provided ID along with its customer
/// and car.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "getLease", otel.name = api::SPAN_NAME),
)]
async fn get_by_id(
    ctx: Context,
    id: Result<Path<leasing::Id>, PathRejection>,
) -> Result<Json<Leasing>, Error> {
    let Path(leasing_id) = id.map_err(AsError::into_error)?;
    let company = api::owned_company(&ctx).await?;

    let leasing = ctx
        .service()
        .execute(query::leasing::ById::by(leasing_id))
        .await
        .map_err(AsError::into_error)?
        .filter(|e| e.company_id == company.id)
        .ok_or_else(|| Error::from(LeasingError::NotExists))?;

    let (customer, car) = tokio::try_join!(
        ctx.service().execute(query::customer::ById::by(leasing.customer_id)),
        ctx.service().execute(query::car::ById::by(leasing.car_id)),
    )
    .map_err(AsError::into_error)?;

    Ok(Json(Leasing {
        customer: customer.map(Into::into),
        car: car.map(Into::into),
        ..leasing.into()
    }))
}

/// Records a lease of a single car unit to a customer.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "recordLease", otel.name = api::SPAN_NAME),
)]
async fn create(
    ctx: Context,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Leasing>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_command(ctx.user_id())?;

    let leasing = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(leasing.into())))
}

/// Updates the period or the returned flag of the [`Leasing`].
#[tracing::instrument(
    skip_all,
    fields(http.operation = "updateLease", otel.name = api::SPAN_NAME),
)]
async fn update(
    ctx: Context,
    id: Result<Path<leasing::Id>, PathRejection>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Leasing>, Error> {
    let Path(leasing_id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_command(ctx.user_id(), leasing_id)?;

    ctx.service()
        .execute(cmd)
        .await
        .map(|l| Json(l.into()))
        .map_err(AsError::into_error)
}

/// Marks the leased car of the [`Leasing`] as returned.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "returnLease", otel.name = api::SPAN_NAME),
)]
async fn mark_returned(
    ctx: Context,
    id: Result<Path<leasing::Id>, PathRejection>,
) -> Result<Json<Leasing>, Error> {
    let Path(leasing_id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::UpdateLeasing {
            initiator_id: ctx.user_id(),
            leasing_id,
            start_date: None,
            end_date: None,
            returned: Some(true),
        })
        .await
        .map(|l| Json(l.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`Leasing`] with the provided ID.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "deleteLease", otel.name = api::SPAN_NAME),
)]
async fn delete(
    ctx: Context,
    id: Result<Path<leasing::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    let Path(leasing_id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::DeleteLeasing {
            initiator_id: ctx.user_id(),
            leasing_id,
        })
        .await
        .map(|_| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

define_error! {
    enum LeasingError {
        #[code = "LEASING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Leasing with the provided ID does not exist"]
        NotExists,

        #[code = "INVALID_DATE_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "End date cannot be before the start date"]
        InvalidDateRange,
    }
}

impl AsError for command::record_lease::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(api::car::CarError::NotExists.into()),
            Self::CustomerHistoryOverflow(_) => None,
            Self::CustomerNotExists(_) => {
                Some(api::customer::CustomerError::NotExists.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::InvalidDateRange { .. } => {
                Some(LeasingError::InvalidDateRange.into())
            }
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::Stock { source, .. } => source.try_as_error(),
        }
    }
}

impl AsError for command::update_leasing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(api::car::CarError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::InvalidDateRange { .. } => {
                Some(LeasingError::InvalidDateRange.into())
            }
            Self::LeasingNotExists(_) => Some(LeasingError::NotExists.into()),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::Stock { source, .. } => source.try_as_error(),
        }
    }
}

impl AsError for command::delete_leasing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::LeasingNotExists(_) => Some(LeasingError::NotExists.into()),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Date;
    use service::{
        command,
        domain::{car, customer, leasing, user},
    };

    use crate::AsError as _;

    use super::{CreateRequest, UpdateRequest};

    #[test]
    fn validates_lease_request() {
        let car_id = car::Id::new();
        let cmd = CreateRequest {
            customer_id: Some(customer::Id::new().to_string()),
            car_id: Some(car_id.to_string()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-10".into()),
        }
        .into_command(user::Id::new())
        .unwrap();
        assert_eq!(cmd.car_id, car_id);
        assert_eq!(cmd.end_date, "2024-01-10".parse::<Date>().unwrap());

        let err = CreateRequest {
            start_date: Some("2024-13-01".into()),
            ..CreateRequest::default()
        }
        .into_command(user::Id::new())
        .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.fields.len(), 4);
        assert_eq!(
            err.fields["start_date"],
            ["must be a date in YYYY-MM-DD format"],
        );
        assert_eq!(err.fields["end_date"], ["is required"]);
    }

    #[test]
    fn passes_returned_flag_through() {
        let cmd = UpdateRequest {
            start_date: None,
            end_date: Some("2024-01-05".into()),
            returned: Some(false),
        }
        .into_command(user::Id::new(), leasing::Id::new())
        .unwrap();

        assert!(cmd.start_date.is_none());
        assert!(cmd.end_date.is_some());
        assert_eq!(cmd.returned, Some(false));
    }

    #[test]
    fn maps_lease_errors() {
        use command::{
            record_lease::ExecutionError as RecordError,
            update_leasing::ExecutionError as UpdateError,
        };

        let date = |s: &str| s.parse::<Date>().unwrap();

        let err = RecordError::InvalidDateRange {
            start: date("2024-01-10"),
            end: date("2024-01-01"),
        }
        .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_DATE_RANGE");

        let err = UpdateError::Stock {
            car_id: car::Id::new(),
            source: car::StockError::InvalidState,
        }
        .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_STATE");

        let err = UpdateError::LeasingNotExists(leasing::Id::new()).as_error();
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }
}
