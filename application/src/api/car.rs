//! [`Car`]-related API definitions.

use std::num::NonZeroU32;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    routing::{get, post},
    Json, Router,
};
use common::{DateTime, Quantity};
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, car, user},
    query, read, Command as _,
};

use crate::{api, define_error, error::FieldErrors, AsError, Context, Error};

/// Builds the [`Router`] of the [`Car`] endpoints.
pub(super) fn router() -> Router {
    Router::new()
        .route("/cars", get(list).post(create))
        .route("/cars/:id", get(get_by_id).put(update).delete(delete))
        .route("/cars/:id/sell", post(sell))
        .route("/cars/:id/lease", post(lease))
}

/// Car model in the inventory of a company.
#[derive(Clone, Debug, Serialize)]
pub struct Car {
    /// ID of this [`Car`].
    pub id: car::Id,

    /// Human-readable description of this [`Car`].
    pub description: String,

    /// Brand of this [`Car`].
    pub brand: Option<String>,

    /// Model of this [`Car`].
    pub model: Option<String>,

    /// Production year of this [`Car`].
    pub year: Option<i32>,

    /// Color of this [`Car`].
    pub color: Option<String>,

    /// Engine of this [`Car`].
    pub engine: Option<String>,

    /// Additional information about this [`Car`].
    pub more_info: Option<String>,

    /// Number of units available for sale or lease.
    pub total_available: Quantity,

    /// Indicator whether at least one unit is available.
    pub in_stock: bool,

    /// Number of units currently leased, if any were ever leased.
    pub in_lease: Option<Quantity>,

    /// Number of units sold.
    pub sold_count: Quantity,

    /// [`DateTime`] when this [`Car`] was added.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,
}

impl From<domain::Car> for Car {
    fn from(car: domain::Car) -> Self {
        Self {
            id: car.id,
            description: car.description(),
            brand: car.brand.map(Into::into),
            model: car.model.map(Into::into),
            year: car.year.map(car::Year::get),
            color: car.color.map(Into::into),
            engine: car.engine.map(Into::into),
            more_info: car.more_info.map(Into::into),
            total_available: car.stock.total_available(),
            in_stock: car.stock.in_stock(),
            in_lease: car.stock.in_lease(),
            sold_count: car.stock.sold_count(),
            created_at: car.created_at.coerce(),
        }
    }
}

/// Body of a [`Car`] creation or update request.
///
/// Descriptive fields missing in an update request are cleared.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Request {
    /// Brand of the [`Car`].
    pub brand: Option<String>,

    /// Model of the [`Car`].
    pub model: Option<String>,

    /// Production year of the [`Car`].
    pub year: Option<i32>,

    /// Color of the [`Car`].
    pub color: Option<String>,

    /// Engine of the [`Car`].
    pub engine: Option<String>,

    /// Additional information about the [`Car`].
    pub more_info: Option<String>,

    /// Number of units available for sale or lease.
    pub total_available: Option<i32>,
}

/// Validated descriptive fields of a [`Request`].
struct Description {
    /// Brand of the [`Car`].
    brand: Option<car::Brand>,

    /// Model of the [`Car`].
    model: Option<car::Model>,

    /// Production year of the [`Car`].
    year: Option<car::Year>,

    /// Color of the [`Car`].
    color: Option<car::Color>,

    /// Engine of the [`Car`].
    engine: Option<car::Engine>,

    /// Additional information about the [`Car`].
    more_info: Option<car::Info>,
}

impl Request {
    /// Validates this [`Request`] as a [`command::CreateCar`].
    ///
    /// # Errors
    ///
    /// If any of the fields is invalid or `total_available` is missing.
    pub fn into_create(
        self,
        initiator_id: user::Id,
    ) -> Result<command::CreateCar, Error> {
        let mut errors = FieldErrors::default();
        let total_available = errors.required(
            "total_available",
            self.total_available.map(Quantity::new),
            "must be non-negative",
        );
        let Description {
            brand,
            model,
            year,
            color,
            engine,
            more_info,
        } = self.description(&mut errors);

        match total_available {
            Some(total_available) if errors.is_empty() => {
                Ok(command::CreateCar {
                    initiator_id,
                    brand,
                    model,
                    year,
                    color,
                    engine,
                    more_info,
                    total_available,
                })
            }
            _ => Err(errors.into()),
        }
    }

    /// Validates this [`Request`] as a [`command::UpdateCar`].
    ///
    /// # Errors
    ///
    /// If any of the provided fields is invalid.
    pub fn into_update(
        self,
        initiator_id: user::Id,
        car_id: car::Id,
    ) -> Result<command::UpdateCar, Error> {
        let mut errors = FieldErrors::default();
        let total_available = errors.optional(
            "total_available",
            self.total_available.map(Quantity::new),
            "must be non-negative",
        );
        let Description {
            brand,
            model,
            year,
            color,
            engine,
            more_info,
        } = self.description(&mut errors);

        errors.or_value(command::UpdateCar {
            initiator_id,
            car_id,
            brand,
            model,
            year,
            color,
            engine,
            more_info,
            total_available,
        })
    }

    /// Validates the descriptive fields of this [`Request`].
    fn description(self, errors: &mut FieldErrors) -> Description {
        let short = |max| {
            format!("must be 1 to {max} characters without extra spaces")
        };

        Description {
            brand: errors.optional(
                "brand",
                self.brand.map(car::Brand::new),
                &short(50),
            ),
            model: errors.optional(
                "model",
                self.model.map(car::Model::new),
                &short(50),
            ),
            year: errors.optional(
                "year",
                self.year.map(car::Year::new),
                "must be a realistic production year",
            ),
            color: errors.optional(
                "color",
                self.color.map(car::Color::new),
                &short(20),
            ),
            engine: errors.optional(
                "engine",
                self.engine.map(car::Engine::new),
                &short(20),
            ),
            more_info: errors.optional(
                "more_info",
                self.more_info.map(car::Info::new),
                "must be non-blank and at most 4096 characters",
            ),
        }
    }
}

/// Body of a [`Car`] sell or lease request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct QuantityRequest {
    /// Number of units to sell or lease.
    pub quantity: Option<i64>,
}

impl QuantityRequest {
    /// Validates the requested number of units.
    ///
    /// # Errors
    ///
    /// If the quantity is missing or not positive.
    pub fn quantity(self) -> Result<NonZeroU32, Error> {
        let mut errors = FieldErrors::default();
        errors
            .required(
                "quantity",
                self.quantity
                    .map(|q| u32::try_from(q).ok().and_then(NonZeroU32::new)),
                "must be a positive number",
            )
            .ok_or_else(|| errors.into())
    }
}

/// Lists [`Car`]s of the authenticated user's company.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "listCars", otel.name = api::SPAN_NAME),
)]
async fn list(
    ctx: Context,
    pagination: Result<Query<api::Pagination>, QueryRejection>,
) -> Result<api::Page<Car>, Error> {
    let Query(pagination) = pagination.map_err(AsError::into_error)?;
    let arguments = pagination.arguments()?;
    let company = api::owned_company(&ctx).await?;

    let page = ctx
        .service()
        .execute(query::cars::List::by(read::car::list::Selector {
            arguments,
            filter: read::car::list::Filter {
                company_id: company.id,
            },
        }))
        .await
        .map_err(AsError::into_error)?;
    let mut cars = ctx
        .service()
        .execute(query::cars::ByIds::by(page.items.clone()))
        .await
        .map_err(AsError::into_error)?;

    Ok(api::Page {
        total_count: page.total_count,
        items: page
            .items
            .iter()
            .filter_map(|id| cars.remove(id))
            .map(Into::into)
            .collect(),
    })
}

/// Adds a new [`Car`] to the authenticated user's company.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "createCar", otel.name = api::SPAN_NAME),
)]
async fn create(
    ctx: Context,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Car>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_create(ctx.user_id())?;

    let car = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(car.into())))
}

/// Returns the [`Car`] with the provided ID.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "getCar", otel.name = api::SPAN_NAME),
)]
async fn get_by_id(
    ctx: Context,
    id: Result<Path<car::Id>, PathRejection>,
) -> Result<Json<Car>, Error> {
    let Path(car_id) = id.map_err(AsError::into_error)?;
    let company = api::owned_company(&ctx).await?;

    ctx.service()
        .execute(query::car::ById::by(car_id))
        .await
        .map_err(AsError::into_error)?
        .filter(|c| c.company_id == company.id)
        .map(|c| Json(c.into()))
        .ok_or_else(|| CarError::NotExists.into())
}

/// Updates the [`Car`] with the provided ID.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "updateCar", otel.name = api::SPAN_NAME),
)]
async fn update(
    ctx: Context,
    id: Result<Path<car::Id>, PathRejection>,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<Json<Car>, Error> {
    let Path(car_id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_update(ctx.user_id(), car_id)?;

    ctx.service()
        .execute(cmd)
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`Car`] with the provided ID along with its sales and leases.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "deleteCar", otel.name = api::SPAN_NAME),
)]
async fn delete(
    ctx: Context,
    id: Result<Path<car::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    let Path(car_id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::DeleteCar {
            initiator_id: ctx.user_id(),
            car_id,
        })
        .await
        .map(|_| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

/// Takes the requested number of units of the [`Car`] as sold.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "sellCar", otel.name = api::SPAN_NAME),
)]
async fn sell(
    ctx: Context,
    id: Result<Path<car::Id>, PathRejection>,
    body: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<Car>, Error> {
    let Path(car_id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::SellCar {
            initiator_id: ctx.user_id(),
            car_id,
            quantity: req.quantity()?,
        })
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Takes the requested number of units of the [`Car`] into lease.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "leaseCar", otel.name = api::SPAN_NAME),
)]
async fn lease(
    ctx: Context,
    id: Result<Path<car::Id>, PathRejection>,
    body: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<Car>, Error> {
    let Path(car_id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::LeaseCar {
            initiator_id: ctx.user_id(),
            car_id,
            quantity: req.quantity()?,
        })
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

define_error! {
    enum CarError {
        #[code = "CAR_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Car with the provided ID does not exist"]
        NotExists,
    }
}

impl AsError for car::StockError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INSUFFICIENT_STOCK"]
                #[status = BAD_REQUEST]
                #[message = "Not enough cars available"]
                Insufficient,

                #[code = "INVALID_STATE"]
                #[status = BAD_REQUEST]
                #[message = "No leased cars to be returned"]
                InvalidState,
            }
        }

        let mut error: crate::Error = match self {
            Self::Insufficient { .. } => Error::Insufficient.into(),
            Self::InvalidState => Error::InvalidState.into(),
            Self::Overflow => return None,
        };
        error.message = self.to_string();
        Some(error)
    }
}

impl AsError for command::create_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

impl AsError for command::update_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(CarError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

impl AsError for command::delete_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(CarError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
        }
    }
}

impl AsError for command::sell_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(CarError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::Stock { source, .. } => source.try_as_error(),
        }
    }
}

impl AsError for command::lease_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(CarError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::Stock { source, .. } => source.try_as_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use common::Quantity;
    use service::{
        command,
        domain::{car, user},
    };

    use crate::AsError as _;

    use super::{QuantityRequest, Request};

    #[test]
    fn validates_creation() {
        let cmd = Request {
            brand: Some("Toyota".into()),
            model: Some("Corolla".into()),
            year: Some(2020),
            total_available: Some(5),
            ..Request::default()
        }
        .into_create(user::Id::new())
        .unwrap();

        assert_eq!(cmd.year.map(car::Year::get), Some(2020));
        assert_eq!(cmd.total_available, Quantity::new(5).unwrap());
        assert!(cmd.color.is_none());

        let err = Request {
            brand: Some(String::new()),
            year: Some(1500),
            total_available: Some(-1),
            ..Request::default()
        }
        .into_create(user::Id::new())
        .unwrap_err();

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            err.fields.keys().copied().collect::<Vec<_>>(),
            ["brand", "total_available", "year"],
        );
    }

    #[test]
    fn allows_omitting_total_on_update() {
        let cmd = Request::default()
            .into_update(user::Id::new(), car::Id::new())
            .unwrap();

        assert!(cmd.total_available.is_none());
        assert!(cmd.brand.is_none());
    }

    #[test]
    fn validates_quantity() {
        let ok = QuantityRequest { quantity: Some(3) }.quantity().unwrap();
        assert_eq!(ok, NonZeroU32::new(3).unwrap());

        for quantity in [None, Some(0), Some(-2), Some(i64::MAX)] {
            let err = QuantityRequest { quantity }.quantity().unwrap_err();
            assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
            assert!(err.fields.contains_key("quantity"));
        }
    }

    #[test]
    fn maps_stock_errors() {
        let err = command::sell_car::ExecutionError::Stock {
            car_id: car::Id::new(),
            source: car::StockError::Insufficient {
                requested: NonZeroU32::new(3).unwrap(),
                available: Quantity::new(2).unwrap(),
            },
        }
        .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INSUFFICIENT_STOCK");
        assert!(err.message.contains("requested 3"));

        let err = command::lease_car::ExecutionError::Stock {
            car_id: car::Id::new(),
            source: car::StockError::Overflow,
        }
        .as_error();
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn maps_missing_car() {
        let err =
            command::delete_car::ExecutionError::CarNotExists(car::Id::new())
                .as_error();

        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
        assert_eq!(err.code, "CAR_NOT_EXISTS");
    }
}
