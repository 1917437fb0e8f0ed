//! [`Transaction`]-related API definitions.

use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    routing::get,
    Json, Router,
};
use common::{Date, DateTime, Money};
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, car, customer, transaction, user},
    query, read, Command as _,
};

use crate::{api, define_error, error::FieldErrors, AsError, Context, Error};

/// Builds the [`Router`] of the [`Transaction`] endpoints.
pub(super) fn router() -> Router {
    Router::new()
        .route("/transactions", get(list).post(create))
        .route("/transactions/:id", get(get_by_id).put(update).delete(delete))
}

/// Sale of a car to a customer.
#[derive(Clone, Debug, Serialize)]
pub struct Transaction {
    /// ID of this [`Transaction`].
    pub id: transaction::Id,

    /// Unique receipt number of this [`Transaction`].
    pub receipt: String,

    /// Sale price.
    pub amount: Money,

    /// [`Date`] of the sale.
    pub date: Date,

    /// ID of the customer who bought the car.
    pub customer_id: customer::Id,

    /// ID of the sold car.
    pub car_id: car::Id,

    /// Customer who bought the car, if loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<api::customer::Customer>,

    /// Sold car, if loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car: Option<api::car::Car>,

    /// [`DateTime`] when this [`Transaction`] was recorded.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,
}

impl Transaction {
    /// Creates a new [`Transaction`] with its customer and car looked up in
    /// the provided maps.
    fn with_relations(
        transaction: domain::Transaction,
        customers: &HashMap<customer::Id, domain::Customer>,
        cars: &HashMap<car::Id, domain::Car>,
    ) -> Self {
        let customer = customers.get(&transaction.customer_id).cloned();
        let car = cars.get(&transaction.car_id).cloned();

        Self {
            customer: customer.map(Into::into),
            car: car.map(Into::into),
            ..transaction.into()
        }
    }
}

impl From<domain::Transaction> for Transaction {
    fn from(transaction: domain::Transaction) -> Self {
        Self {
            id: transaction.id,
            receipt: transaction.receipt.into(),
            amount: transaction.amount,
            date: transaction.date,
            customer_id: transaction.customer_id,
            car_id: transaction.car_id,
            customer: None,
            car: None,
            created_at: transaction.created_at.coerce(),
        }
    }
}

/// Body of a [`Transaction`] recording request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateRequest {
    /// ID of the customer buying the car.
    pub customer_id: Option<String>,

    /// ID of the car being sold.
    pub car_id: Option<String>,

    /// Sale price, either a number or a decimal string.
    pub amount: Option<serde_json::Value>,

    /// [`Date`] of the sale in `YYYY-MM-DD` format.
    pub date: Option<String>,
}

impl CreateRequest {
    /// Validates this [`CreateRequest`] as a [`command::RecordSale`].
    ///
    /// # Errors
    ///
    /// If any of the fields is missing or invalid.
    pub fn into_command(
        self,
        initiator_id: user::Id,
    ) -> Result<command::RecordSale, Error> {
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
        let amount = errors.required(
            "amount",
            self.amount.map(api::from_json),
            UpdateRequest::INVALID_AMOUNT,
        );
        let date = errors.required(
            "date",
            self.date.as_deref().map(api::parse),
            UpdateRequest::INVALID_DATE,
        );

        match (customer_id, car_id, amount, date) {
            (Some(customer_id), Some(car_id), Some(amount), Some(date)) => {
                Ok(command::RecordSale {
                    initiator_id,
                    customer_id,
                    car_id,
                    amount,
                    date,
                })
            }
            _ => Err(errors.into()),
        }
    }
}

/// Body of a [`Transaction`] update request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateRequest {
    /// New sale price, either a number or a decimal string.
    pub amount: Option<serde_json::Value>,

    /// New [`Date`] of the sale in `YYYY-MM-DD` format.
    pub date: Option<String>,
}

impl UpdateRequest {
    /// Message of an invalid amount.
    const INVALID_AMOUNT: &'static str =
        "must be a non-negative amount up to 999999999999.99 with at most \
         two fraction digits";

    /// Message of an invalid date.
    const INVALID_DATE: &'static str = "must be a date in YYYY-MM-DD format";

    /// Validates this [`UpdateRequest`] as a [`command::UpdateTransaction`].
    ///
    /// # Errors
    ///
    /// If any of the provided fields is invalid.
    pub fn into_command(
        self,
        initiator_id: user::Id,
        transaction_id: transaction::Id,
    ) -> Result<command::UpdateTransaction, Error> {
        let mut errors = FieldErrors::default();
        let amount = errors.optional(
            "amount",
            self.amount.map(api::from_json),
            Self::INVALID_AMOUNT,
        );
        let date = errors.optional(
            "date",
            self.date.as_deref().map(api::parse),
            Self::INVALID_DATE,
        );

        errors.or_value(command::UpdateTransaction {
            initiator_id,
            transaction_id,
            amount,
            date,
        })
    }
}

/// Lists [`Transaction`]s of the authenticated user's company along with
/// their customers and cars.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "listTransactions", otel.name = api::SPAN_NAME),
)]
async fn list(
    ctx: Context,
    pagination: Result<Query<api::Pagination>, QueryRejection>,
) -> Result<api::Page<Transaction>, Error> {
    let Query(pagination) = pagination.map_err(AsError::into_error)?;
    let arguments = pagination.arguments()?;
    let company = api::owned_company(&ctx).await?;

    let page = ctx
        .service()
        .execute(query::transactions::List::by(
            read::transaction::list::Selector {
                arguments,
                filter: read::transaction::list::Filter {
                    company_id: company.id,
                },
            },
        ))
        .await
        .map_err(AsError::into_error)?;
    let mut transactions = ctx
        .service()
        .execute(query::transactions::ByIds::by(page.items.clone()))
        .await
        .map_err(AsError::into_error)?;
    let transactions = page
        .items
        .iter()
        .filter_map(|id| transactions.remove(id))
        .collect::<Vec<_>>();

    let (customers, cars) = tokio::try_join!(
        ctx.service().execute(query::customers::ByIds::by(
            transactions.iter().map(|t| t.customer_id).unique().collect(),
        )),
        ctx.service().execute(query::cars::ByIds::by(
            transactions.iter().map(|t| t.car_id).unique().collect(),
        )),
    )
    .map_err(AsError::into_error)?;

    Ok(api::Page {
        total_count: page.total_count,
        items: transactions
            .into_iter()
            .map(|t| Transaction::with_relations(t, &customers, &cars))
            .collect(),
    })
}

/// Returns the [`Transaction`] with the provided ID along with its customer
/// and car.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "getTransaction", otel.name = api::SPAN_NAME),
)]
async fn get_by_id(
    ctx: Context,
    id: Result<Path<transaction::Id>, PathRejection>,
) -> Result<Json<Transaction>, Error> {
    let Path(transaction_id) = id.map_err(AsError::into_error)?;
    let company = api::owned_company(&ctx).await?;

    let transaction = ctx
        .service()
        .execute(query::transaction::ById::by(transaction_id))
        .await
        .map_err(AsError::into_error)?
        .filter(|e| e.company_id == company.id)
        .ok_or_else(|| Error::from(TransactionError::NotExists))?;

    let (customer, car) = tokio::try_join!(
        ctx.service()
            .execute(query::customer::ById::by(transaction.customer_id)),
        ctx.service().execute(query::car::ById::by(transaction.car_id)),
    )
    .map_err(AsError::into_error)?;

    Ok(Json(Transaction {
        customer: customer.map(Into::into),
        car: car.map(Into::into),
        ..transaction.into()
    }))
}

/// Records a sale of a single car unit to a customer.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "recordSale", otel.name = api::SPAN_NAME),
)]
async fn create(
    ctx: Context,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Transaction>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_command(ctx.user_id())?;

    let transaction = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(transaction.into())))
}

/// Updates the amount or the date of the [`Transaction`].
#[tracing::instrument(
    skip_all,
    fields(http.operation = "updateTransaction", otel.name = api::SPAN_NAME),
)]
async fn update(
    ctx: Context,
    id: Result<Path<transaction::Id>, PathRejection>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Transaction>, Error> {
    let Path(transaction_id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_command(ctx.user_id(), transaction_id)?;

    ctx.service()
        .execute(cmd)
        .await
        .map(|t| Json(t.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`Transaction`] with the provided ID.
#[tracing::instrument(
    skip_all,
    fields(http.operation = "deleteTransaction", otel.name = api::SPAN_NAME),
)]
async fn delete(
    ctx: Context,
    id: Result<Path<transaction::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    let Path(transaction_id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::DeleteTransaction {
            initiator_id: ctx.user_id(),
            transaction_id,
        })
        .await
        .map(|_| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

define_error! {
    enum TransactionError {
        #[code = "TRANSACTION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Transaction with the provided ID does not exist"]
        NotExists,

        #[code = "RECEIPT_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "Generated receipt number is already issued, retry"]
        ReceiptOccupied,
    }
}

impl AsError for command::record_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CarNotExists(_) => Some(api::car::CarError::NotExists.into()),
            Self::CustomerHistoryOverflow(_) => None,
            Self::CustomerNotExists(_) => {
                Some(api::customer::CustomerError::NotExists.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::ReceiptOccupied(_) => {
                Some(TransactionError::ReceiptOccupied.into())
            }
            Self::Stock { source, .. } => source.try_as_error(),
        }
    }
}

impl AsError for command::update_transaction::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::TransactionNotExists(_) => {
                Some(TransactionError::NotExists.into())
            }
        }
    }
}

impl AsError for command::delete_transaction::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotCompanyOwner(_) => {
                Some(api::PrivilegeError::NotCompanyOwner.into())
            }
            Self::TransactionNotExists(_) => {
                Some(TransactionError::NotExists.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use common::{Money, Quantity};
    use serde_json::json;
    use service::{
        command,
        domain::{car, customer, transaction, user},
    };

    use crate::AsError as _;

    use super::{CreateRequest, UpdateRequest};

    #[test]
    fn accepts_numeric_and_string_amounts() {
        let car_id = car::Id::new();
        let customer_id = customer::Id::new();

        for amount in [json!(15000), json!("15000.00")] {
            let cmd = CreateRequest {
                customer_id: Some(customer_id.to_string()),
                car_id: Some(car_id.to_string()),
                amount: Some(amount),
                date: Some("2024-01-05".into()),
            }
            .into_command(user::Id::new())
            .unwrap();

            assert_eq!(cmd.amount, Money::from_cents(1_500_000));
            assert_eq!(cmd.car_id, car_id);
            assert_eq!(cmd.date.to_string(), "2024-01-05");
        }
    }

    #[test]
    fn rejects_malformed_sale() {
        let err = CreateRequest {
            customer_id: Some("nope".into()),
            car_id: None,
            amount: Some(json!(-1)),
            date: Some("05.01.2024".into()),
        }
        .into_command(user::Id::new())
        .unwrap_err();

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            err.fields.keys().copied().collect::<Vec<_>>(),
            ["amount", "car_id", "customer_id", "date"],
        );
        assert_eq!(err.fields["car_id"], ["is required"]);
    }

    #[test]
    fn allows_partial_update() {
        let cmd = UpdateRequest {
            amount: None,
            date: Some("2024-02-29".into()),
        }
        .into_command(user::Id::new(), transaction::Id::new())
        .unwrap();

        assert!(cmd.amount.is_none());
        assert!(cmd.date.is_some());

        let err = UpdateRequest {
            amount: Some(json!("1.001")),
            date: None,
        }
        .into_command(user::Id::new(), transaction::Id::new())
        .unwrap_err();
        assert!(err.fields.contains_key("amount"));
    }

    #[test]
    fn rejects_amount_beyond_storage_precision() {
        let err = CreateRequest {
            customer_id: Some(customer::Id::new().to_string()),
            car_id: Some(car::Id::new().to_string()),
            amount: Some(json!("10000000000000.00")),
            date: Some("2024-01-05".into()),
        }
        .into_command(user::Id::new())
        .unwrap_err();

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.fields.keys().copied().collect::<Vec<_>>(), ["amount"]);
    }

    #[test]
    fn maps_sale_errors() {
        use command::record_sale::ExecutionError as E;

        let err = E::Stock {
            car_id: car::Id::new(),
            source: car::StockError::Insufficient {
                requested: NonZeroU32::MIN,
                available: Quantity::ZERO,
            },
        }
        .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);

        let err = E::CustomerNotExists(customer::Id::new()).as_error();
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);

        let err = E::NotCompanyOwner(user::Id::new()).as_error();
        assert_eq!(err.status_code, http::StatusCode::FORBIDDEN);

        let err = E::CustomerHistoryOverflow(customer::Id::new()).as_error();
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
