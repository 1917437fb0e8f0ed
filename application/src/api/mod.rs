//! REST API definitions.

pub mod car;
pub mod company;
pub mod customer;
pub mod leasing;
pub mod transaction;

use std::str::FromStr;

use axum::{
    response::{IntoResponse, Response},
    Json, Router,
};
use common::pagination::{self, MAX_PAGE_SIZE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use service::{domain, query, Query as _};

use crate::{define_error, error::FieldErrors, AsError, Context, Error};

/// Name of the [`tracing::Span`] for the API operations.
const SPAN_NAME: &str = "REST API operation";

/// Builds the [`Router`] serving all the API endpoints under `/api`.
#[must_use]
pub fn router() -> Router {
    Router::new().nest(
        "/api",
        Router::new()
            .merge(company::router())
            .merge(customer::router())
            .merge(car::router())
            .merge(transaction::router())
            .merge(leasing::router()),
    )
}

/// Pagination parameters of a list request.
///
/// Pages are numbered from `1`.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Pagination {
    /// Number of the requested page.
    pub page: Option<u32>,

    /// Number of items on a page.
    pub page_size: Option<u32>,
}

impl Pagination {
    /// Converts this [`Pagination`] into [`pagination::Arguments`].
    ///
    /// # Errors
    ///
    /// If the `page` is zero or the `page_size` is out of range.
    pub fn arguments(self) -> Result<pagination::Arguments, Error> {
        let mut errors = FieldErrors::default();
        if self.page == Some(0) {
            errors.add("page", "must be at least 1");
        }
        if self
            .page_size
            .is_some_and(|s| !(1..=MAX_PAGE_SIZE).contains(&s))
        {
            errors.add(
                "page_size",
                format!("must be within 1..={MAX_PAGE_SIZE}"),
            );
        }

        pagination::Arguments::new(self.page, self.page_size)
            .filter(|_| errors.is_empty())
            .ok_or_else(|| errors.into())
    }
}

/// Page of a list response.
///
/// Responds with `204 No Content` if there are no items on the page.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    /// Total number of items across all the pages.
    pub total_count: u64,

    /// Items on this [`Page`].
    pub items: Vec<T>,
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        if self.items.is_empty() {
            http::StatusCode::NO_CONTENT.into_response()
        } else {
            Json(self).into_response()
        }
    }
}

/// Returns the [`domain::Company`] owned by the authenticated user.
///
/// # Errors
///
/// If the user doesn't own a [`domain::Company`].
async fn owned_company(ctx: &Context) -> Result<domain::Company, Error> {
    ctx.service()
        .execute(query::company::ByOwner::by(ctx.user_id()))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| PrivilegeError::NotCompanyOwner.into())
}

/// Parses the provided textual `value` of a request field.
fn parse<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

/// Parses the provided JSON `value` of a request field.
fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_COMPANY_OWNER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user doesn't own a company"]
        NotCompanyOwner,
    }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn validates_pagination() {
        let args = Pagination::default().arguments().unwrap();
        assert_eq!(args.page(), 1);
        assert_eq!(args.limit(), 10);

        let args = Pagination {
            page: Some(3),
            page_size: Some(25),
        }
        .arguments()
        .unwrap();
        assert_eq!(args.offset(), 50);

        let err = Pagination {
            page: Some(0),
            page_size: Some(101),
        }
        .arguments()
        .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.fields["page"], ["must be at least 1"]);
        assert_eq!(err.fields["page_size"], ["must be within 1..=100"]);
    }
}
