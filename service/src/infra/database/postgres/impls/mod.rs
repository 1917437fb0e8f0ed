//! [`Database`] implementations.

#![allow(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]
#![allow(clippy::too_many_lines, reason = "SQL-related code a bit verbose")]

mod car;
mod company;
mod customer;
mod leasing;
mod transaction;
mod user;

use async_trait::async_trait;
use common::{
    operations::{By, Commit, Select, Transact},
    pagination,
};
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tokio_postgres::{types::FromSql, Row};
use tracerr::Traced;

use crate::{
    infra::{database, postgres, Database, Postgres},
    read,
};

impl Database<Transact> for Postgres {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        if self.tx.is_some() {
            return Ok(self.clone());
        }
        self.begin().await.map_err(tracerr::wrap!())
    }
}

impl Database<Commit> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

/// Converts the `total_count` and `ids` columns of the provided [`Row`] into
/// a [`pagination::Page`].
fn page_from_row<I>(row: &Row) -> pagination::Page<I>
where
    I: for<'r> FromSql<'r>,
{
    let total_count: i64 = row.get("total_count");
    pagination::Page {
        items: row.get("ids"),
        total_count: u64::try_from(total_count).unwrap_or_default(),
    }
}

/// Converts pagination [`pagination::Arguments`] into `LIMIT` and `OFFSET`
/// values.
fn limit_offset(args: &pagination::Arguments) -> (i64, i64) {
    (
        i64::from(args.limit()),
        i64::try_from(args.offset()).unwrap_or(i64::MAX),
    )
}

/// Implements listing of the [`Company`]-owned rows of the provided table as
/// [`Page`]s of their IDs, newest first.
///
/// [`Company`]: crate::domain::Company
/// [`Page`]: pagination::Page
macro_rules! impl_list {
    ($read:ident, $table:literal) => {
        impl
            Database<
                Select<
                    By<read::$read::list::Page, read::$read::list::Selector>,
                >,
            > for Postgres
        {
            type Ok = read::$read::list::Page;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<
                    By<read::$read::list::Page, read::$read::list::Selector>,
                >,
            ) -> Result<Self::Ok, Self::Err> {
                let read::$read::list::Selector {
                    arguments,
                    filter: read::$read::list::Filter { company_id },
                } = by.into_inner();
                let (limit, offset) = limit_offset(&arguments);

                const SQL: &str = concat!(
                    "SELECT (SELECT COUNT(*) FROM ", $table, " ",
                            "WHERE company_id = $1::UUID) AS total_count, ",
                           "ARRAY(SELECT id FROM ", $table, " ",
                                 "WHERE company_id = $1::UUID ",
                                 "ORDER BY id DESC ",
                                 "LIMIT $2::INT8 OFFSET $3::INT8) AS ids",
                );
                let row = self
                    .query_one(SQL, &[&company_id, &limit, &offset])
                    .await
                    .map_err(tracerr::wrap!())?;
                Ok(page_from_row(&row))
            }
        }
    };
}

impl_list!(car, "cars");
impl_list!(customer, "customers");
impl_list!(transaction, "transactions");
impl_list!(leasing, "leasings");

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
