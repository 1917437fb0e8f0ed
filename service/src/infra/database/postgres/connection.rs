//! Postgres [`Connection`] definitions.

use std::fmt;

use deadpool_postgres::{Object, Transaction};
use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio::sync::MappedMutexGuard;
use tokio_postgres::{types::ToSql, Row};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

/// Connection to run statements on.
pub(super) enum Connection<'a> {
    /// Connection taken from the pool for a single statement.
    Pooled(Object),

    /// Exclusively borrowed transaction of a client.
    Tx(MappedMutexGuard<'a, Tx>),
}

/// Forwards the call to either the pooled client or the transaction.
macro_rules! forward {
    ($conn:expr, $method:ident($($arg:expr),*)) => {
        match $conn {
            Connection::Pooled(client) => client.$method($($arg),*).await,
            Connection::Tx(tx) => tx.get().$method($($arg),*).await,
        }
    };
}

impl Connection<'_> {
    /// Queries the provided statement and returns the resulting rows.
    pub(super) async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, tokio_postgres::Error> {
        forward!(self, query(sql, params))
    }

    /// Queries the provided statement and returns exactly one resulting row.
    pub(super) async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Row, tokio_postgres::Error> {
        forward!(self, query_one(sql, params))
    }

    /// Executes the provided statement and returns the number of affected
    /// rows.
    pub(super) async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, tokio_postgres::Error> {
        forward!(self, execute(sql, params))
    }
}

/// Transaction owning the pooled connection it runs on.
#[self_referencing]
pub(super) struct Tx {
    /// Pooled connection the transaction runs on.
    client: Object,

    /// Transaction started on the `client`.
    #[borrows(mut client)]
    #[not_covariant]
    tx: Option<Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_tx(|tx| {
            f.debug_struct("Tx")
                .field("finished", &tx.is_none())
                .finish_non_exhaustive()
        })
    }
}

impl Tx {
    /// Starts a new [`Tx`] on the provided pooled connection.
    pub(super) async fn begin(
        client: Object,
    ) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(client, |c| {
            c.transaction().map_ok(Some).boxed()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
    }

    /// Returns the underlying [`Transaction`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    fn get(&self) -> &Transaction<'_> {
        self.with_tx(|tx| tx.as_ref().expect("taken only on commit"))
    }

    /// Commits this [`Tx`], returning its connection to the pool.
    pub(super) async fn commit(
        mut self,
    ) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        let tx = self.with_tx_mut(|tx| tx.take());
        match tx {
            Some(tx) => tx
                .commit()
                .await
                .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                .map_err(tracerr::map_from),
            None => Err(tracerr::new!(database::Error::from(
                postgres::Error::TxFinished
            ))),
        }
    }
}
