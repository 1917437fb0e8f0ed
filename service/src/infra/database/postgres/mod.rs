//! Postgres [`Database`] implementation.

mod connection;
mod impls;

use std::sync::Arc;

use deadpool_postgres::{Pool, Runtime};
use derive_more::{Display, Error as StdError, From};
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::{error::SqlState, types::ToSql, NoTls, Row};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

use self::connection::{Connection, Tx};

pub use deadpool_postgres::{Config, PoolConfig};
pub use refinery::embed_migrations;

/// Postgres [`Database`] client.
///
/// A [`Transact`]ed client runs all its statements in a single transaction,
/// which is rolled back if the client is dropped without a [`Commit`].
///
/// [`Commit`]: common::operations::Commit
/// [`Transact`]: common::operations::Transact
#[derive(Clone, Debug)]
pub struct Postgres {
    /// [`Pool`] of connections to the database.
    pool: Pool,

    /// Transaction this client operates in, if any.
    ///
    /// [`None`] inside the [`Mutex`] once the transaction is finished.
    tx: Option<Arc<Mutex<Option<Tx>>>>,
}

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new connection pool.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self { pool, tx: None })
    }

    /// Starts a new transaction on a pooled connection.
    async fn begin(&self) -> Result<Self, Traced<database::Error>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        let tx = Tx::begin(client).await.map_err(tracerr::wrap!())?;
        Ok(Self {
            pool: self.pool.clone(),
            tx: Some(Arc::new(Mutex::new(Some(tx)))),
        })
    }

    /// Commits the transaction of this client, if any.
    async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        let tx = tx
            .lock()
            .await
            .take()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        tx.commit().await.map_err(tracerr::wrap!())
    }

    /// Returns the [`Connection`] statements of this client should run on.
    async fn connection(
        &self,
    ) -> Result<Connection<'_>, Traced<database::Error>> {
        if let Some(tx) = &self.tx {
            MutexGuard::try_map(tx.lock().await, Option::as_mut)
                .map(Connection::Tx)
                .map_err(|_| {
                    tracerr::new!(database::Error::from(Error::TxFinished))
                })
        } else {
            self.pool
                .get()
                .await
                .map(Connection::Pooled)
                .map_err(tracerr::from_and_wrap!(=> Error))
                .map_err(tracerr::map_from)
        }
    }

    /// Queries the provided statement and returns the resulting rows.
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(sql, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }

    /// Queries the provided statement and returns exactly one resulting row.
    async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Row, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_one(sql, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }

    /// Executes the provided statement and returns the number of affected
    /// rows.
    async fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .execute(sql, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement execution error.
    #[display("Statement failed: {_0}")]
    Connection(tokio_postgres::Error),

    /// Error of creating a new connection [`Pool`].
    #[display("Failed to create a new connection `Pool`: {_0}")]
    PoolCreation(deadpool_postgres::CreatePoolError),

    /// Error of retrieving a connection from the [`Pool`].
    #[display("Connection `Pool` error: {_0}")]
    Pool(deadpool_postgres::PoolError),

    /// Transaction is used after being committed.
    #[display("Transaction is already finished")]
    TxFinished,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::UNIQUE_VIOLATION)
                    && constraint.map_or(true, |c| {
                        e.as_db_error().and_then(|e| e.constraint()) == Some(c)
                    })
            }
            Self::Pool(..) | Self::PoolCreation(..) | Self::TxFinished => {
                false
            }
        }
    }
}
