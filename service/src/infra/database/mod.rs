//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Name of the unique constraint on [`Company`] names.
///
/// [`Company`]: crate::domain::Company
pub const COMPANY_NAME_CONSTRAINT: &str = "companies_name_key";

/// Name of the unique constraint allowing a single [`Company`] per owner.
///
/// [`Company`]: crate::domain::Company
pub const COMPANY_OWNER_CONSTRAINT: &str = "companies_owner_id_key";

/// Name of the unique constraint on [`Transaction`] receipts.
///
/// [`Transaction`]: crate::domain::Transaction
pub const RECEIPT_CONSTRAINT: &str = "transactions_receipt_key";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    ///
    /// Any unique violation matches if no `constraint` is specified.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }
}
