//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// The same trait describes commands, queries and database operations, the
/// `Args` type selects which one is executed.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
