//! [`Command`] for recording a new [`Transaction`].

use std::num::NonZeroU32;

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    Date, DateTimeOf, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{
        car, customer,
        transaction::{self, Receipt},
        user, Car, Company, Customer, Transaction,
    },
    infra::{
        database::{self, RECEIPT_CONSTRAINT},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for recording a sale of a single [`Car`] unit to a
/// [`Customer`].
///
/// Takes the unit from the [`car::Stock`], issues a new [`Receipt`] and
/// records the purchase in the [`Customer`]'s history, all at once.
#[derive(Clone, Debug)]
pub struct RecordSale {
    /// ID of the [`User`] owning the [`Company`].
    pub initiator_id: user::Id,

    /// ID of the [`Customer`] buying the [`Car`].
    pub customer_id: customer::Id,

    /// ID of the [`Car`] being sold.
    pub car_id: car::Id,

    /// Sale price.
    pub amount: Money,

    /// [`Date`] of the sale.
    pub date: Date,
}

impl<Db> Command<RecordSale> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Company>, user::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Car, car::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Customer, customer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Customer>, customer::Id>>,
            Ok = Option<Customer>,
            Err = Traced<database::Error>,
        > + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Update<Customer>, Err = Traced<database::Error>>
        + Database<Insert<Transaction>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Transaction;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RecordSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RecordSale {
            initiator_id,
            customer_id,
            car_id,
            amount,
            date,
        } = cmd;

        let company = self
            .database()
            .execute(Select(By::<Option<Company>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotCompanyOwner(initiator_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Always `Car` first, then `Customer`, to avoid deadlocks.
        tx.execute(Lock(By::<Car, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Customer, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        let mut customer = tx
            .execute(Select(By::<Option<Customer>, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.company_id == company.id)
            .ok_or(E::CustomerNotExists(customer_id))
            .map_err(tracerr::wrap!())?;

        car.stock
            .sell(NonZeroU32::MIN)
            .map_err(|source| tracerr::new!(E::Stock { car_id, source }))?;

        let transaction = Transaction {
            id: transaction::Id::new(),
            company_id: company.id,
            customer_id,
            car_id,
            amount,
            date,
            receipt: Receipt::generate(),
            created_at: DateTimeOf::now(),
        };

        customer.record_purchase(&car).map_err(|_| {
            tracerr::new!(E::CustomerHistoryOverflow(customer_id))
        })?;

        let occupied = |e: Traced<database::Error>| {
            if e.as_ref().is_unique_violation(Some(RECEIPT_CONSTRAINT)) {
                tracerr::new!(E::ReceiptOccupied(transaction.receipt.clone()))
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            }
        };
        tx.execute(Update(car))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(transaction.clone()))
            .await
            .map_err(occupied)
            .map(drop)?;
        tx.execute(Update(customer))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit).await.map_err(occupied).map(drop)?;

        tracing::debug!(
            transaction_id = %transaction.id,
            receipt = %transaction.receipt,
            "sale recorded",
        );

        Ok(transaction)
    }
}

/// Error of [`RecordSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] with the provided ID does not exist in the [`Company`].
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`Customer`] purchases counter overflowed.
    #[display("`Customer(id: {_0})` purchases counter overflow")]
    CustomerHistoryOverflow(#[error(not(source))] customer::Id),

    /// [`Customer`] with the provided ID does not exist in the [`Company`].
    #[display("`Customer(id: {_0})` does not exist")]
    CustomerNotExists(#[error(not(source))] customer::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] doesn't own a [`Company`].
    #[display("`User(id: {_0})` doesn't own a `Company`")]
    NotCompanyOwner(#[error(not(source))] user::Id),

    /// Generated [`Receipt`] is already issued for another [`Transaction`].
    #[display("`Transaction(receipt: {_0})` already exists")]
    ReceiptOccupied(#[error(not(source))] Receipt),

    /// [`car::Stock`] of the [`Car`] doesn't allow the sale.
    #[display("`Car(id: {car_id})` cannot be sold: {source}")]
    Stock {
        /// ID of the [`Car`].
        car_id: car::Id,

        /// [`car::StockError`] preventing the sale.
        source: car::StockError,
    },
}
