//! In-memory [`Database`] implementation.
//!
//! Mirrors the guarantees of the Postgres schema the [`Service`] relies on:
//! row locks held until the end of a transaction, unique constraints and
//! cascading deletes of the dependent records.
//!
//! [`Service`]: crate::Service

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use derive_more::{Display, Error as StdError};
use itertools::Itertools as _;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracerr::Traced;
use uuid::Uuid;

use crate::{
    domain::{
        car, company, customer, leasing, transaction, user, Car, Company,
        Customer, Leasing, Transaction, User,
    },
    infra::{
        database::{
            self, COMPANY_NAME_CONSTRAINT, COMPANY_OWNER_CONSTRAINT,
            RECEIPT_CONSTRAINT,
        },
        Database,
    },
    read,
};

/// In-memory [`Database`] client.
///
/// Clones share the same storage. A [`Transact`]ed client buffers its writes
/// until [`Commit`], dropping it discards them and releases its locks.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Shared storage of this [`Memory`] client.
    storage: Arc<Storage>,

    /// Transaction this [`Memory`] client operates in, if any.
    tx: Option<Arc<Tx>>,
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the provided function upon the [`State`] as seen by this client.
    fn view<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let state = lock(&self.storage.state);
        match &self.tx {
            Some(tx) => {
                let changes = lock(&tx.changes);
                if changes.is_empty() {
                    f(&state)
                } else {
                    let mut merged = state.clone();
                    changes.apply_to(&mut merged);
                    f(&merged)
                }
            }
            None => f(&state),
        }
    }

    /// Writes the provided [`Change`] either into the current transaction, or
    /// directly into the storage.
    fn write(&self, change: Change) -> Result<(), Traced<database::Error>> {
        let mut state = lock(&self.storage.state);

        let mut candidate = state.clone();
        if let Some(tx) = &self.tx {
            let mut changes = lock(&tx.changes);
            changes.apply_to(&mut candidate);
            change.clone().apply_to(&mut candidate);
            candidate
                .validate()
                .map_err(tracerr::from_and_wrap!(=> database::Error))?;
            changes.push(change);
        } else {
            change.apply_to(&mut candidate);
            candidate
                .validate()
                .map_err(tracerr::from_and_wrap!(=> database::Error))?;
            *state = candidate;
        }
        Ok(())
    }

    /// Locks the row with the provided `id` until the end of the current
    /// transaction.
    ///
    /// No-op outside a transaction.
    async fn lock_row(&self, id: Uuid) {
        let Some(tx) = &self.tx else {
            return;
        };

        let mut guards = tx.guards.lock().await;
        if guards.contains_key(&id) {
            return;
        }
        let row = Arc::clone(
            lock(&self.storage.locks).entry(id).or_default(),
        );
        let guard = RowGuard {
            id,
            guard: Some(row.lock_owned().await),
            storage: Arc::clone(&self.storage),
        };
        drop(guards.insert(id, guard));
    }
}

/// Shared storage of [`Memory`] clients.
#[derive(Debug, Default)]
struct Storage {
    /// Committed [`State`].
    state: Mutex<State>,

    /// Row locks by the IDs of the locked rows.
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Transaction of a [`Memory`] client.
#[derive(Debug, Default)]
struct Tx {
    /// Writes buffered until [`Commit`].
    changes: Mutex<Changes>,

    /// Row locks held by this transaction.
    guards: AsyncMutex<HashMap<Uuid, RowGuard>>,
}

/// Row lock held by a [`Tx`].
///
/// Releasing the last lock of a row removes it from the [`Storage`].
#[derive(Debug)]
struct RowGuard {
    /// ID of the locked row.
    id: Uuid,

    /// Guard of the row lock, taken only on drop.
    guard: Option<OwnedMutexGuard<()>>,

    /// [`Storage`] the row lock is registered in.
    storage: Arc<Storage>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = lock(&self.storage.locks);
        let unused = locks
            .get(&self.id)
            .is_some_and(|row| Arc::strong_count(row) == 1);
        if unused {
            drop(locks.remove(&self.id));
        }
    }
}

/// Snapshot of all the stored rows.
#[derive(Clone, Debug, Default)]
struct State {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Company`]s.
    companies: HashMap<company::Id, Company>,

    /// Stored [`Car`]s.
    cars: HashMap<car::Id, Car>,

    /// Stored [`Customer`]s.
    customers: HashMap<customer::Id, Customer>,

    /// Stored [`Transaction`]s.
    transactions: HashMap<transaction::Id, Transaction>,

    /// Stored [`Leasing`]s.
    leasings: HashMap<leasing::Id, Leasing>,
}

impl State {
    /// Removes the records referring to the removed rows.
    fn cascade(&mut self) {
        let Self {
            companies,
            cars,
            customers,
            transactions,
            leasings,
            ..
        } = self;

        cars.retain(|_, c| companies.contains_key(&c.company_id));
        customers.retain(|_, c| companies.contains_key(&c.company_id));
        transactions.retain(|_, t| {
            cars.contains_key(&t.car_id)
                && customers.contains_key(&t.customer_id)
        });
        leasings.retain(|_, l| {
            cars.contains_key(&l.car_id)
                && customers.contains_key(&l.customer_id)
        });
    }

    /// Checks the unique constraints.
    fn validate(&self) -> Result<(), Error> {
        let unique = |constraint, mut keys: Vec<String>| {
            let total = keys.len();
            keys.sort_unstable();
            keys.dedup();
            if keys.len() == total {
                Ok(())
            } else {
                Err(Error::UniqueViolation(constraint))
            }
        };

        unique(
            COMPANY_NAME_CONSTRAINT,
            self.companies.values().map(|c| c.name.to_string()).collect(),
        )?;
        unique(
            COMPANY_OWNER_CONSTRAINT,
            self.companies
                .values()
                .map(|c| c.owner_id.to_string())
                .collect(),
        )?;
        unique(
            RECEIPT_CONSTRAINT,
            self.transactions
                .values()
                .map(|t| t.receipt.to_string())
                .collect(),
        )
    }
}

/// Single write into a [`State`].
#[derive(Clone, Debug)]
enum Change {
    /// [`User`] is inserted or updated.
    User(User),

    /// [`Company`] is inserted or updated.
    Company(Company),

    /// [`Car`] is inserted or updated.
    Car(Car),

    /// [`Car`] is deleted.
    CarDeleted(car::Id),

    /// [`Customer`] is inserted or updated.
    Customer(Customer),

    /// [`Customer`] is deleted.
    CustomerDeleted(customer::Id),

    /// [`Transaction`] is inserted or updated.
    Transaction(Transaction),

    /// [`Transaction`] is deleted.
    TransactionDeleted(transaction::Id),

    /// [`Leasing`] is inserted or updated.
    Leasing(Leasing),

    /// [`Leasing`] is deleted.
    LeasingDeleted(leasing::Id),
}

impl Change {
    /// Applies this [`Change`] to the provided [`State`].
    fn apply_to(self, state: &mut State) {
        match self {
            Self::User(u) => upsert(&mut state.users, u.id, u),
            Self::Company(c) => upsert(&mut state.companies, c.id, c),
            Self::Car(c) => upsert(&mut state.cars, c.id, c),
            Self::CarDeleted(id) => drop(state.cars.remove(&id)),
            Self::Customer(c) => upsert(&mut state.customers, c.id, c),
            Self::CustomerDeleted(id) => drop(state.customers.remove(&id)),
            Self::Transaction(t) => upsert(&mut state.transactions, t.id, t),
            Self::TransactionDeleted(id) => {
                drop(state.transactions.remove(&id));
            }
            Self::Leasing(l) => upsert(&mut state.leasings, l.id, l),
            Self::LeasingDeleted(id) => drop(state.leasings.remove(&id)),
        }
        state.cascade();
    }
}

/// Ordered log of [`Change`]s buffered by a [`Tx`].
#[derive(Debug, Default)]
struct Changes(Vec<Change>);

impl Changes {
    /// Indicates whether nothing has been written yet.
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends the provided [`Change`].
    fn push(&mut self, change: Change) {
        self.0.push(change);
    }

    /// Applies all the buffered [`Change`]s to the provided [`State`].
    fn apply_to(&self, state: &mut State) {
        for change in &self.0 {
            change.clone().apply_to(state);
        }
    }
}

/// Inserts or replaces the `row` in the provided `table`.
fn upsert<K: Eq + Hash, V>(table: &mut HashMap<K, V>, id: K, row: V) {
    drop(table.insert(id, row));
}

/// Locks the provided [`Mutex`], ignoring its poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
        }
    }
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Self {
            storage: Arc::clone(&self.storage),
            tx: Some(self.tx.clone().unwrap_or_default()),
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        {
            let mut state = lock(&self.storage.state);
            let mut changes = lock(&tx.changes);

            let mut committed = state.clone();
            changes.apply_to(&mut committed);
            committed
                .validate()
                .map_err(tracerr::from_and_wrap!(=> database::Error))?;

            *state = committed;
            *changes = Changes::default();
        }

        tx.guards.lock().await.clear();
        Ok(())
    }
}

/// Implements the [`Database`] operations common for all the stored entities.
macro_rules! impl_entity {
    ($entity:ident, $id:ty, $table:ident) => {
        impl<IDs> Database<Select<By<HashMap<$id, $entity>, IDs>>> for Memory
        where
            IDs: AsRef<[$id]>,
        {
            type Ok = HashMap<$id, $entity>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<HashMap<$id, $entity>, IDs>>,
            ) -> Result<Self::Ok, Self::Err> {
                let ids = by.into_inner();
                Ok(self.view(|s| {
                    ids.as_ref()
                        .iter()
                        .filter_map(|id| s.$table.get(id))
                        .map(|row| (row.id, row.clone()))
                        .collect()
                }))
            }
        }

        impl Database<Select<By<Option<$entity>, $id>>> for Memory {
            type Ok = Option<$entity>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<Option<$entity>, $id>>,
            ) -> Result<Self::Ok, Self::Err> {
                let id = by.into_inner();
                Ok(self.view(|s| s.$table.get(&id).cloned()))
            }
        }

        impl Database<Insert<$entity>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Insert(row): Insert<$entity>,
            ) -> Result<Self::Ok, Self::Err> {
                self.write(Change::$entity(row)).map_err(tracerr::wrap!())
            }
        }

        impl Database<Update<$entity>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Update(row): Update<$entity>,
            ) -> Result<Self::Ok, Self::Err> {
                self.write(Change::$entity(row)).map_err(tracerr::wrap!())
            }
        }

        impl Database<Lock<By<$entity, $id>>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Lock(by): Lock<By<$entity, $id>>,
            ) -> Result<Self::Ok, Self::Err> {
                self.lock_row(by.into_inner().into()).await;
                Ok(())
            }
        }
    };
}

/// Implements the [`Database`] operations of the [`Company`]-owned entities.
macro_rules! impl_owned_entity {
    ($entity:ident, $id:ty, $table:ident, $deleted:ident, $read:ident) => {
        impl_entity!($entity, $id, $table);

        impl Database<Delete<By<$entity, $id>>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Delete(by): Delete<By<$entity, $id>>,
            ) -> Result<Self::Ok, Self::Err> {
                self.write(Change::$deleted(by.into_inner()))
                    .map_err(tracerr::wrap!())
            }
        }

        impl
            Database<
                Select<
                    By<read::$read::list::Page, read::$read::list::Selector>,
                >,
            > for Memory
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

                let ids = self.view(|s| {
                    s.$table
                        .values()
                        .filter(|row| row.company_id == company_id)
                        .map(|row| row.id)
                        .sorted_unstable_by(|a, b| b.cmp(a))
                        .collect::<Vec<_>>()
                });
                Ok(read::$read::list::Page::slice(&arguments, ids))
            }
        }
    };
}

impl_entity!(User, user::Id, users);
impl_entity!(Company, company::Id, companies);
impl_owned_entity!(Car, car::Id, cars, CarDeleted, car);
impl_owned_entity!(
    Customer,
    customer::Id,
    customers,
    CustomerDeleted,
    customer
);
impl_owned_entity!(
    Transaction,
    transaction::Id,
    transactions,
    TransactionDeleted,
    transaction
);
impl_owned_entity!(Leasing, leasing::Id, leasings, LeasingDeleted, leasing);

impl Database<Select<By<Option<Company>, user::Id>>> for Memory {
    type Ok = Option<Company>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Company>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let owner_id = by.into_inner();
        Ok(self.view(|s| {
            s.companies.values().find(|c| c.owner_id == owner_id).cloned()
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{pin::pin, time::Duration};

    use common::{
        operations::{By, Commit, Delete, Insert, Lock, Select, Transact},
        DateTimeOf,
    };
    use tokio::time;

    use crate::{
        domain::{car, company, user, Car, Company, User},
        infra::Database,
    };

    use super::Memory;

    fn user() -> User {
        User {
            id: user::Id::new(),
            name: user::Name::new("Owner").unwrap(),
            created_at: DateTimeOf::now(),
        }
    }

    fn company(name: &str, owner_id: user::Id) -> Company {
        Company::new(company::Name::new(name).unwrap(), None, owner_id)
    }

    #[tokio::test]
    async fn discards_uncommitted_writes() {
        let db = Memory::new();
        let user = user();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(user.clone())).await.unwrap();
        assert!(tx
            .execute(Select(By::<Option<User>, _>::new(user.id)))
            .await
            .unwrap()
            .is_some());
        drop(tx);

        assert!(db
            .execute(Select(By::<Option<User>, _>::new(user.id)))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn applies_committed_writes() {
        let db = Memory::new();
        let owner = user();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(company("Acme", owner.id))).await.unwrap();
        tx.execute(Commit).await.unwrap();

        let found = db
            .execute(Select(By::<Option<Company>, _>::new(owner.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name.to_string(), "Acme");
    }

    #[tokio::test]
    async fn enforces_unique_constraints() {
        let db = Memory::new();

        db.execute(Insert(company("Acme", user::Id::new())))
            .await
            .unwrap();
        let err = db
            .execute(Insert(company("Acme", user::Id::new())))
            .await
            .unwrap_err();
        assert!(err
            .as_ref()
            .is_unique_violation(Some(super::COMPANY_NAME_CONSTRAINT)));

        let owner_id = user::Id::new();
        db.execute(Insert(company("First", owner_id))).await.unwrap();
        let err = db
            .execute(Insert(company("Second", owner_id)))
            .await
            .unwrap_err();
        assert!(err
            .as_ref()
            .is_unique_violation(Some(super::COMPANY_OWNER_CONSTRAINT)));
    }

    #[tokio::test]
    async fn deleting_missing_row_is_noop() {
        let db = Memory::new();
        let owner = user();
        let acme = company("Acme", owner.id);
        db.execute(Insert(acme.clone())).await.unwrap();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Delete(By::<Car, _>::new(car::Id::new())))
            .await
            .unwrap();
        tx.execute(Commit).await.unwrap();

        assert!(db
            .execute(Select(By::<Option<Company>, _>::new(acme.id)))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn holds_row_locks_until_commit() {
        let db = Memory::new();
        let car_id = car::Id::new();

        let first = db.execute(Transact).await.unwrap();
        first.execute(Lock(By::<Car, _>::new(car_id))).await.unwrap();

        let second = db.execute(Transact).await.unwrap();
        {
            let mut waiting =
                pin!(second.execute(Lock(By::<Car, _>::new(car_id))));
            assert!(
                time::timeout(Duration::from_millis(50), &mut waiting)
                    .await
                    .is_err(),
                "row is locked twice",
            );

            first.execute(Commit).await.unwrap();
            time::timeout(Duration::from_secs(1), waiting)
                .await
                .unwrap()
                .unwrap();
        }
        assert_eq!(super::lock(&db.storage.locks).len(), 1);

        drop(second);
        assert!(super::lock(&db.storage.locks).is_empty());
    }
}
