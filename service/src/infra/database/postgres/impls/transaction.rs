//! [`Transaction`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{transaction, Transaction},
    infra::{database, Database, Postgres},
};

impl<IDs> Database<Select<By<HashMap<transaction::Id, Transaction>, IDs>>>
    for Postgres
where
    IDs: AsRef<[transaction::Id]>,
{
    type Ok = HashMap<transaction::Id, Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<transaction::Id, Transaction>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[transaction::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, company_id, customer_id, car_id, \
                   amount, date, receipt, \
                   created_at \
            FROM transactions \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Transaction {
                        id,
                        company_id: row.get("company_id"),
                        customer_id: row.get("customer_id"),
                        car_id: row.get("car_id"),
                        amount: row.get("amount"),
                        date: row.get("date"),
                        receipt: row.get("receipt"),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl Database<Select<By<Option<Transaction>, transaction::Id>>> for Postgres {
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::<HashMap<_, Transaction>, _>::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl Database<Insert<Transaction>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(transaction): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(transaction))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Database<Update<Transaction>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(transaction): Update<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        let Transaction {
            id,
            company_id,
            customer_id,
            car_id,
            amount,
            date,
            receipt,
            created_at,
        } = transaction;

        const SQL: &str = "\
            INSERT INTO transactions (\
                id, company_id, customer_id, car_id, \
                amount, date, receipt, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::NUMERIC, $6::DATE, $7::VARCHAR, \
                $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET amount = EXCLUDED.amount, \
                date = EXCLUDED.date";
        self.exec(
            SQL,
            &[
                &id,
                &company_id,
                &customer_id,
                &car_id,
                &amount,
                &date,
                &receipt,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl Database<Lock<By<Transaction, transaction::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Transaction, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: transaction::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id FROM transactions WHERE id = $1::UUID FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Delete<By<Transaction, transaction::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Transaction, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: transaction::Id = by.into_inner();

        const SQL: &str = "DELETE FROM transactions WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
