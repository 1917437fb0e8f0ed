//! [`Leasing`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        leasing::{self, Period},
        Leasing,
    },
    infra::{database, Database, Postgres},
};

/// Restores a [`Leasing`] from the provided [`Row`].
///
/// Rows violating the `end_date >= start_date` check are skipped.
fn from_row(row: &Row) -> Option<Leasing> {
    let period = Period::new(row.get("start_date"), row.get("end_date"))?;
    Some(Leasing::restore(
        row.get("id"),
        row.get("company_id"),
        row.get("customer_id"),
        row.get("car_id"),
        period,
        row.get("amount"),
        row.get("status"),
        row.get("created_at"),
    ))
}

impl<IDs> Database<Select<By<HashMap<leasing::Id, Leasing>, IDs>>>
    for Postgres
where
    IDs: AsRef<[leasing::Id]>,
{
    type Ok = HashMap<leasing::Id, Leasing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<leasing::Id, Leasing>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[leasing::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, company_id, customer_id, car_id, \
                   start_date, end_date, amount, status, \
                   created_at \
            FROM leasings \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .filter_map(from_row)
            .map(|l| (l.id, l))
            .collect())
    }
}

impl Database<Select<By<Option<Leasing>, leasing::Id>>> for Postgres {
    type Ok = Option<Leasing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Leasing>, leasing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::<HashMap<_, Leasing>, _>::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl Database<Insert<Leasing>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(leasing): Insert<Leasing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(leasing)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<Leasing>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(leasing): Update<Leasing>,
    ) -> Result<Self::Ok, Self::Err> {
        let period = leasing.period();

        const SQL: &str = "\
            INSERT INTO leasings (\
                id, company_id, customer_id, car_id, \
                start_date, end_date, amount, status, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::DATE, $6::DATE, $7::NUMERIC, $8::INT2, \
                $9::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET start_date = EXCLUDED.start_date, \
                end_date = EXCLUDED.end_date, \
                amount = EXCLUDED.amount, \
                status = EXCLUDED.status";
        self.exec(
            SQL,
            &[
                &leasing.id,
                &leasing.company_id,
                &leasing.customer_id,
                &leasing.car_id,
                &period.start(),
                &period.end(),
                &leasing.amount(),
                &leasing.status(),
                &leasing.created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl Database<Lock<By<Leasing, leasing::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Leasing, leasing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: leasing::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id FROM leasings WHERE id = $1::UUID FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Delete<By<Leasing, leasing::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Leasing, leasing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: leasing::Id = by.into_inner();

        const SQL: &str = "DELETE FROM leasings WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
