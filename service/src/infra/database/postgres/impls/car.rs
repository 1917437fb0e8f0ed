//! [`Car`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        car::{self, Stock},
        Car,
    },
    infra::{database, Database, Postgres},
};

impl<IDs> Database<Select<By<HashMap<car::Id, Car>, IDs>>> for Postgres
where
    IDs: AsRef<[car::Id]>,
{
    type Ok = HashMap<car::Id, Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<car::Id, Car>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[car::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, company_id, \
                   brand, model, year, color, engine, more_info, \
                   total_available, in_lease, sold_count, \
                   created_at \
            FROM cars \
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
                    Car {
                        id,
                        company_id: row.get("company_id"),
                        brand: row.get("brand"),
                        model: row.get("model"),
                        year: row.get("year"),
                        color: row.get("color"),
                        engine: row.get("engine"),
                        more_info: row.get("more_info"),
                        stock: Stock::restore(
                            row.get("total_available"),
                            row.get("in_lease"),
                            row.get("sold_count"),
                        ),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl Database<Select<By<Option<Car>, car::Id>>> for Postgres {
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::<HashMap<_, Car>, _>::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl Database<Insert<Car>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(car): Insert<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(car)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<Car>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(car): Update<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        let Car {
            id,
            company_id,
            brand,
            model,
            year,
            color,
            engine,
            more_info,
            stock,
            created_at,
        } = car;

        const SQL: &str = "\
            INSERT INTO cars (\
                id, company_id, \
                brand, model, year, color, engine, more_info, \
                total_available, in_lease, in_stock, sold_count, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::VARCHAR, $4::VARCHAR, $5::INT4, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, \
                $9::INT4, $10::INT4, $11::BOOLEAN, $12::INT4, \
                $13::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET brand = EXCLUDED.brand, \
                model = EXCLUDED.model, \
                year = EXCLUDED.year, \
                color = EXCLUDED.color, \
                engine = EXCLUDED.engine, \
                more_info = EXCLUDED.more_info, \
                total_available = EXCLUDED.total_available, \
                in_lease = EXCLUDED.in_lease, \
                in_stock = EXCLUDED.in_stock, \
                sold_count = EXCLUDED.sold_count";
        self.exec(
            SQL,
            &[
                &id,
                &company_id,
                &brand,
                &model,
                &year,
                &color,
                &engine,
                &more_info,
                &stock.total_available(),
                &stock.in_lease(),
                &stock.in_stock(),
                &stock.sold_count(),
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl Database<Lock<By<Car, car::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Car, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: car::Id = by.into_inner();

        const SQL: &str = "SELECT id FROM cars WHERE id = $1::UUID FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Delete<By<Car, car::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Car, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: car::Id = by.into_inner();

        // Transactions and leasings of the `Car` are removed by the
        // `ON DELETE CASCADE` foreign keys.
        const SQL: &str = "DELETE FROM cars WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
