//! [`Customer`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        customer::{self, History},
        Customer,
    },
    infra::{database, Database, Postgres},
};

impl<IDs> Database<Select<By<HashMap<customer::Id, Customer>, IDs>>>
    for Postgres
where
    IDs: AsRef<[customer::Id]>,
{
    type Ok = HashMap<customer::Id, Customer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<customer::Id, Customer>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[customer::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, company_id, \
                   name, email, phone, address, \
                   purchases_count, purchases_summary, \
                   leases_count, leases_summary, \
                   created_at \
            FROM customers \
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
                    Customer {
                        id,
                        company_id: row.get("company_id"),
                        name: row.get("name"),
                        email: row.get("email"),
                        phone: row.get("phone"),
                        address: row.get("address"),
                        purchases: History::restore(
                            row.get("purchases_count"),
                            row.get("purchases_summary"),
                        ),
                        leases: History::restore(
                            row.get("leases_count"),
                            row.get("leases_summary"),
                        ),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl Database<Select<By<Option<Customer>, customer::Id>>> for Postgres {
    type Ok = Option<Customer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Customer>, customer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::<HashMap<_, Customer>, _>::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl Database<Insert<Customer>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(customer): Insert<Customer>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(customer)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<Customer>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(customer): Update<Customer>,
    ) -> Result<Self::Ok, Self::Err> {
        let Customer {
            id,
            company_id,
            name,
            email,
            phone,
            address,
            purchases,
            leases,
            created_at,
        } = customer;

        const SQL: &str = "\
            INSERT INTO customers (\
                id, company_id, \
                name, email, phone, address, \
                purchases_count, purchases_summary, \
                leases_count, leases_summary, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::VARCHAR, $4::VARCHAR, $5::VARCHAR, $6::VARCHAR, \
                $7::INT4, $8::TEXT, \
                $9::INT4, $10::TEXT, \
                $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                email = EXCLUDED.email, \
                phone = EXCLUDED.phone, \
                address = EXCLUDED.address, \
                purchases_count = EXCLUDED.purchases_count, \
                purchases_summary = EXCLUDED.purchases_summary, \
                leases_count = EXCLUDED.leases_count, \
                leases_summary = EXCLUDED.leases_summary";
        self.exec(
            SQL,
            &[
                &id,
                &company_id,
                &name,
                &email,
                &phone,
                &address,
                &purchases.count(),
                purchases.summary(),
                &leases.count(),
                leases.summary(),
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl Database<Lock<By<Customer, customer::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Customer, customer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: customer::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id FROM customers WHERE id = $1::UUID FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Delete<By<Customer, customer::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Customer, customer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: customer::Id = by.into_inner();

        const SQL: &str = "DELETE FROM customers WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
