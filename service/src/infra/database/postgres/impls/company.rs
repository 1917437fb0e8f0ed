//! [`Company`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{company, user, Company},
    infra::{database, Database, Postgres},
};

/// Columns of a [`Company`] row, including its members.
const COLUMNS: &str = "\
    c.id, c.name, c.address, c.owner_id, c.created_at, \
    ARRAY(SELECT m.user_id FROM company_members AS m \
          WHERE m.company_id = c.id) AS member_ids";

/// Restores a [`Company`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Company {
    Company {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        owner_id: row.get("owner_id"),
        member_ids: row.get("member_ids"),
        created_at: row.get("created_at"),
    }
}

impl<IDs> Database<Select<By<HashMap<company::Id, Company>, IDs>>>
    for Postgres
where
    IDs: AsRef<[company::Id]>,
{
    type Ok = HashMap<company::Id, Company>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<company::Id, Company>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[company::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM companies AS c \
             WHERE c.id = ANY($1::UUID[])",
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(|c| (c.id, c))
            .collect())
    }
}

impl Database<Select<By<Option<Company>, company::Id>>> for Postgres {
    type Ok = Option<Company>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Company>, company::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::<HashMap<_, Company>, _>::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl Database<Select<By<Option<Company>, user::Id>>> for Postgres {
    type Ok = Option<Company>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Company>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let owner_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM companies AS c \
             WHERE c.owner_id = $1::UUID",
        );
        Ok(self
            .query(&sql, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map(from_row))
    }
}

impl Database<Insert<Company>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(company): Insert<Company>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(company)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<Company>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(company): Update<Company>,
    ) -> Result<Self::Ok, Self::Err> {
        let Company {
            id,
            name,
            address,
            owner_id,
            member_ids,
            created_at,
        } = company;

        const SQL: &str = "\
            INSERT INTO companies (id, name, address, owner_id, created_at) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::UUID, $5::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                address = EXCLUDED.address";
        self.exec(SQL, &[&id, &name, &address, &owner_id, &created_at])
            .await
            .map_err(tracerr::wrap!())?;

        const MEMBERS_SQL: &str = "\
            WITH removed AS (\
                DELETE FROM company_members \
                WHERE company_id = $1::UUID \
                  AND user_id <> ALL($2::UUID[])\
            ) \
            INSERT INTO company_members (company_id, user_id) \
            SELECT $1::UUID, unnest($2::UUID[]) \
            ON CONFLICT DO NOTHING";
        self.exec(MEMBERS_SQL, &[&id, &member_ids])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Lock<By<Company, company::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Company, company::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: company::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id FROM companies WHERE id = $1::UUID FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
