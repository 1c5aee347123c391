//! [`Equipment`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        equipment::{self, Rates},
        reservation::Status,
        Equipment, Period,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{
        availability::{Conflict, Selector},
        timeline,
    },
};

use super::{count, int4};

/// Columns of an [`Equipment`].
const EQUIPMENT_COLUMNS: &str = "\
    id, tenant_id, name, code, category, quantity, \
    currency, hourly_rate, daily_rate, weekly_rate, monthly_rate";

/// Builds an [`Equipment`] out of the provided [`Row`].
fn equipment_from_row(row: &Row) -> Equipment {
    Equipment {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        code: row.get("code"),
        category: row.get("category"),
        quantity: count(row.get("quantity")),
        rates: Rates {
            currency: row.get("currency"),
            hourly: row.get("hourly_rate"),
            daily: row.get("daily_rate"),
            weekly: row.get("weekly_rate"),
            monthly: row.get("monthly_rate"),
        },
    }
}

impl<C, IDs> Database<Select<By<HashMap<equipment::Id, Equipment>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[equipment::Id]>,
{
    type Ok = HashMap<equipment::Id, Equipment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<equipment::Id, Equipment>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[equipment::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {EQUIPMENT_COLUMNS} \
             FROM equipment \
             WHERE id = ANY($1::UUID[])",
        );
        Ok(self
            .query(sql.as_str(), &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let e = equipment_from_row(row);
                (e.id, e)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Equipment>, equipment::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<equipment::Id, Equipment>, [equipment::Id; 1]>>,
        Ok = HashMap<equipment::Id, Equipment>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Equipment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Equipment>, equipment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Vec<Equipment>, timeline::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Equipment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Equipment>, timeline::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let timeline::Selector {
            tenant_id,
            equipment_ids,
            ..
        } = by.into_inner();

        let sql = format!(
            "SELECT {EQUIPMENT_COLUMNS} \
             FROM equipment \
             WHERE tenant_id = $1::UUID \
               AND (CARDINALITY($2::UUID[]) = 0 OR id = ANY($2::UUID[])) \
             ORDER BY category NULLS LAST, name",
        );
        Ok(self
            .query(sql.as_str(), &[&tenant_id, &equipment_ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(equipment_from_row)
            .collect())
    }
}

impl<C> Database<Insert<Equipment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(equipment): Insert<Equipment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Equipment {
            id,
            tenant_id,
            name,
            code,
            category,
            quantity,
            rates:
                Rates {
                    currency,
                    hourly,
                    daily,
                    weekly,
                    monthly,
                },
        } = equipment;
        let quantity = int4(quantity);

        const SQL: &str = "\
            INSERT INTO equipment (\
                id, tenant_id, name, code, category, quantity, \
                currency, hourly_rate, daily_rate, weekly_rate, monthly_rate \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::VARCHAR, $5::VARCHAR, \
                $6::INT4, \
                $7::INT2, $8::NUMERIC, $9::NUMERIC, $10::NUMERIC, \
                $11::NUMERIC \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                code = EXCLUDED.code, \
                category = EXCLUDED.category, \
                quantity = EXCLUDED.quantity, \
                currency = EXCLUDED.currency, \
                hourly_rate = EXCLUDED.hourly_rate, \
                daily_rate = EXCLUDED.daily_rate, \
                weekly_rate = EXCLUDED.weekly_rate, \
                monthly_rate = EXCLUDED.monthly_rate";
        self.exec(
            SQL,
            &[
                &id, &tenant_id, &name, &code, &category, &quantity,
                &currency, &hourly, &daily, &weekly, &monthly,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Equipment, equipment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Equipment, equipment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: equipment::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM equipment \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Conflict>, Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Conflict>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Conflict>, Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Selector {
            equipment_id,
            period,
            exclude,
        } = by.into_inner();
        let statuses = Status::HOLDING_INVENTORY.to_vec();

        const SQL: &str = "\
            SELECT r.id, r.number, r.customer_name, \
                   r.starts_at, r.ends_at, r.status, \
                   SUM(i.quantity)::INT4 AS quantity \
            FROM reservations AS r \
            INNER JOIN reservation_items AS i \
                    ON i.reservation_id = r.id \
            WHERE i.equipment_id = $1::UUID \
              AND r.status = ANY($2::INT2[]) \
              AND r.starts_at <= $4::TIMESTAMPTZ \
              AND r.ends_at >= $3::TIMESTAMPTZ \
              AND ($5::UUID IS NULL OR r.id <> $5::UUID) \
            GROUP BY r.id \
            ORDER BY r.starts_at";
        Ok(self
            .query(
                SQL,
                &[
                    &equipment_id,
                    &statuses,
                    &period.start(),
                    &period.end(),
                    &exclude,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Conflict {
                reservation_id: row.get("id"),
                number: row.get("number"),
                customer_name: row.get("customer_name"),
                period: Period::new(row.get("starts_at"), row.get("ends_at"))
                    .expect("`reservations` CHECK constraint violated"),
                status: row.get("status"),
                quantity: count(row.get("quantity")),
            })
            .collect())
    }
}
