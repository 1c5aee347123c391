//! [`Reservation`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Increment, Insert, Lock, Select},
    pagination::Page,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        customer,
        reservation::{
            self, payment, Approval, Delivery, HistoryEntry, Item, Payment,
            Rejection, Settlement, Status, Totals,
        },
        tenant, Customer, Period, Reservation,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read::{
        reservation::{list, stats},
        timeline,
    },
};

use super::{count, int4};

/// Columns of a [`Reservation`], excluding its items.
const RESERVATION_COLUMNS: &str = "\
    id, tenant_id, number, \
    customer_id, customer_name, customer_email, customer_phone, \
    customer_address, \
    starts_at, ends_at, pickup_time, return_time, \
    pickup_location, return_location, delivery_address, delivery_fee, \
    currency, subtotal, discount, discount_code, tax_rate, tax, total, \
    deposit, remaining, \
    status, previous_status, \
    approved_by, approved_at, rejected_by, rejected_at, rejection_reason, \
    deposit_paid_at, deposit_method, full_paid_at, full_method, \
    notes, internal_notes, special_requests, \
    created_by, created_at, updated_at";

/// Builds a [`Reservation`] out of the provided [`Row`] and its `items`.
fn reservation_from_row(row: &Row, items: Vec<Item>) -> Reservation {
    let settlement = |at, method| {
        row.get::<_, Option<reservation::SettlementDateTime>>(at)
            .zip(row.get::<_, Option<payment::Method>>(method))
            .map(|(at, method)| Settlement { at, method })
    };
    Reservation {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        number: row.get("number"),
        customer: Customer {
            id: row.get("customer_id"),
            name: row.get("customer_name"),
            email: row.get("customer_email"),
            phone: row.get("customer_phone"),
            address: row.get("customer_address"),
        },
        period: Period::new(row.get("starts_at"), row.get("ends_at"))
            .expect("`reservations` CHECK constraint violated"),
        pickup_time: row.get("pickup_time"),
        return_time: row.get("return_time"),
        pickup_location: row.get("pickup_location"),
        return_location: row.get("return_location"),
        delivery: row
            .get::<_, Option<customer::Address>>("delivery_address")
            .map(|address| Delivery {
                address,
                fee: row.get("delivery_fee"),
            }),
        items,
        totals: Totals {
            currency: row.get("currency"),
            subtotal: row.get("subtotal"),
            discount: row.get("discount"),
            discount_code: row.get("discount_code"),
            tax_rate: row.get("tax_rate"),
            tax: row.get("tax"),
            total: row.get("total"),
            deposit: row.get("deposit"),
            remaining: row.get("remaining"),
        },
        status: row.get("status"),
        previous_status: row.get("previous_status"),
        approval: row.get::<_, Option<reservation::ApprovalDateTime>>(
            "approved_at",
        )
        .map(|at| Approval {
            by: row.get("approved_by"),
            at,
        }),
        rejection: row
            .get::<_, Option<reservation::RejectionDateTime>>("rejected_at")
            .map(|at| Rejection {
                by: row.get("rejected_by"),
                at,
                reason: row.get("rejection_reason"),
            }),
        deposit_payment: settlement("deposit_paid_at", "deposit_method"),
        full_payment: settlement("full_paid_at", "full_method"),
        notes: row.get("notes"),
        internal_notes: row.get("internal_notes"),
        special_requests: row.get("special_requests"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C: Connection> Postgres<C> {
    /// Selects [`Item`]s of the [`Reservation`]s with the provided IDs.
    async fn items_of(
        &self,
        ids: &[reservation::Id],
    ) -> Result<HashMap<reservation::Id, Vec<Item>>, Traced<database::Error>>
    {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT reservation_id, equipment_id, \
                   equipment_name, equipment_code, \
                   quantity, unit_price, tier, days, \
                   discount, subtotal, total, applied_rules \
            FROM reservation_items \
            WHERE reservation_id = ANY($1::UUID[]) \
            ORDER BY reservation_id, position";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let item = Item {
                    equipment_id: row.get("equipment_id"),
                    equipment_name: row.get("equipment_name"),
                    equipment_code: row.get("equipment_code"),
                    quantity: count(row.get("quantity")),
                    unit_price: row.get("unit_price"),
                    tier: row.get("tier"),
                    days: u64::try_from(row.get::<_, i64>("days"))
                        .expect("`days` overflow"),
                    discount: row.get("discount"),
                    subtotal: row.get("subtotal"),
                    total: row.get("total"),
                    applied_rules: row.get("applied_rules"),
                };
                (row.get("reservation_id"), item)
            })
            .into_group_map())
    }

    /// Builds [`Reservation`]s out of the provided [`Row`]s, preserving their
    /// order.
    async fn reservations_from_rows(
        &self,
        rows: &[Row],
    ) -> Result<Vec<Reservation>, Traced<database::Error>> {
        let ids = rows
            .iter()
            .map(|row| row.get("id"))
            .collect::<Vec<reservation::Id>>();
        let mut items = self.items_of(&ids).await.map_err(tracerr::wrap!())?;
        Ok(rows
            .iter()
            .zip(ids)
            .map(|(row, id)| {
                reservation_from_row(row, items.remove(&id).unwrap_or_default())
            })
            .collect())
    }
}

impl<C> Database<Increment<By<reservation::Number, (tenant::Id, i32)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = reservation::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<By<reservation::Number, (tenant::Id, i32)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, year) = by.into_inner();

        // Sequence never goes below the numbers already allocated, so manually
        // inserted `Reservation`s are never clashed with.
        const SQL: &str = "\
            INSERT INTO reservation_sequences (tenant_id, year, last) \
            VALUES ($1::UUID, $2::INT4, \
                    (SELECT COALESCE(MAX(SPLIT_PART(number, '-', 3)::INT4), 0) \
                     FROM reservations \
                     WHERE tenant_id = $1::UUID \
                       AND SPLIT_PART(number, '-', 2) = $2::INT4::TEXT) \
                    + 1) \
            ON CONFLICT (tenant_id, year) DO UPDATE \
            SET last = GREATEST(reservation_sequences.last + 1, \
                                EXCLUDED.last) \
            RETURNING last";
        let row = self
            .query(SQL, &[&tenant_id, &year])
            .await
            .map_err(tracerr::wrap!())?
            .pop()
            .expect("`RETURNING` always returns a row");
        Ok(reservation::Number::new(year, count(row.get("last"))))
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reservation {
            id,
            tenant_id,
            number,
            customer,
            period,
            pickup_time,
            return_time,
            pickup_location,
            return_location,
            delivery,
            items,
            totals,
            status,
            previous_status,
            approval,
            rejection,
            deposit_payment,
            full_payment,
            notes,
            internal_notes,
            special_requests,
            created_by,
            created_at,
            updated_at,
        } = reservation;
        let (delivery_address, delivery_fee) = delivery
            .map_or((None, None), |d| (Some(d.address), d.fee));
        let (approved_by, approved_at) =
            approval.map_or((None, None), |a| (a.by, Some(a.at)));
        let (rejected_by, rejected_at, rejection_reason) = rejection
            .map_or((None, None, None), |r| (r.by, Some(r.at), r.reason));
        let (deposit_paid_at, deposit_method) = deposit_payment
            .map_or((None, None), |s| (Some(s.at), Some(s.method)));
        let (full_paid_at, full_method) = full_payment
            .map_or((None, None), |s| (Some(s.at), Some(s.method)));

        const SQL: &str = "\
            INSERT INTO reservations (\
                id, tenant_id, number, \
                customer_id, customer_name, customer_email, customer_phone, \
                customer_address, \
                starts_at, ends_at, pickup_time, return_time, \
                pickup_location, return_location, \
                delivery_address, delivery_fee, \
                currency, subtotal, discount, discount_code, tax_rate, tax, \
                total, deposit, remaining, \
                status, previous_status, \
                approved_by, approved_at, \
                rejected_by, rejected_at, rejection_reason, \
                deposit_paid_at, deposit_method, full_paid_at, full_method, \
                notes, internal_notes, special_requests, \
                created_by, created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::UUID, $5::VARCHAR, $6::VARCHAR, $7::VARCHAR, \
                $8::VARCHAR, \
                $9::TIMESTAMPTZ, $10::TIMESTAMPTZ, $11::VARCHAR, $12::VARCHAR, \
                $13::VARCHAR, $14::VARCHAR, \
                $15::VARCHAR, $16::NUMERIC, \
                $17::INT2, $18::NUMERIC, $19::NUMERIC, $20::VARCHAR, \
                $21::NUMERIC, $22::NUMERIC, \
                $23::NUMERIC, $24::NUMERIC, $25::NUMERIC, \
                $26::INT2, $27::INT2, \
                $28::UUID, $29::TIMESTAMPTZ, \
                $30::UUID, $31::TIMESTAMPTZ, $32::VARCHAR, \
                $33::TIMESTAMPTZ, $34::INT2, $35::TIMESTAMPTZ, $36::INT2, \
                $37::VARCHAR, $38::VARCHAR, $39::VARCHAR, \
                $40::UUID, $41::TIMESTAMPTZ, $42::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET customer_id = EXCLUDED.customer_id, \
                customer_name = EXCLUDED.customer_name, \
                customer_email = EXCLUDED.customer_email, \
                customer_phone = EXCLUDED.customer_phone, \
                customer_address = EXCLUDED.customer_address, \
                starts_at = EXCLUDED.starts_at, \
                ends_at = EXCLUDED.ends_at, \
                pickup_time = EXCLUDED.pickup_time, \
                return_time = EXCLUDED.return_time, \
                pickup_location = EXCLUDED.pickup_location, \
                return_location = EXCLUDED.return_location, \
                delivery_address = EXCLUDED.delivery_address, \
                delivery_fee = EXCLUDED.delivery_fee, \
                currency = EXCLUDED.currency, \
                subtotal = EXCLUDED.subtotal, \
                discount = EXCLUDED.discount, \
                discount_code = EXCLUDED.discount_code, \
                tax_rate = EXCLUDED.tax_rate, \
                tax = EXCLUDED.tax, \
                total = EXCLUDED.total, \
                deposit = EXCLUDED.deposit, \
                remaining = EXCLUDED.remaining, \
                status = EXCLUDED.status, \
                previous_status = EXCLUDED.previous_status, \
                approved_by = EXCLUDED.approved_by, \
                approved_at = EXCLUDED.approved_at, \
                rejected_by = EXCLUDED.rejected_by, \
                rejected_at = EXCLUDED.rejected_at, \
                rejection_reason = EXCLUDED.rejection_reason, \
                deposit_paid_at = EXCLUDED.deposit_paid_at, \
                deposit_method = EXCLUDED.deposit_method, \
                full_paid_at = EXCLUDED.full_paid_at, \
                full_method = EXCLUDED.full_method, \
                notes = EXCLUDED.notes, \
                internal_notes = EXCLUDED.internal_notes, \
                special_requests = EXCLUDED.special_requests, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &tenant_id,
                &number,
                &customer.id,
                &customer.name,
                &customer.email,
                &customer.phone,
                &customer.address,
                &period.start(),
                &period.end(),
                &pickup_time,
                &return_time,
                &pickup_location,
                &return_location,
                &delivery_address,
                &delivery_fee,
                &totals.currency,
                &totals.subtotal,
                &totals.discount,
                &totals.discount_code,
                &totals.tax_rate,
                &totals.tax,
                &totals.total,
                &totals.deposit,
                &totals.remaining,
                &status,
                &previous_status,
                &approved_by,
                &approved_at,
                &rejected_by,
                &rejected_at,
                &rejection_reason,
                &deposit_paid_at,
                &deposit_method,
                &full_paid_at,
                &full_method,
                &notes,
                &internal_notes,
                &special_requests,
                &created_by,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        // Items are replaced as a whole, as repricing may change all of them.
        const DELETE_ITEMS_SQL: &str = "\
            DELETE FROM reservation_items \
            WHERE reservation_id = $1::UUID";
        self.exec(DELETE_ITEMS_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;

        const INSERT_ITEM_SQL: &str = "\
            INSERT INTO reservation_items (\
                reservation_id, position, equipment_id, \
                equipment_name, equipment_code, \
                quantity, unit_price, tier, days, \
                discount, subtotal, total, applied_rules \
            ) VALUES (\
                $1::UUID, $2::INT4, $3::UUID, \
                $4::VARCHAR, $5::VARCHAR, \
                $6::INT4, $7::NUMERIC, $8::INT2, $9::INT8, \
                $10::NUMERIC, $11::NUMERIC, $12::NUMERIC, $13::UUID[] \
            )";
        for (position, item) in items.into_iter().enumerate() {
            let position = i32::try_from(position).unwrap_or(i32::MAX);
            let quantity = int4(item.quantity);
            let days = i64::try_from(item.days).unwrap_or(i64::MAX);
            self.exec(
                INSERT_ITEM_SQL,
                &[
                    &id,
                    &position,
                    &item.equipment_id,
                    &item.equipment_name,
                    &item.equipment_code,
                    &quantity,
                    &item.unit_price,
                    &item.tier,
                    &days,
                    &item.discount,
                    &item.subtotal,
                    &item.total,
                    &item.applied_rules,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        }

        Ok(())
    }
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} \
             FROM reservations \
             WHERE id = $1::UUID",
        );
        let Some(row) = self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        Ok(self
            .reservations_from_rows(&[row])
            .await
            .map_err(tracerr::wrap!())?
            .pop())
    }
}

impl<C> Database<Lock<By<Reservation, reservation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM reservations \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<list::Page, list::Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<list::Page, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector {
            arguments,
            filter:
                list::Filter {
                    tenant_id,
                    customer_id,
                    status,
                    starts_from,
                    ends_until,
                    search,
                },
        } = by.into_inner();

        let limit = i64::from(arguments.limit());
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&tenant_id];
        let customer_idx = customer_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let starts_idx = starts_from.as_ref().map(|d| {
            ps.push(d);
            ps.len()
        });
        let ends_idx = ends_until.as_ref().map(|d| {
            ps.push(d);
            ps.len()
        });
        let search_pattern = search.as_deref().map(FuzzPattern::new);
        let search_idx = search_pattern.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let filtering = [
            customer_idx.map(|i| format!("AND customer_id = ${i}::UUID")),
            status_idx.map(|i| format!("AND status = ${i}::INT2")),
            starts_idx.map(|i| format!("AND starts_at >= ${i}::TIMESTAMPTZ")),
            ends_idx.map(|i| format!("AND ends_at <= ${i}::TIMESTAMPTZ")),
            search_idx.map(|i| {
                format!(
                    "AND (LOWER(number) LIKE ${i}::VARCHAR \
                       OR LOWER(customer_name) LIKE ${i}::VARCHAR \
                       OR LOWER(customer_email) LIKE ${i}::VARCHAR \
                       OR LOWER(customer_phone) LIKE ${i}::VARCHAR)",
                )
            }),
        ]
        .into_iter()
        .flatten()
        .join(" ");

        let count_sql = format!(
            "SELECT COUNT(*) AS total \
             FROM reservations \
             WHERE tenant_id = $1::UUID {filtering}",
        );
        let total = self
            .query(&count_sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map_or(0, |row| row.get::<_, i64>("total"));

        ps.push(&limit);
        let limit_idx = ps.len();
        ps.push(&offset);
        let offset_idx = ps.len();
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} \
             FROM reservations \
             WHERE tenant_id = $1::UUID {filtering} \
             ORDER BY created_at DESC, id \
             LIMIT ${limit_idx}::INT8 \
             OFFSET ${offset_idx}::INT8",
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Page {
            items: self
                .reservations_from_rows(&rows)
                .await
                .map_err(tracerr::wrap!())?,
            arguments,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

impl<C> Database<Select<By<Vec<Reservation>, timeline::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, timeline::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let timeline::Selector {
            tenant_id,
            period,
            status,
            ..
        } = by.into_inner();

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} \
             FROM reservations \
             WHERE tenant_id = $1::UUID \
               AND starts_at <= $3::TIMESTAMPTZ \
               AND ends_at >= $2::TIMESTAMPTZ \
               AND ($4::INT2 IS NULL OR status = $4::INT2) \
             ORDER BY starts_at, id",
        );
        let rows = self
            .query(
                &sql,
                &[&tenant_id, &period.start(), &period.end(), &status],
            )
            .await
            .map_err(tracerr::wrap!())?;
        self.reservations_from_rows(&rows)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<stats::Stats, stats::Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = stats::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<stats::Stats, stats::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let stats::Selector {
            tenant_id,
            created_from,
            created_until,
        } = by.into_inner();
        let revenue_statuses = stats::REVENUE_STATUSES.to_vec();

        const SQL: &str = "\
            SELECT status, \
                   COUNT(*) AS total, \
                   COALESCE(SUM(total) \
                            FILTER (WHERE status = ANY($4::INT2[])), 0) \
                       AS revenue, \
                   COUNT(deposit_paid_at) AS deposits_paid, \
                   COUNT(full_paid_at) AS full_payments \
            FROM reservations \
            WHERE tenant_id = $1::UUID \
              AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2::TIMESTAMPTZ) \
              AND ($3::TIMESTAMPTZ IS NULL OR created_at <= $3::TIMESTAMPTZ) \
            GROUP BY status";
        let rows = self
            .query(
                SQL,
                &[&tenant_id, &created_from, &created_until, &revenue_statuses],
            )
            .await
            .map_err(tracerr::wrap!())?;

        let num = |row: &Row, col: &str| {
            u64::try_from(row.get::<_, i64>(col)).unwrap_or_default()
        };
        let mut stats = stats::Stats::default();
        for row in &rows {
            let total = num(row, "total");
            drop(stats.by_status.insert(row.get::<_, Status>("status"), total));
            stats.total += total;
            stats.revenue += row.get::<_, Decimal>("revenue");
            stats.deposits_paid += num(row, "deposits_paid");
            stats.full_payments += num(row, "full_payments");
        }
        Ok(stats)
    }
}

impl<C> Database<Insert<HistoryEntry>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<HistoryEntry>,
    ) -> Result<Self::Ok, Self::Err> {
        let HistoryEntry {
            id,
            reservation_id,
            from,
            to,
            actor,
            reason,
            notes,
            at,
        } = entry;

        const SQL: &str = "\
            INSERT INTO reservation_status_history (\
                id, reservation_id, from_status, to_status, \
                actor, reason, notes, at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::INT2, \
                $5::UUID, $6::VARCHAR, $7::VARCHAR, $8::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[&id, &reservation_id, &from, &to, &actor, &reason, &notes, &at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<HistoryEntry>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<HistoryEntry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<HistoryEntry>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, reservation_id, from_status, to_status, \
                   actor, reason, notes, at \
            FROM reservation_status_history \
            WHERE reservation_id = $1::UUID \
            ORDER BY at DESC";
        Ok(self
            .query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| HistoryEntry {
                id: row.get("id"),
                reservation_id: row.get("reservation_id"),
                from: row.get("from_status"),
                to: row.get("to_status"),
                actor: row.get("actor"),
                reason: row.get("reason"),
                notes: row.get("notes"),
                at: row.get("at"),
            })
            .collect())
    }
}

impl<C> Database<Insert<Payment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Payment {
            id,
            reservation_id,
            amount,
            kind,
            method,
            details:
                payment::Details {
                    card_last_four,
                    card_brand,
                    transfer_reference,
                    bank_name,
                    receipt_number,
                },
            paid_by,
            received_by,
            notes,
            status,
            paid_at,
        } = payment;

        const SQL: &str = "\
            INSERT INTO reservation_payments (\
                id, reservation_id, amount, kind, method, \
                card_last_four, card_brand, transfer_reference, bank_name, \
                receipt_number, paid_by, received_by, notes, status, paid_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::NUMERIC, $4::INT2, $5::INT2, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, $9::VARCHAR, \
                $10::VARCHAR, $11::VARCHAR, $12::UUID, $13::VARCHAR, \
                $14::INT2, $15::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &reservation_id,
                &amount,
                &kind,
                &method,
                &card_last_four,
                &card_brand,
                &transfer_reference,
                &bank_name,
                &receipt_number,
                &paid_by,
                &received_by,
                &notes,
                &status,
                &paid_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Payment>, reservation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Payment>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, reservation_id, amount, kind, method, \
                   card_last_four, card_brand, transfer_reference, bank_name, \
                   receipt_number, paid_by, received_by, notes, status, \
                   paid_at \
            FROM reservation_payments \
            WHERE reservation_id = $1::UUID \
            ORDER BY paid_at DESC";
        Ok(self
            .query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Payment {
                id: row.get("id"),
                reservation_id: row.get("reservation_id"),
                amount: row.get("amount"),
                kind: row.get("kind"),
                method: row.get("method"),
                details: payment::Details {
                    card_last_four: row.get("card_last_four"),
                    card_brand: row.get("card_brand"),
                    transfer_reference: row.get("transfer_reference"),
                    bank_name: row.get("bank_name"),
                    receipt_number: row.get("receipt_number"),
                },
                paid_by: row.get("paid_by"),
                received_by: row.get("received_by"),
                notes: row.get("notes"),
                status: row.get("status"),
                paid_at: row.get("paid_at"),
            })
            .collect())
    }
}
