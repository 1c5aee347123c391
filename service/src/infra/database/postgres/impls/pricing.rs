//! [`PricingRule`]- and [`DiscountCode`]-related [`Database`]
//! implementations.

use common::{
    operations::{By, Delete, Increment, Insert, Lock, Select},
    DateTime,
};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;
use uuid::Uuid;

use crate::{
    domain::{
        equipment,
        pricing::{
            discount_code::{self, Scope},
            rule, Bounds, Usage,
        },
        DiscountCode, Period, PricingRule,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::pricing::{codes, rules},
};

use super::{count, int4};

/// Builds a [`PricingRule`] out of the provided [`Row`].
fn rule_from_row(row: &Row) -> PricingRule {
    let bounds = |min, max| Bounds {
        min: row.get::<_, Option<i32>>(min).map(count),
        max: row.get::<_, Option<i32>>(max).map(count),
    };
    let validity = row
        .get::<_, Option<DateTime>>("valid_from")
        .zip(row.get::<_, Option<DateTime>>("valid_until"))
        .and_then(|(from, until)| Period::new(from, until).ok());
    PricingRule {
        id: row.get("id"),
        equipment_id: row.get("equipment_id"),
        name: row.get("name"),
        kind: row.get("kind"),
        duration: bounds("min_duration", "max_duration"),
        quantity: bounds("min_quantity", "max_quantity"),
        discount: rule::Discount::from_parts(
            row.get("discount_kind"),
            row.get("discount_value"),
        )
        .expect("`pricing_rules.discount_value` is out of range"),
        priority: row.get("priority"),
        is_active: row.get("is_active"),
        validity,
        usage: Usage {
            current: count(row.get("current_usage")),
            max: row.get::<_, Option<i32>>("max_usage").map(count),
        },
        created_at: row.get("created_at"),
    }
}

/// Columns of a [`PricingRule`].
const RULE_COLUMNS: &str = "\
    id, equipment_id, name, kind, \
    min_duration, max_duration, min_quantity, max_quantity, \
    discount_kind, discount_value, priority, is_active, \
    valid_from, valid_until, current_usage, max_usage, created_at";

impl<C> Database<Select<By<Vec<PricingRule>, equipment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<PricingRule>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<PricingRule>, equipment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let equipment_id: equipment::Id = by.into_inner();

        let sql = format!(
            "SELECT {RULE_COLUMNS} \
             FROM pricing_rules \
             WHERE equipment_id = $1::UUID \
               AND is_active \
             ORDER BY priority DESC, created_at",
        );
        Ok(self
            .query(sql.as_str(), &[&equipment_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(rule_from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<PricingRule>, rules::Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<PricingRule>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<PricingRule>, rules::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let rules::Selector { equipment_id } = by.into_inner();

        let sql = format!(
            "SELECT {RULE_COLUMNS} \
             FROM pricing_rules \
             WHERE equipment_id = $1::UUID \
             ORDER BY priority DESC, created_at",
        );
        Ok(self
            .query(sql.as_str(), &[&equipment_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(rule_from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Option<PricingRule>, rule::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<PricingRule>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<PricingRule>, rule::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: rule::Id = by.into_inner();

        let sql = format!(
            "SELECT {RULE_COLUMNS} \
             FROM pricing_rules \
             WHERE id = $1::UUID",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(rule_from_row))
    }
}

impl<C> Database<Insert<PricingRule>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(rule): Insert<PricingRule>,
    ) -> Result<Self::Ok, Self::Err> {
        let PricingRule {
            id,
            equipment_id,
            name,
            kind,
            duration,
            quantity,
            discount,
            priority,
            is_active,
            validity,
            usage,
            created_at,
        } = rule;
        let (min_duration, max_duration) =
            (duration.min.map(int4), duration.max.map(int4));
        let (min_quantity, max_quantity) =
            (quantity.min.map(int4), quantity.max.map(int4));
        let (discount_kind, discount_value) = (discount.kind(), discount.value());
        let (valid_from, valid_until) =
            (validity.map(|v| v.start()), validity.map(|v| v.end()));
        let (current_usage, max_usage) =
            (int4(usage.current), usage.max.map(int4));

        // Usage is left untouched on conflict, as it's incremented
        // atomically.
        const SQL: &str = "\
            INSERT INTO pricing_rules (\
                id, equipment_id, name, kind, \
                min_duration, max_duration, min_quantity, max_quantity, \
                discount_kind, discount_value, priority, is_active, \
                valid_from, valid_until, current_usage, max_usage, \
                created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::INT2, \
                $5::INT4, $6::INT4, $7::INT4, $8::INT4, \
                $9::INT2, $10::NUMERIC, $11::INT4, $12::BOOLEAN, \
                $13::TIMESTAMPTZ, $14::TIMESTAMPTZ, $15::INT4, $16::INT4, \
                $17::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                kind = EXCLUDED.kind, \
                min_duration = EXCLUDED.min_duration, \
                max_duration = EXCLUDED.max_duration, \
                min_quantity = EXCLUDED.min_quantity, \
                max_quantity = EXCLUDED.max_quantity, \
                discount_kind = EXCLUDED.discount_kind, \
                discount_value = EXCLUDED.discount_value, \
                priority = EXCLUDED.priority, \
                is_active = EXCLUDED.is_active, \
                valid_from = EXCLUDED.valid_from, \
                valid_until = EXCLUDED.valid_until, \
                max_usage = EXCLUDED.max_usage";
        self.exec(
            SQL,
            &[
                &id,
                &equipment_id,
                &name,
                &kind,
                &min_duration,
                &max_duration,
                &min_quantity,
                &max_quantity,
                &discount_kind,
                &discount_value,
                &priority,
                &is_active,
                &valid_from,
                &valid_until,
                &current_usage,
                &max_usage,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<PricingRule, rule::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<PricingRule, rule::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: rule::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM pricing_rules \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Increment<By<PricingRule, rule::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<By<PricingRule, rule::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: rule::Id = by.into_inner();

        const SQL: &str = "\
            UPDATE pricing_rules \
            SET current_usage = current_usage + 1 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Builds a [`DiscountCode`] out of the provided [`Row`].
fn code_from_row(row: &Row) -> DiscountCode {
    DiscountCode {
        id: row.get("id"),
        code: row.get("code"),
        discount: discount_code::Discount::from_parts(
            row.get("discount_kind"),
            row.get("discount_value"),
            row.get("max_discount"),
        )
        .expect("`discount_codes.discount_value` is out of range"),
        min_order_amount: row.get("min_order_amount"),
        scope: row
            .get::<_, Option<Vec<Uuid>>>("equipment_ids")
            .map_or(Scope::All, |ids| {
                Scope::Equipment(ids.into_iter().map(Into::into).collect())
            }),
        validity: Period::new(row.get("valid_from"), row.get("valid_until"))
            .expect("`discount_codes` validity is inverted"),
        usage: Usage {
            current: count(row.get("current_usage")),
            max: row.get::<_, Option<i32>>("max_usage").map(count),
        },
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

/// Columns of a [`DiscountCode`].
const CODE_COLUMNS: &str = "\
    id, code, discount_kind, discount_value, max_discount, \
    min_order_amount, equipment_ids, valid_from, valid_until, \
    current_usage, max_usage, is_active, created_at";

impl<C> Database<Select<By<Option<DiscountCode>, discount_code::Code>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<DiscountCode>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<DiscountCode>, discount_code::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let code: discount_code::Code = by.into_inner();

        let sql = format!(
            "SELECT {CODE_COLUMNS} \
             FROM discount_codes \
             WHERE code = $1::VARCHAR",
        );
        Ok(self
            .query_opt(&sql, &[&code])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(code_from_row))
    }
}

impl<C> Database<Select<By<Vec<DiscountCode>, codes::Filter>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<DiscountCode>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<DiscountCode>, codes::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let codes::Filter {
            is_active,
            valid_at,
        } = by.into_inner();

        let sql = format!(
            "SELECT {CODE_COLUMNS} \
             FROM discount_codes \
             WHERE ($1::BOOLEAN IS NULL OR is_active = $1::BOOLEAN) \
               AND ($2::TIMESTAMPTZ IS NULL \
                    OR (valid_from <= $2::TIMESTAMPTZ \
                        AND valid_until >= $2::TIMESTAMPTZ)) \
             ORDER BY created_at DESC",
        );
        Ok(self
            .query(sql.as_str(), &[&is_active, &valid_at])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(code_from_row)
            .collect())
    }
}

impl<C> Database<Insert<DiscountCode>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(code): Insert<DiscountCode>,
    ) -> Result<Self::Ok, Self::Err> {
        let DiscountCode {
            id,
            code,
            discount,
            min_order_amount,
            scope,
            validity,
            usage,
            is_active,
            created_at,
        } = code;
        let (discount_kind, discount_value, max_discount) =
            (discount.kind(), discount.value(), discount.max());
        let equipment_ids: Option<Vec<Uuid>> = match scope {
            Scope::All => None,
            Scope::Equipment(ids) => {
                Some(ids.into_iter().map(Into::into).collect())
            }
        };
        let (current_usage, max_usage) =
            (int4(usage.current), usage.max.map(int4));

        // Usage is left untouched on conflict, as it's incremented
        // atomically.
        const SQL: &str = "\
            INSERT INTO discount_codes (\
                id, code, discount_kind, discount_value, max_discount, \
                min_order_amount, equipment_ids, valid_from, valid_until, \
                current_usage, max_usage, is_active, created_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::INT2, $4::NUMERIC, $5::NUMERIC, \
                $6::NUMERIC, $7::UUID[], $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, \
                $10::INT4, $11::INT4, $12::BOOLEAN, $13::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET code = EXCLUDED.code, \
                discount_kind = EXCLUDED.discount_kind, \
                discount_value = EXCLUDED.discount_value, \
                max_discount = EXCLUDED.max_discount, \
                min_order_amount = EXCLUDED.min_order_amount, \
                equipment_ids = EXCLUDED.equipment_ids, \
                valid_from = EXCLUDED.valid_from, \
                valid_until = EXCLUDED.valid_until, \
                max_usage = EXCLUDED.max_usage, \
                is_active = EXCLUDED.is_active";
        self.exec(
            SQL,
            &[
                &id,
                &code,
                &discount_kind,
                &discount_value,
                &max_discount,
                &min_order_amount,
                &equipment_ids,
                &validity.start(),
                &validity.end(),
                &current_usage,
                &max_usage,
                &is_active,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<DiscountCode, discount_code::Code>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<DiscountCode, discount_code::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let code: discount_code::Code = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM discount_codes \
            WHERE code = $1::VARCHAR \
            FOR UPDATE";
        self.query(SQL, &[&code])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Increment<By<DiscountCode, discount_code::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<By<DiscountCode, discount_code::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: discount_code::Id = by.into_inner();

        const SQL: &str = "\
            UPDATE discount_codes \
            SET current_usage = current_usage + 1 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::domain::pricing::discount_code::{Discount, DiscountKind};

    #[test]
    fn code_discount_keeps_its_cap() {
        let d = Discount::from_parts(
            DiscountKind::Percentage,
            Decimal::from(15),
            Some(Decimal::from(100)),
        )
        .unwrap();

        assert_eq!(d.kind(), DiscountKind::Percentage);
        assert_eq!(d.value(), Decimal::from(15));
        assert_eq!(d.max(), Some(Decimal::from(100)));
    }
}
