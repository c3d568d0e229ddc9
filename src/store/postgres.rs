use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use super::{Store, StoreResult, StoreTx};
use crate::database::Database;
use crate::models::{
    AdminUpdate, BalanceKey, BalanceSnapshot, BillOfEntry, Client, ConversionRates, Customer,
    Direction, DocumentKind, Item, LedgerEntry, Movement, MovementRecord, MovementValues,
    NewDocument, NewItem, NewUser, NewWarehouse, Permissions, Rate, SalesInvoice, StockQuery,
    StockRow, UnitQuantities, User, Warehouse,
};

/// PostgreSQL-backed store over a sqlx pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Database,
}

impl PgStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn document_table(kind: DocumentKind) -> (&'static str, &'static str) {
    match kind {
        DocumentKind::BillOfEntry => ("bills_of_entry", "client_id"),
        DocumentKind::SalesInvoice => ("sales_invoices", "customer_id"),
    }
}

fn decode_error(msg: String) -> sqlx::Error {
    sqlx::Error::Decode(msg.into())
}

fn quantities_from_row(row: &PgRow) -> Result<UnitQuantities, sqlx::Error> {
    Ok(UnitQuantities {
        big: row.try_get("big_quantity")?,
        small: row.try_get("small_quantity")?,
        item: row.try_get("item_quantity")?,
    })
}

fn movement_from_row(row: &PgRow) -> Result<Movement, sqlx::Error> {
    let direction: String = row.try_get("direction")?;
    let direction = direction.parse::<Direction>().map_err(decode_error)?;

    Ok(Movement {
        id: row.try_get("id")?,
        record: MovementRecord {
            direction,
            bill_of_entry_id: row.try_get("bill_of_entry_id")?,
            sales_invoice_id: row.try_get("sales_invoice_id")?,
            item_id: row.try_get("item_id")?,
            warehouse_id: row.try_get("warehouse_id")?,
            client_id: row.try_get("client_id")?,
            customer_id: row.try_get("customer_id")?,
            big_quantity: row.try_get("big_quantity")?,
            prior_value: row.try_get("prior_value")?,
            change_value: row.try_get("change_value")?,
            result_value: row.try_get("result_value")?,
            rates: ConversionRates {
                small_per_big: row.try_get("small_per_big")?,
                raw_per_small: row.try_get("raw_per_small")?,
            },
            total_pieces: row.try_get("total_pieces")?,
            values: MovementValues {
                assessed: row.try_get("assessed_value")?,
                duty: row.try_get("duty_value")?,
                gst: row.try_get("gst_value")?,
                total: row.try_get("total_value")?,
            },
            value_per_piece: row.try_get("value_per_piece")?,
            is_paid: row.try_get("is_paid")?,
            paid_amount: row.try_get("paid_amount")?,
            payment_date: row.try_get("payment_date")?,
            field1: row.try_get("field1")?,
            field2: row.try_get("field2")?,
            remarks: row.try_get("remarks")?,
        },
        is_error: row.try_get("is_error")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        permissions: Permissions {
            create_new: row.try_get("can_create_new")?,
            transaction_in: row.try_get("can_transaction_in")?,
            transaction_out: row.try_get("can_transaction_out")?,
            view: row.try_get("can_view")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<i64> {
        let (table, owner_column) = document_table(document.kind);
        let sql = format!(
            "INSERT INTO {table} (tracker, entry_date, {owner_column}) VALUES ($1, $2, $3) RETURNING id"
        );
        let id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(&document.tracker)
            .bind(document.entry_date)
            .bind(document.owner_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn find_document(&mut self, kind: DocumentKind, tracker: &str) -> StoreResult<Option<i64>> {
        let (table, _) = document_table(kind);
        let sql = format!("SELECT id FROM {table} WHERE tracker = $1");
        let id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(tracker)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn insert_movement(&mut self, record: &MovementRecord) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO movements (
                direction, bill_of_entry_id, sales_invoice_id, item_id, warehouse_id, client_id,
                customer_id, big_quantity, prior_value, change_value, result_value, small_per_big,
                raw_per_small, total_pieces, assessed_value, duty_value, gst_value, total_value,
                value_per_piece, is_paid, paid_amount, payment_date, field1, field2, remarks
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25)
            RETURNING id
            "#,
        )
        .bind(record.direction.as_str())
        .bind(record.bill_of_entry_id)
        .bind(record.sales_invoice_id)
        .bind(record.item_id)
        .bind(record.warehouse_id)
        .bind(record.client_id)
        .bind(record.customer_id)
        .bind(record.big_quantity)
        .bind(record.prior_value)
        .bind(record.change_value)
        .bind(record.result_value)
        .bind(record.rates.small_per_big)
        .bind(record.rates.raw_per_small)
        .bind(record.total_pieces)
        .bind(record.values.assessed)
        .bind(record.values.duty)
        .bind(record.values.gst)
        .bind(record.values.total)
        .bind(record.value_per_piece)
        .bind(record.is_paid)
        .bind(record.paid_amount)
        .bind(record.payment_date)
        .bind(&record.field1)
        .bind(&record.field2)
        .bind(&record.remarks)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn lock_snapshot(&mut self, key: &BalanceKey) -> StoreResult<Option<BalanceSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT big_quantity, small_quantity, item_quantity
            FROM balances
            WHERE item_id = $1 AND warehouse_id = $2 AND client_id = $3
            FOR UPDATE
            "#,
        )
        .bind(key.item_id)
        .bind(key.warehouse_id)
        .bind(key.client_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(Some(BalanceSnapshot {
                key: *key,
                quantities: quantities_from_row(&row)?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_snapshot(&mut self, snapshot: &BalanceSnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO balances (item_id, warehouse_id, client_id, big_quantity, small_quantity, item_quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(snapshot.key.item_id)
        .bind(snapshot.key.warehouse_id)
        .bind(snapshot.key.client_id)
        .bind(snapshot.quantities.big)
        .bind(snapshot.quantities.small)
        .bind(snapshot.quantities.item)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn apply_snapshot_delta(
        &mut self,
        key: &BalanceKey,
        delta: &UnitQuantities,
        expected_big: Decimal,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE balances
            SET big_quantity = big_quantity + $4,
                small_quantity = small_quantity + $5,
                item_quantity = item_quantity + $6
            WHERE item_id = $1 AND warehouse_id = $2 AND client_id = $3 AND big_quantity = $7
            "#,
        )
        .bind(key.item_id)
        .bind(key.warehouse_id)
        .bind(key.client_id)
        .bind(delta.big)
        .bind(delta.small)
        .bind(delta.item)
        .bind(expected_big)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, Warehouse>(
            "SELECT id, name, location, gstin, contact_name, contact_number FROM warehouses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn clients(&self) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, Client>("SELECT id, name FROM clients ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn customers(&self) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, Customer>("SELECT id, name FROM customers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn items(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, variant, hsn_code, uom_raw, uom_small, uom_big, raw_per_small, small_per_big
            FROM items
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn bills_of_entry(&self) -> StoreResult<Vec<BillOfEntry>> {
        let rows = sqlx::query_as::<_, BillOfEntry>(
            "SELECT id, tracker, entry_date, client_id FROM bills_of_entry ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn sales_invoices(&self) -> StoreResult<Vec<SalesInvoice>> {
        let rows = sqlx::query_as::<_, SalesInvoice>(
            r#"
            SELECT si.id, si.tracker, si.entry_date, si.customer_id, cu.name AS customer_name
            FROM sales_invoices si
            JOIN customers cu ON cu.id = si.customer_id
            ORDER BY si.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_warehouse(&self, warehouse: &NewWarehouse) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO warehouses (name, location, gstin, contact_name, contact_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(&warehouse.gstin)
        .bind(&warehouse.contact_name)
        .bind(&warehouse.contact_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_client(&self, name: &str) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO clients (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_customer(&self, name: &str) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO customers (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_item(&self, item: &NewItem) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO items (name, variant, hsn_code, uom_raw, uom_small, uom_big, raw_per_small, small_per_big)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&item.name)
        .bind(&item.variant)
        .bind(&item.hsn_code)
        .bind(&item.uom_raw)
        .bind(&item.uom_small)
        .bind(&item.uom_big)
        .bind(item.raw_per_small)
        .bind(item.small_per_big)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn rate(&self, key: &BalanceKey) -> StoreResult<Option<Rate>> {
        let row = sqlx::query(
            r#"
            SELECT i.raw_per_small, i.small_per_big,
                   COALESCE(b.big_quantity, 0) AS carton_quantity,
                   i.uom_raw, i.uom_small, i.uom_big
            FROM items i
            LEFT JOIN balances b
              ON b.item_id = i.id AND b.warehouse_id = $2 AND b.client_id = $3
            WHERE i.id = $1
            "#,
        )
        .bind(key.item_id)
        .bind(key.warehouse_id)
        .bind(key.client_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Rate {
            raw_per_small: row.try_get("raw_per_small")?,
            small_per_big: row.try_get("small_per_big")?,
            carton_quantity: row.try_get("carton_quantity")?,
            small_unit: row.try_get("uom_raw")?,
            medium_unit: row.try_get("uom_small")?,
            big_unit: row.try_get("uom_big")?,
        }))
    }

    async fn snapshot(&self, key: &BalanceKey) -> StoreResult<Option<BalanceSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT big_quantity, small_quantity, item_quantity
            FROM balances
            WHERE item_id = $1 AND warehouse_id = $2 AND client_id = $3
            "#,
        )
        .bind(key.item_id)
        .bind(key.warehouse_id)
        .bind(key.client_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(BalanceSnapshot {
                key: *key,
                quantities: quantities_from_row(&row)?,
            })),
            None => Ok(None),
        }
    }

    async fn stock(&self, query: &StockQuery) -> StoreResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT itm.name AS item_name, itm.variant AS item_variant, itm.hsn_code,
                   b.item_quantity, itm.uom_raw, b.small_quantity AS smallbox_quantity, itm.uom_small,
                   b.big_quantity AS bigcarton_quantity, itm.uom_big,
                   wh.name AS warehouse_name, wh.location AS warehouse_location, cl.name AS client_name
            FROM balances b
            JOIN items itm ON itm.id = b.item_id
            JOIN warehouses wh ON wh.id = b.warehouse_id
            JOIN clients cl ON cl.id = b.client_id
            WHERE (cardinality($1::bigint[]) = 0 OR b.item_id = ANY($1))
              AND (cardinality($2::bigint[]) = 0 OR b.warehouse_id = ANY($2))
              AND (cardinality($3::bigint[]) = 0 OR b.client_id = ANY($3))
            ORDER BY b.item_id, b.warehouse_id, b.client_id
            "#,
        )
        .bind(&query.item_ids)
        .bind(&query.warehouse_ids)
        .bind(&query.client_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ledger(&self) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT m.*,
                   be.tracker AS bill_tracker, be.entry_date AS bill_date,
                   si.tracker AS invoice_tracker, si.entry_date AS invoice_date,
                   itm.name AS item_name, itm.variant AS item_variant, itm.uom_raw,
                   wh.name AS warehouse_name, wh.location AS warehouse_location,
                   cl.name AS client_name, cu.name AS customer_name
            FROM movements m
            JOIN items itm ON itm.id = m.item_id
            JOIN warehouses wh ON wh.id = m.warehouse_id
            JOIN clients cl ON cl.id = m.client_id
            LEFT JOIN customers cu ON cu.id = m.customer_id
            LEFT JOIN bills_of_entry be ON be.id = m.bill_of_entry_id
            LEFT JOIN sales_invoices si ON si.id = m.sales_invoice_id
            ORDER BY m.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(LedgerEntry {
                movement: movement_from_row(&row)?,
                bill_tracker: row.try_get("bill_tracker")?,
                bill_date: row.try_get("bill_date")?,
                invoice_tracker: row.try_get("invoice_tracker")?,
                invoice_date: row.try_get("invoice_date")?,
                item_name: row.try_get("item_name")?,
                item_variant: row.try_get("item_variant")?,
                uom_raw: row.try_get("uom_raw")?,
                warehouse_name: row.try_get("warehouse_name")?,
                warehouse_location: row.try_get("warehouse_location")?,
                client_name: row.try_get("client_name")?,
                customer_name: row.try_get("customer_name")?,
            });
        }
        Ok(entries)
    }

    async fn update_movement(&self, id: i64, update: &AdminUpdate) -> StoreResult<bool> {
        let query = match update {
            AdminUpdate::PaidAmount(amount) => sqlx::query(
                r#"
                UPDATE movements
                SET paid_amount = $1, is_paid = (trunc(total_value) = trunc($1))
                WHERE id = $2
                "#,
            )
            .bind(*amount),
            AdminUpdate::PaymentDate(date) => {
                sqlx::query("UPDATE movements SET payment_date = $1 WHERE id = $2").bind(*date)
            }
            AdminUpdate::Field1(value) => {
                sqlx::query("UPDATE movements SET field1 = $1 WHERE id = $2").bind(value.clone())
            }
            AdminUpdate::Field2(value) => {
                sqlx::query("UPDATE movements SET field2 = $1 WHERE id = $2").bind(value.clone())
            }
            AdminUpdate::Remarks(value) => {
                sqlx::query("UPDATE movements SET remarks = $1 WHERE id = $2").bind(value.clone())
            }
            AdminUpdate::ErrorFlag(flag) => {
                sqlx::query("UPDATE movements SET is_error = $1 WHERE id = $2").bind(*flag)
            }
        };

        let result = query.bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<Option<Uuid>> {
        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, can_create_new, can_transaction_in,
                               can_transaction_out, can_view)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.permissions.create_new)
        .bind(user.permissions.transaction_in)
        .bind(user.permissions.transaction_out)
        .bind(user.permissions.view)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() > 0).then_some(id))
    }

    async fn user_by_name(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}
