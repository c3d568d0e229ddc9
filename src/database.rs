use log::info;
use sqlx::{PgPool, Pool, Postgres};

pub type Database = Pool<Postgres>;

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    info!("connected to database");
    Ok(pool)
}

/// Table layout used by `PgStore`. Only for bootstrapping a fresh database.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS warehouses (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT NOT NULL,
        gstin TEXT,
        contact_name TEXT,
        contact_number TEXT
    )
    "#,
    "CREATE TABLE IF NOT EXISTS clients (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS customers (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)",
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        variant TEXT NOT NULL,
        hsn_code TEXT NOT NULL,
        uom_raw TEXT NOT NULL,
        uom_small TEXT NOT NULL,
        uom_big TEXT NOT NULL,
        raw_per_small NUMERIC NOT NULL,
        small_per_big NUMERIC NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bills_of_entry (
        id BIGSERIAL PRIMARY KEY,
        tracker TEXT NOT NULL UNIQUE,
        entry_date DATE NOT NULL,
        client_id BIGINT NOT NULL REFERENCES clients (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales_invoices (
        id BIGSERIAL PRIMARY KEY,
        tracker TEXT NOT NULL UNIQUE,
        entry_date DATE NOT NULL,
        customer_id BIGINT NOT NULL REFERENCES customers (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id BIGSERIAL PRIMARY KEY,
        direction TEXT NOT NULL CHECK (direction IN ('in', 'out')),
        bill_of_entry_id BIGINT REFERENCES bills_of_entry (id),
        sales_invoice_id BIGINT REFERENCES sales_invoices (id),
        item_id BIGINT NOT NULL REFERENCES items (id),
        warehouse_id BIGINT NOT NULL REFERENCES warehouses (id),
        client_id BIGINT NOT NULL REFERENCES clients (id),
        customer_id BIGINT REFERENCES customers (id),
        big_quantity NUMERIC NOT NULL,
        prior_value BIGINT NOT NULL,
        change_value BIGINT NOT NULL,
        result_value BIGINT NOT NULL,
        small_per_big NUMERIC NOT NULL,
        raw_per_small NUMERIC NOT NULL,
        total_pieces NUMERIC NOT NULL,
        assessed_value NUMERIC NOT NULL,
        duty_value NUMERIC NOT NULL,
        gst_value NUMERIC NOT NULL,
        total_value NUMERIC NOT NULL,
        value_per_piece NUMERIC,
        is_paid BOOLEAN NOT NULL DEFAULT false,
        paid_amount NUMERIC NOT NULL DEFAULT 0,
        payment_date DATE,
        field1 TEXT NOT NULL DEFAULT '',
        field2 TEXT NOT NULL DEFAULT '',
        remarks TEXT NOT NULL DEFAULT '',
        is_error BOOLEAN NOT NULL DEFAULT false,
        recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS balances (
        item_id BIGINT NOT NULL REFERENCES items (id),
        warehouse_id BIGINT NOT NULL REFERENCES warehouses (id),
        client_id BIGINT NOT NULL REFERENCES clients (id),
        item_quantity NUMERIC NOT NULL,
        small_quantity NUMERIC NOT NULL,
        big_quantity NUMERIC NOT NULL,
        PRIMARY KEY (item_id, warehouse_id, client_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        can_create_new BOOLEAN NOT NULL DEFAULT false,
        can_transaction_in BOOLEAN NOT NULL DEFAULT false,
        can_transaction_out BOOLEAN NOT NULL DEFAULT false,
        can_view BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Creates any missing tables. Existing tables are left untouched.
pub async fn ensure_schema(pool: &Database) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(*statement).execute(pool).await?;
    }
    info!("schema bootstrap complete ({} tables)", SCHEMA.len());
    Ok(())
}
