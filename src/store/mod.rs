//! Store-access interface consumed by the ledger.
//!
//! The ledger never reaches for a global connection: every component receives
//! a `Store` (reads, master data) or a `StoreTx` (the writes of one movement).
//! A `StoreTx` that is dropped without `commit` rolls back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AdminUpdate, BalanceKey, BalanceSnapshot, BillOfEntry, Client, Customer, DocumentKind,
    Item, LedgerEntry, MovementRecord, NewDocument, NewItem, NewUser, NewWarehouse, Rate,
    SalesInvoice, StockQuery, StockRow, UnitQuantities, User, Warehouse,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport-level failure; the request cannot proceed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("constraint conflict: {0}")]
    Conflict(String),

    /// The write names a row that does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match db.code().as_deref() {
                    Some("23505") => Self::Conflict(message),
                    Some("23503") => Self::MissingReference(message),
                    _ => Self::Query(message),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

/// The writes of a single movement, applied atomically on `commit`.
#[async_trait]
pub trait StoreTx: Send {
    /// Inserts a document and returns its id. A duplicate tracker is a
    /// `Conflict`; an unknown owner is a `MissingReference`.
    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<i64>;

    async fn find_document(&mut self, kind: DocumentKind, tracker: &str) -> StoreResult<Option<i64>>;

    /// Appends an immutable ledger row and returns its id.
    async fn insert_movement(&mut self, record: &MovementRecord) -> StoreResult<i64>;

    /// Reads the snapshot for a triple, locking it for the rest of the transaction.
    async fn lock_snapshot(&mut self, key: &BalanceKey) -> StoreResult<Option<BalanceSnapshot>>;

    async fn insert_snapshot(&mut self, snapshot: &BalanceSnapshot) -> StoreResult<()>;

    /// Adds `delta` to the snapshot if its big quantity still equals
    /// `expected_big`. Returns the number of rows changed (0 or 1).
    async fn apply_snapshot_delta(
        &mut self,
        key: &BalanceKey,
        delta: &UnitQuantities,
        expected_big: Decimal,
    ) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    async fn warehouses(&self) -> StoreResult<Vec<Warehouse>>;
    async fn clients(&self) -> StoreResult<Vec<Client>>;
    async fn customers(&self) -> StoreResult<Vec<Customer>>;
    async fn items(&self) -> StoreResult<Vec<Item>>;
    async fn bills_of_entry(&self) -> StoreResult<Vec<BillOfEntry>>;
    async fn sales_invoices(&self) -> StoreResult<Vec<SalesInvoice>>;

    async fn insert_warehouse(&self, warehouse: &NewWarehouse) -> StoreResult<i64>;
    async fn insert_client(&self, name: &str) -> StoreResult<i64>;
    async fn insert_customer(&self, name: &str) -> StoreResult<i64>;
    async fn insert_item(&self, item: &NewItem) -> StoreResult<i64>;

    /// Item rates plus the carton count held for (warehouse, client), if any.
    async fn rate(&self, key: &BalanceKey) -> StoreResult<Option<Rate>>;

    async fn snapshot(&self, key: &BalanceKey) -> StoreResult<Option<BalanceSnapshot>>;

    async fn stock(&self, query: &StockQuery) -> StoreResult<Vec<StockRow>>;

    /// Every ledger row joined with its names and trackers, ordered by id.
    async fn ledger(&self) -> StoreResult<Vec<LedgerEntry>>;

    /// Applies an administrative update. Returns false if no such movement.
    async fn update_movement(&self, id: i64, update: &AdminUpdate) -> StoreResult<bool>;

    /// Inserts a user unless the username is taken; `None` when taken.
    async fn insert_user(&self, user: &NewUser) -> StoreResult<Option<Uuid>>;
    async fn user_by_name(&self, username: &str) -> StoreResult<Option<User>>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}
