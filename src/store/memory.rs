use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::{
    AdminUpdate, BalanceKey, BalanceSnapshot, BillOfEntry, Client, Customer, DocumentKind,
    Item, LedgerEntry, Movement, MovementRecord, NewDocument, NewItem, NewUser, NewWarehouse,
    Rate, SalesInvoice, StockQuery, StockRow, UnitQuantities, User, Warehouse,
};

#[derive(Debug, Clone)]
struct StoredInvoice {
    id: i64,
    tracker: String,
    entry_date: NaiveDate,
    customer_id: i64,
}

#[derive(Debug, Clone, Default)]
struct State {
    last_id: BTreeMap<&'static str, i64>,
    warehouses: Vec<Warehouse>,
    clients: Vec<Client>,
    customers: Vec<Customer>,
    items: Vec<Item>,
    bills: Vec<BillOfEntry>,
    invoices: Vec<StoredInvoice>,
    movements: Vec<Movement>,
    balances: BTreeMap<BalanceKey, UnitQuantities>,
    users: Vec<User>,
}

impl State {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.last_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn item(&self, id: i64) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    fn warehouse(&self, id: i64) -> Option<&Warehouse> {
        self.warehouses.iter().find(|w| w.id == id)
    }

    fn client(&self, id: i64) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    fn customer(&self, id: i64) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    fn require(found: bool, what: &str, id: i64) -> StoreResult<()> {
        if found {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("{what} {id} does not exist")))
        }
    }

    fn insert_document(&mut self, document: &NewDocument) -> StoreResult<i64> {
        match document.kind {
            DocumentKind::BillOfEntry => {
                Self::require(self.client(document.owner_id).is_some(), "client", document.owner_id)?;
                if self.bills.iter().any(|b| b.tracker == document.tracker) {
                    return Err(StoreError::Conflict(format!(
                        "bill of entry tracker '{}' exists",
                        document.tracker
                    )));
                }
                let id = self.next_id("bills_of_entry");
                self.bills.push(BillOfEntry {
                    id,
                    tracker: document.tracker.clone(),
                    entry_date: document.entry_date,
                    client_id: document.owner_id,
                });
                Ok(id)
            }
            DocumentKind::SalesInvoice => {
                Self::require(self.customer(document.owner_id).is_some(), "customer", document.owner_id)?;
                if self.invoices.iter().any(|i| i.tracker == document.tracker) {
                    return Err(StoreError::Conflict(format!(
                        "sales invoice tracker '{}' exists",
                        document.tracker
                    )));
                }
                let id = self.next_id("sales_invoices");
                self.invoices.push(StoredInvoice {
                    id,
                    tracker: document.tracker.clone(),
                    entry_date: document.entry_date,
                    customer_id: document.owner_id,
                });
                Ok(id)
            }
        }
    }

    fn find_document(&self, kind: DocumentKind, tracker: &str) -> Option<i64> {
        match kind {
            DocumentKind::BillOfEntry => self.bills.iter().find(|b| b.tracker == tracker).map(|b| b.id),
            DocumentKind::SalesInvoice => self.invoices.iter().find(|i| i.tracker == tracker).map(|i| i.id),
        }
    }

    fn insert_movement(&mut self, record: &MovementRecord) -> StoreResult<i64> {
        Self::require(self.item(record.item_id).is_some(), "item", record.item_id)?;
        Self::require(self.warehouse(record.warehouse_id).is_some(), "warehouse", record.warehouse_id)?;
        Self::require(self.client(record.client_id).is_some(), "client", record.client_id)?;
        if let Some(customer_id) = record.customer_id {
            Self::require(self.customer(customer_id).is_some(), "customer", customer_id)?;
        }
        if let Some(bill_id) = record.bill_of_entry_id {
            Self::require(self.bills.iter().any(|b| b.id == bill_id), "bill of entry", bill_id)?;
        }
        if let Some(invoice_id) = record.sales_invoice_id {
            Self::require(self.invoices.iter().any(|i| i.id == invoice_id), "sales invoice", invoice_id)?;
        }

        let id = self.next_id("movements");
        self.movements.push(Movement {
            id,
            record: record.clone(),
            is_error: false,
            recorded_at: Utc::now(),
        });
        Ok(id)
    }

    fn snapshot(&self, key: &BalanceKey) -> Option<BalanceSnapshot> {
        self.balances.get(key).map(|quantities| BalanceSnapshot {
            key: *key,
            quantities: *quantities,
        })
    }
}

/// In-memory store for tests and local runs.
///
/// Transactions take an owned lock on the whole state and work on a copy,
/// so they are serialised and a dropped transaction leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    outage: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a lost connection. While unreachable, every call, including
    /// those on open transactions, fails with `Unavailable`.
    pub fn set_reachable(&self, reachable: bool) {
        self.outage.store(!reachable, Ordering::SeqCst);
    }

    async fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        reachable(&self.outage)?;
        Ok(self.state.lock().await)
    }
}

fn reachable(outage: &AtomicBool) -> StoreResult<()> {
    if outage.load(Ordering::SeqCst) {
        Err(StoreError::Unavailable("connection refused".into()))
    } else {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
    outage: Arc<AtomicBool>,
}

impl MemoryTx {
    fn working(&mut self) -> StoreResult<&mut State> {
        reachable(&self.outage)?;
        Ok(&mut self.working)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<i64> {
        self.working()?.insert_document(document)
    }

    async fn find_document(&mut self, kind: DocumentKind, tracker: &str) -> StoreResult<Option<i64>> {
        Ok(self.working()?.find_document(kind, tracker))
    }

    async fn insert_movement(&mut self, record: &MovementRecord) -> StoreResult<i64> {
        self.working()?.insert_movement(record)
    }

    async fn lock_snapshot(&mut self, key: &BalanceKey) -> StoreResult<Option<BalanceSnapshot>> {
        Ok(self.working()?.snapshot(key))
    }

    async fn insert_snapshot(&mut self, snapshot: &BalanceSnapshot) -> StoreResult<()> {
        let working = self.working()?;
        if working.balances.contains_key(&snapshot.key) {
            return Err(StoreError::Conflict(format!("balance {:?} exists", snapshot.key)));
        }
        working.balances.insert(snapshot.key, snapshot.quantities);
        Ok(())
    }

    async fn apply_snapshot_delta(
        &mut self,
        key: &BalanceKey,
        delta: &UnitQuantities,
        expected_big: Decimal,
    ) -> StoreResult<u64> {
        match self.working()?.balances.get_mut(key) {
            Some(current) if current.big == expected_big => {
                *current = *current + *delta;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        reachable(&self.outage)?;
        let MemoryTx { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        reachable(&self.outage)?;
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            outage: self.outage.clone(),
        }))
    }

    async fn warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        Ok(self.state().await?.warehouses.clone())
    }

    async fn clients(&self) -> StoreResult<Vec<Client>> {
        Ok(self.state().await?.clients.clone())
    }

    async fn customers(&self) -> StoreResult<Vec<Customer>> {
        Ok(self.state().await?.customers.clone())
    }

    async fn items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.state().await?.items.clone())
    }

    async fn bills_of_entry(&self) -> StoreResult<Vec<BillOfEntry>> {
        Ok(self.state().await?.bills.clone())
    }

    async fn sales_invoices(&self) -> StoreResult<Vec<SalesInvoice>> {
        let state = self.state().await?;
        Ok(state
            .invoices
            .iter()
            .map(|invoice| SalesInvoice {
                id: invoice.id,
                tracker: invoice.tracker.clone(),
                entry_date: invoice.entry_date,
                customer_id: invoice.customer_id,
                customer_name: state
                    .customer(invoice.customer_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn insert_warehouse(&self, warehouse: &NewWarehouse) -> StoreResult<i64> {
        let mut state = self.state().await?;
        let id = state.next_id("warehouses");
        state.warehouses.push(Warehouse {
            id,
            name: warehouse.name.clone(),
            location: warehouse.location.clone(),
            gstin: warehouse.gstin.clone(),
            contact_name: warehouse.contact_name.clone(),
            contact_number: warehouse.contact_number.clone(),
        });
        Ok(id)
    }

    async fn insert_client(&self, name: &str) -> StoreResult<i64> {
        let mut state = self.state().await?;
        let id = state.next_id("clients");
        state.clients.push(Client {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn insert_customer(&self, name: &str) -> StoreResult<i64> {
        let mut state = self.state().await?;
        let id = state.next_id("customers");
        state.customers.push(Customer {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn insert_item(&self, item: &NewItem) -> StoreResult<i64> {
        let mut state = self.state().await?;
        let id = state.next_id("items");
        state.items.push(Item {
            id,
            name: item.name.clone(),
            variant: item.variant.clone(),
            hsn_code: item.hsn_code.clone(),
            uom_raw: item.uom_raw.clone(),
            uom_small: item.uom_small.clone(),
            uom_big: item.uom_big.clone(),
            raw_per_small: item.raw_per_small,
            small_per_big: item.small_per_big,
        });
        Ok(id)
    }

    async fn rate(&self, key: &BalanceKey) -> StoreResult<Option<Rate>> {
        let state = self.state().await?;
        let Some(item) = state.item(key.item_id) else {
            return Ok(None);
        };
        let carton_quantity = state
            .balances
            .get(key)
            .map(|q| q.big)
            .unwrap_or(Decimal::ZERO);

        Ok(Some(Rate {
            raw_per_small: item.raw_per_small,
            small_per_big: item.small_per_big,
            carton_quantity,
            small_unit: item.uom_raw.clone(),
            medium_unit: item.uom_small.clone(),
            big_unit: item.uom_big.clone(),
        }))
    }

    async fn snapshot(&self, key: &BalanceKey) -> StoreResult<Option<BalanceSnapshot>> {
        Ok(self.state().await?.snapshot(key))
    }

    async fn stock(&self, query: &StockQuery) -> StoreResult<Vec<StockRow>> {
        let state = self.state().await?;
        let rows = state
            .balances
            .iter()
            .filter(|(key, _)| query.matches(key.item_id, key.warehouse_id, key.client_id))
            .filter_map(|(key, quantities)| {
                let item = state.item(key.item_id)?;
                let warehouse = state.warehouse(key.warehouse_id)?;
                let client = state.client(key.client_id)?;
                Some(StockRow {
                    item_name: item.name.clone(),
                    item_variant: item.variant.clone(),
                    hsn_code: item.hsn_code.clone(),
                    item_quantity: quantities.item,
                    uom_raw: item.uom_raw.clone(),
                    smallbox_quantity: quantities.small,
                    uom_small: item.uom_small.clone(),
                    bigcarton_quantity: quantities.big,
                    uom_big: item.uom_big.clone(),
                    warehouse_name: warehouse.name.clone(),
                    warehouse_location: warehouse.location.clone(),
                    client_name: client.name.clone(),
                })
            })
            .collect();
        Ok(rows)
    }

    async fn ledger(&self) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state().await?;
        let entries = state
            .movements
            .iter()
            .map(|movement| {
                let record = &movement.record;
                let bill = record
                    .bill_of_entry_id
                    .and_then(|id| state.bills.iter().find(|b| b.id == id));
                let invoice = record
                    .sales_invoice_id
                    .and_then(|id| state.invoices.iter().find(|i| i.id == id));
                let item = state.item(record.item_id);
                let warehouse = state.warehouse(record.warehouse_id);

                LedgerEntry {
                    movement: movement.clone(),
                    bill_tracker: bill.map(|b| b.tracker.clone()),
                    bill_date: bill.map(|b| b.entry_date),
                    invoice_tracker: invoice.map(|i| i.tracker.clone()),
                    invoice_date: invoice.map(|i| i.entry_date),
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    item_variant: item.map(|i| i.variant.clone()).unwrap_or_default(),
                    uom_raw: item.map(|i| i.uom_raw.clone()).unwrap_or_default(),
                    warehouse_name: warehouse.map(|w| w.name.clone()).unwrap_or_default(),
                    warehouse_location: warehouse.map(|w| w.location.clone()).unwrap_or_default(),
                    client_name: state
                        .client(record.client_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                    customer_name: record
                        .customer_id
                        .and_then(|id| state.customer(id))
                        .map(|c| c.name.clone()),
                }
            })
            .collect();
        Ok(entries)
    }

    async fn update_movement(&self, id: i64, update: &AdminUpdate) -> StoreResult<bool> {
        let mut state = self.state().await?;
        match state.movements.iter_mut().find(|m| m.id == id) {
            Some(movement) => {
                movement.apply(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<Option<Uuid>> {
        let mut state = self.state().await?;
        if state.users.iter().any(|u| u.username == user.username) {
            return Ok(None);
        }
        let id = Uuid::new_v4();
        state.users.push(User {
            id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            permissions: user.permissions,
            created_at: Utc::now(),
        });
        Ok(Some(id))
    }

    async fn user_by_name(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state().await?;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state().await?;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }
}
