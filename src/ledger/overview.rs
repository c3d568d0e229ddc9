//! Document-level reporting rebuilt from the movement ledger.
//!
//! Reports read the immutable ledger, never the balance snapshot. Movements
//! are first paired by (bill of entry, sales invoice), the pairings are
//! filtered, and the survivors are folded into one row per (bill of entry,
//! direction).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{InventoryError, InventoryResult};
use crate::models::{AdminUpdate, Direction, LedgerEntry};
use crate::store::Store;

const DISPLAY_LIMIT: usize = 30;
const PLACEHOLDER: &str = "...";
const NO_DOCUMENT: &str = "N/A";

/// Treats `""` and `"all"` as "no filter".
pub fn selected(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(raw)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverviewFilter {
    /// Matches either the bill-of-entry or the sales-invoice tracker.
    pub tracker: Option<String>,
    pub client_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub direction: Option<Direction>,
    pub item_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewRow {
    pub bill_of_entry_id: Option<i64>,
    pub bill_of_entry: String,
    pub sales_invoice_ids: Vec<i64>,
    pub sales_invoice: String,
    pub direction: Direction,
    pub entry_date: String,
    pub item_name: String,
    pub warehouse: String,
    pub client: String,
    pub customer: String,
    pub big_quantity: Decimal,
    pub total_value: Decimal,
    pub paid_amount: Decimal,
    pub is_paid: String,
    pub payment_date: String,
}

struct Pairing<'a> {
    bill_of_entry_id: Option<i64>,
    direction: Direction,
    client_id: i64,
    customer_id: Option<i64>,
    entries: Vec<&'a LedgerEntry>,
}

impl Pairing<'_> {
    fn bill_tracker(&self) -> Option<&str> {
        self.entries.iter().find_map(|e| e.bill_tracker.as_deref())
    }

    fn invoice_tracker(&self) -> Option<&str> {
        self.entries.iter().find_map(|e| e.invoice_tracker.as_deref())
    }

    fn matches(&self, filter: &OverviewFilter) -> bool {
        if let Some(tracker) = filter.tracker.as_deref() {
            if self.bill_tracker() != Some(tracker) && self.invoice_tracker() != Some(tracker) {
                return false;
            }
        }
        if filter.client_id.is_some_and(|id| id != self.client_id) {
            return false;
        }
        if filter.customer_id.is_some() && filter.customer_id != self.customer_id {
            return false;
        }
        true
    }
}

#[derive(Default)]
struct RowTotals {
    bill_tracker: Option<String>,
    invoice_ids: BTreeSet<i64>,
    invoice_trackers: BTreeSet<String>,
    dates: BTreeSet<NaiveDate>,
    items: BTreeSet<String>,
    warehouses: BTreeSet<String>,
    clients: BTreeSet<String>,
    customers: BTreeSet<String>,
    big_quantity: Decimal,
    total_value: Decimal,
    paid_amount: Decimal,
}

impl RowTotals {
    fn add(&mut self, direction: Direction, entry: &LedgerEntry) {
        let movement = &entry.movement.record;

        if self.bill_tracker.is_none() {
            self.bill_tracker = entry.bill_tracker.clone();
        }
        if let Some(id) = movement.sales_invoice_id {
            self.invoice_ids.insert(id);
        }
        if let Some(tracker) = &entry.invoice_tracker {
            self.invoice_trackers.insert(tracker.clone());
        }
        let date = match direction {
            Direction::In => entry.bill_date,
            Direction::Out => entry.invoice_date,
        };
        if let Some(date) = date {
            self.dates.insert(date);
        }
        self.items.insert(entry.item_name.clone());
        self.warehouses
            .insert(format!("{}, {}", entry.warehouse_name, entry.warehouse_location));
        self.clients.insert(entry.client_name.clone());
        if let Some(customer) = &entry.customer_name {
            self.customers.insert(customer.clone());
        }

        self.big_quantity += movement.big_quantity;
        self.total_value += movement.values.total;
        self.paid_amount += movement.paid_amount;
    }

    fn into_row(self, bill_of_entry_id: Option<i64>, direction: Direction) -> OverviewRow {
        OverviewRow {
            bill_of_entry_id,
            bill_of_entry: truncate_display(self.bill_tracker.unwrap_or_else(|| NO_DOCUMENT.to_string())),
            sales_invoice_ids: self.invoice_ids.into_iter().collect(),
            sales_invoice: truncate_display(join(self.invoice_trackers)),
            direction,
            entry_date: truncate_display(join(self.dates.iter().map(|d| d.to_string()))),
            item_name: truncate_display(join(self.items)),
            warehouse: truncate_display(join(self.warehouses)),
            client: truncate_display(join(self.clients)),
            customer: truncate_display(join(self.customers)),
            big_quantity: self.big_quantity,
            total_value: self.total_value,
            paid_amount: self.paid_amount,
            is_paid: PLACEHOLDER.to_string(),
            payment_date: PLACEHOLDER.to_string(),
        }
    }
}

fn join(values: impl IntoIterator<Item = String>) -> String {
    values.into_iter().collect::<Vec<_>>().join(", ")
}

/// Cuts a display string to 30 characters and marks the cut with `...`.
pub fn truncate_display(value: String) -> String {
    if value.chars().count() <= DISPLAY_LIMIT {
        return value;
    }
    let mut cut: String = value.chars().take(DISPLAY_LIMIT).collect();
    cut.push_str(PLACEHOLDER);
    cut
}

/// Builds overview rows from enriched ledger entries.
pub fn aggregate(entries: &[LedgerEntry], filter: &OverviewFilter) -> Vec<OverviewRow> {
    let mut pairings: BTreeMap<(Option<i64>, Option<i64>), Vec<&LedgerEntry>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| !e.movement.is_error) {
        let record = &entry.movement.record;
        pairings
            .entry((record.bill_of_entry_id, record.sales_invoice_id))
            .or_default()
            .push(entry);
    }

    let pairings = pairings.into_iter().filter_map(|((bill_of_entry_id, _), entries)| {
        let direction = if entries.iter().any(|e| e.movement.record.direction == Direction::In) {
            Direction::In
        } else {
            Direction::Out
        };
        let client_id = entries.iter().map(|e| e.movement.record.client_id).min()?;
        let customer_id = entries.iter().filter_map(|e| e.movement.record.customer_id).min();
        Some(Pairing {
            bill_of_entry_id,
            direction,
            client_id,
            customer_id,
            entries,
        })
    });

    let mut groups: BTreeMap<(Option<i64>, Direction), RowTotals> = BTreeMap::new();
    for pairing in pairings.filter(|p| p.matches(filter)) {
        let totals = groups
            .entry((pairing.bill_of_entry_id, pairing.direction))
            .or_default();
        for entry in &pairing.entries {
            totals.add(pairing.direction, entry);
        }
    }

    let mut rows: Vec<_> = groups
        .into_iter()
        .filter(|((_, direction), _)| filter.direction.map_or(true, |d| d == *direction))
        .filter(|(_, totals)| {
            filter
                .item_name
                .as_deref()
                .map_or(true, |name| totals.items.contains(name))
        })
        .collect();

    // Bill id descending, rows without a bill last, inbound first on ties.
    rows.sort_by(|((bill_a, dir_a), _), ((bill_b, dir_b), _)| {
        let bill_a = bill_a.map_or(i64::MIN, |id| id);
        let bill_b = bill_b.map_or(i64::MIN, |id| id);
        bill_b.cmp(&bill_a).then(dir_a.cmp(dir_b))
    });

    rows.into_iter()
        .map(|((bill_of_entry_id, direction), totals)| totals.into_row(bill_of_entry_id, direction))
        .collect()
}

pub async fn query_overview(store: &dyn Store, filter: &OverviewFilter) -> InventoryResult<Vec<OverviewRow>> {
    let entries = store.ledger().await?;
    Ok(aggregate(&entries, filter))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub bill_of_entry_id: Option<i64>,
    pub client_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub direction: Option<Direction>,
}

impl MovementFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        let record = &entry.movement.record;
        self.bill_of_entry_id.map_or(true, |id| record.bill_of_entry_id == Some(id))
            && self.client_id.map_or(true, |id| record.client_id == id)
            && self.customer_id.map_or(true, |id| record.customer_id == Some(id))
            && self.direction.map_or(true, |d| record.direction == d)
    }
}

/// One ledger row as shown in movement searches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub id: i64,
    pub direction: Direction,
    pub bill_of_entry: String,
    pub sales_invoice: String,
    pub entry_date: Option<NaiveDate>,
    pub item_name: String,
    pub item_variant: String,
    pub warehouse: String,
    pub client_name: String,
    pub customer_name: String,
    pub big_quantity: Decimal,
    pub total_pieces: Decimal,
    pub uom_raw: String,
    pub total_value: Decimal,
    pub value_per_piece: Decimal,
    pub paid_amount: Decimal,
    pub is_paid: bool,
    pub payment_date: Option<NaiveDate>,
    pub field1: String,
    pub field2: String,
    pub remarks: String,
    pub is_error: bool,
}

impl From<&LedgerEntry> for MovementView {
    fn from(entry: &LedgerEntry) -> Self {
        let record = &entry.movement.record;
        let value_per_piece = record
            .values
            .total
            .checked_div(record.total_pieces)
            .map(|v| v.round_dp(2))
            .unwrap_or(Decimal::ZERO);
        let entry_date = match record.direction {
            Direction::In => entry.bill_date,
            Direction::Out => entry.invoice_date,
        };

        Self {
            id: entry.movement.id,
            direction: record.direction,
            bill_of_entry: entry.bill_tracker.clone().unwrap_or_else(|| NO_DOCUMENT.to_string()),
            sales_invoice: entry.invoice_tracker.clone().unwrap_or_default(),
            entry_date,
            item_name: entry.item_name.clone(),
            item_variant: entry.item_variant.clone(),
            warehouse: format!("{}, {}", entry.warehouse_name, entry.warehouse_location),
            client_name: entry.client_name.clone(),
            customer_name: entry.customer_name.clone().unwrap_or_default(),
            big_quantity: record.big_quantity,
            total_pieces: record.total_pieces,
            uom_raw: entry.uom_raw.clone(),
            total_value: record.values.total,
            value_per_piece,
            paid_amount: record.paid_amount,
            is_paid: record.is_paid,
            payment_date: record.payment_date,
            field1: record.field1.clone(),
            field2: record.field2.clone(),
            remarks: record.remarks.clone(),
            is_error: entry.movement.is_error,
        }
    }
}

/// Individual movements, errored ones included, in ledger order.
pub async fn search_movements(store: &dyn Store, filter: &MovementFilter) -> InventoryResult<Vec<MovementView>> {
    let entries = store.ledger().await?;
    Ok(entries
        .iter()
        .filter(|e| filter.matches(e))
        .map(MovementView::from)
        .collect())
}

/// Changes one administrative field of a movement.
pub async fn update_movement(store: &dyn Store, id: i64, update: &AdminUpdate) -> InventoryResult<()> {
    if !store.update_movement(id, update).await? {
        return Err(InventoryError::NotFound("movement"));
    }
    info!("movement {} updated: {:?}", id, update);
    Ok(())
}
