use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document::{Direction, DocumentRef};

/// Rates in force when a movement is committed. They are stored on the
/// movement so later item-master edits never rewrite past contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRates {
    pub small_per_big: Decimal,
    pub raw_per_small: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceKey {
    pub item_id: i64,
    pub warehouse_id: i64,
    pub client_id: i64,
}

/// A quantity expressed at all three packaging granularities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitQuantities {
    pub big: Decimal,
    pub small: Decimal,
    pub item: Decimal,
}

impl UnitQuantities {
    /// Expands a big-unit quantity, signed by direction, through both rates.
    pub fn from_big(direction: Direction, big_quantity: Decimal, rates: ConversionRates) -> Self {
        let big = direction.signed(big_quantity);
        let small = big * rates.small_per_big;
        let item = small * rates.raw_per_small;
        Self { big, small, item }
    }
}

impl std::ops::Add for UnitQuantities {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            big: self.big + rhs.big,
            small: self.small + rhs.small,
            item: self.item + rhs.item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub key: BalanceKey,
    pub quantities: UnitQuantities,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementValues {
    pub assessed: Decimal,
    pub duty: Decimal,
    pub gst: Decimal,
    pub total: Decimal,
}

/// Everything the validation engine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFigures {
    pub direction: Direction,
    pub prior_value: i64,
    pub change_value: i64,
    pub result_value: i64,
    pub big_quantity: Decimal,
    pub rates: ConversionRates,
    pub total_pieces: Decimal,
    pub values: MovementValues,
}

/// A proposed movement as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRequest {
    pub document: DocumentRef,
    /// Outbound only: the bill of entry the goods are drawn from.
    pub source_bill_id: Option<i64>,
    pub item_id: i64,
    pub warehouse_id: i64,
    pub client_id: i64,
    pub customer_id: Option<i64>,
    pub figures: MovementFigures,
    pub value_per_piece: Option<Decimal>,
    pub is_paid: bool,
    pub paid_amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub field1: String,
    pub field2: String,
    pub remarks: String,
}

impl MovementRequest {
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey {
            item_id: self.item_id,
            warehouse_id: self.warehouse_id,
            client_id: self.client_id,
        }
    }
}

/// The immutable part of a ledger row, as inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRecord {
    pub direction: Direction,
    pub bill_of_entry_id: Option<i64>,
    pub sales_invoice_id: Option<i64>,
    pub item_id: i64,
    pub warehouse_id: i64,
    pub client_id: i64,
    pub customer_id: Option<i64>,
    /// Negative for outbound movements.
    pub big_quantity: Decimal,
    pub prior_value: i64,
    pub change_value: i64,
    pub result_value: i64,
    pub rates: ConversionRates,
    pub total_pieces: Decimal,
    pub values: MovementValues,
    pub value_per_piece: Option<Decimal>,
    pub is_paid: bool,
    pub paid_amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub field1: String,
    pub field2: String,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: i64,
    #[serde(flatten)]
    pub record: MovementRecord,
    pub is_error: bool,
    pub recorded_at: DateTime<Utc>,
}

/// A ledger row joined with the names and trackers it references.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub movement: Movement,
    pub bill_tracker: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub invoice_tracker: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub item_name: String,
    pub item_variant: String,
    pub uom_raw: String,
    pub warehouse_name: String,
    pub warehouse_location: String,
    pub client_name: String,
    pub customer_name: Option<String>,
}

/// The administrative fields of a movement; nothing else is ever updated.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminUpdate {
    PaidAmount(Decimal),
    PaymentDate(Option<NaiveDate>),
    Field1(String),
    Field2(String),
    Remarks(String),
    ErrorFlag(bool),
}

/// Whole-unit comparison used to derive the paid flag.
pub fn is_fully_paid(total_value: Decimal, paid_amount: Decimal) -> bool {
    total_value.trunc() == paid_amount.trunc()
}

impl Movement {
    /// Applies an administrative update in place.
    pub fn apply(&mut self, update: &AdminUpdate) {
        let record = &mut self.record;
        match update {
            AdminUpdate::PaidAmount(amount) => {
                record.paid_amount = *amount;
                record.is_paid = is_fully_paid(record.values.total, *amount);
            }
            AdminUpdate::PaymentDate(date) => record.payment_date = *date,
            AdminUpdate::Field1(value) => record.field1 = value.clone(),
            AdminUpdate::Field2(value) => record.field2 = value.clone(),
            AdminUpdate::Remarks(value) => record.remarks = value.clone(),
            AdminUpdate::ErrorFlag(flag) => self.is_error = *flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates(small_per_big: i64, raw_per_small: i64) -> ConversionRates {
        ConversionRates {
            small_per_big: Decimal::from(small_per_big),
            raw_per_small: Decimal::from(raw_per_small),
        }
    }

    #[test]
    fn big_units_expand_through_both_rates() {
        let quantities = UnitQuantities::from_big(Direction::In, Decimal::from(5), rates(12, 10));
        assert_eq!(quantities.big, Decimal::from(5));
        assert_eq!(quantities.small, Decimal::from(60));
        assert_eq!(quantities.item, Decimal::from(600));
    }

    #[test]
    fn outbound_quantities_are_negative() {
        let quantities = UnitQuantities::from_big(Direction::Out, Decimal::from(2), rates(12, 10));
        assert_eq!(quantities.big, Decimal::from(-2));
        assert_eq!(quantities.item, Decimal::from(-240));
    }

    #[test]
    fn fractional_rates_are_kept_exact() {
        let half = ConversionRates {
            small_per_big: Decimal::new(25, 1),
            raw_per_small: Decimal::from(4),
        };
        let quantities = UnitQuantities::from_big(Direction::In, Decimal::from(3), half);
        assert_eq!(quantities.small, Decimal::new(75, 1));
        assert_eq!(quantities.item, Decimal::from(30));
    }

    #[test]
    fn paid_flag_compares_whole_units() {
        assert!(is_fully_paid(Decimal::new(10050, 2), Decimal::new(10099, 2)));
        assert!(!is_fully_paid(Decimal::new(10050, 2), Decimal::from(99)));
    }
}
