#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bonded_inventory::{
    models::{
        ConversionRates, Direction, DocumentRef, MovementFigures, MovementRequest, MovementValues,
        NewItem, NewWarehouse,
    },
    store::{MemoryStore, Store},
};

pub struct Seeded {
    pub store: Arc<MemoryStore>,
    pub client_id: i64,
    pub customer_id: i64,
    pub warehouse_id: i64,
    pub item_id: i64,
}

/// One client, customer, warehouse and an item packed 12 boxes per carton,
/// 10 pieces per box.
pub async fn seeded_store() -> Seeded {
    let store = Arc::new(MemoryStore::new());
    let client_id = store.insert_client("Acme Imports").await.unwrap();
    let customer_id = store.insert_customer("Harbour Retail").await.unwrap();
    let warehouse_id = store
        .insert_warehouse(&NewWarehouse {
            name: "Bond 4".into(),
            location: "Chennai".into(),
            gstin: None,
            contact_name: None,
            contact_number: None,
        })
        .await
        .unwrap();
    let item_id = store
        .insert_item(&NewItem {
            name: "Bolts".into(),
            variant: "M8".into(),
            hsn_code: "7318".into(),
            uom_raw: "pcs".into(),
            uom_small: "box".into(),
            uom_big: "carton".into(),
            raw_per_small: Decimal::from(10),
            small_per_big: Decimal::from(12),
        })
        .await
        .unwrap();

    Seeded {
        store,
        client_id,
        customer_id,
        warehouse_id,
        item_id,
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

impl Seeded {
    /// A balanced movement of `big` cartons moving stock from `prior`.
    pub fn movement(&self, direction: Direction, document: DocumentRef, prior: i64, big: i64) -> MovementRequest {
        let change = match direction {
            Direction::In => big,
            Direction::Out => -big,
        };
        MovementRequest {
            document,
            source_bill_id: None,
            item_id: self.item_id,
            warehouse_id: self.warehouse_id,
            client_id: self.client_id,
            customer_id: match direction {
                Direction::In => None,
                Direction::Out => Some(self.customer_id),
            },
            figures: MovementFigures {
                direction,
                prior_value: prior,
                change_value: change,
                result_value: prior + change,
                big_quantity: Decimal::from(big),
                rates: ConversionRates {
                    small_per_big: Decimal::from(12),
                    raw_per_small: Decimal::from(10),
                },
                total_pieces: Decimal::from(big * 120),
                values: MovementValues {
                    assessed: Decimal::new(100_00, 2) * Decimal::from(big),
                    duty: Decimal::new(10_50, 2) * Decimal::from(big),
                    gst: Decimal::new(18_90, 2) * Decimal::from(big),
                    total: Decimal::new(129_40, 2) * Decimal::from(big),
                },
            },
            value_per_piece: None,
            is_paid: false,
            paid_amount: Decimal::ZERO,
            payment_date: None,
            field1: String::new(),
            field2: String::new(),
            remarks: String::new(),
        }
    }
}

pub fn new_doc(tracker: &str, day: u32) -> DocumentRef {
    DocumentRef::New {
        tracker: tracker.to_string(),
        entry_date: date(day),
    }
}

pub fn existing_doc(tracker: &str) -> DocumentRef {
    DocumentRef::Existing {
        tracker: tracker.to_string(),
    }
}
