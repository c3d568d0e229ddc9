//! Validate, link, append and balance one movement as a single unit of work.

use std::sync::Arc;

use log::{error, info, warn};
use serde::Serialize;

use super::balance::{commit_balance, BalanceCommit};
use super::resolver::resolve_document;
use super::validation::{validate_movement, QuantityRule};
use crate::error::{store_failure, InventoryError, InventoryResult};
use crate::models::{BalanceSnapshot, Direction, MovementRecord, MovementRequest};
use crate::store::Store;

/// What a successfully recorded movement produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub movement_id: i64,
    pub bill_of_entry_id: Option<i64>,
    pub sales_invoice_id: Option<i64>,
    pub balance: BalanceSnapshot,
}

#[derive(Clone)]
pub struct TransactionRecorder {
    store: Arc<dyn Store>,
    rule: QuantityRule,
}

impl TransactionRecorder {
    pub fn new(store: Arc<dyn Store>, rule: QuantityRule) -> Self {
        Self { store, rule }
    }

    /// Records a movement. Nothing is written unless every step succeeds:
    /// the store transaction is dropped, and so rolled back, on any error.
    pub async fn record(&self, request: &MovementRequest) -> InventoryResult<Receipt> {
        let figures = &request.figures;
        let direction = figures.direction;

        if let Err(failure) = validate_movement(figures, self.rule) {
            warn!("{} movement rejected by {} check: {}", direction, failure.check(), failure);
            return Err(failure.into());
        }

        let mut tx = self.store.begin().await?;

        let owner_id = match direction {
            Direction::In => Some(request.client_id),
            Direction::Out => request.customer_id,
        };
        let document_id = resolve_document(tx.as_mut(), direction, &request.document, owner_id).await?;

        let (bill_of_entry_id, sales_invoice_id) = match direction {
            Direction::In => (Some(document_id), None),
            Direction::Out => (request.source_bill_id, Some(document_id)),
        };

        let record = MovementRecord {
            direction,
            bill_of_entry_id,
            sales_invoice_id,
            item_id: request.item_id,
            warehouse_id: request.warehouse_id,
            client_id: request.client_id,
            customer_id: request.customer_id,
            big_quantity: direction.signed(figures.big_quantity),
            prior_value: figures.prior_value,
            change_value: figures.change_value,
            result_value: figures.result_value,
            rates: figures.rates,
            total_pieces: figures.total_pieces,
            values: figures.values,
            value_per_piece: request.value_per_piece,
            is_paid: request.is_paid,
            paid_amount: request.paid_amount,
            payment_date: request.payment_date,
            field1: request.field1.clone(),
            field2: request.field2.clone(),
            remarks: request.remarks.clone(),
        };

        let movement_id = tx.insert_movement(&record).await.map_err(|err| {
            error!("ledger insert failed: {}", err);
            store_failure(err, InventoryError::PersistenceFailed)
        })?;

        let balance = commit_balance(
            tx.as_mut(),
            &BalanceCommit {
                key: request.balance_key(),
                direction,
                prior_value: figures.prior_value,
                big_quantity: figures.big_quantity,
                rates: figures.rates,
            },
        )
        .await?;

        tx.commit().await.map_err(|err| {
            error!("commit of movement {} failed: {}", movement_id, err);
            InventoryError::from(err)
        })?;

        info!(
            "recorded {} movement {} for item {} (big quantity now {})",
            direction, movement_id, request.item_id, balance.quantities.big
        );

        Ok(Receipt {
            movement_id,
            bill_of_entry_id,
            sales_invoice_id,
            balance,
        })
    }
}
