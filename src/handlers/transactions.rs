//! Recording movements and editing their administrative fields.

use axum::{
    extract::{Form, Path, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::{
    flag, optional_date, optional_decimal, optional_id, required_decimal, required_id, required_text,
    Outcome,
};
use crate::{
    error::{InventoryError, InventoryResult},
    ledger::{update_movement, Receipt},
    middleware::{require_permission, Permission},
    models::{
        AdminUpdate, ConversionRates, Direction, DocumentRef, MovementFigures, MovementRequest,
        MovementValues,
    },
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    pub direction: Option<String>,
    /// "true" when the movement opens a new bill of entry or sales invoice.
    pub is_new: Option<String>,
    pub bill_of_entry: Option<String>,
    pub bill_of_entry_id: Option<String>,
    pub sales_invoice: Option<String>,
    pub sales_invoice_id: Option<String>,
    pub entry_date: Option<String>,
    pub item_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub client_id: Option<String>,
    pub customer_id: Option<String>,
    pub big_quantity: Option<String>,
    pub prior_value: Option<String>,
    pub change_value: Option<String>,
    pub result_value: Option<String>,
    pub small_per_big: Option<String>,
    pub raw_per_small: Option<String>,
    pub total_pieces: Option<String>,
    pub assessed_value: Option<String>,
    pub duty_value: Option<String>,
    pub gst_value: Option<String>,
    pub total_value: Option<String>,
    pub value_per_piece: Option<String>,
    pub is_paid: Option<String>,
    pub paid_amount: Option<String>,
    pub payment_date: Option<String>,
    pub field1: Option<String>,
    pub field2: Option<String>,
    pub remarks: Option<String>,
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn document_ref(
    is_new: bool,
    tracker: &Option<String>,
    tracker_field: &str,
    id: Option<i64>,
    entry_date: &Option<String>,
) -> InventoryResult<DocumentRef> {
    if let Some(id) = id {
        return Ok(DocumentRef::Id { id });
    }
    let tracker = required_text(tracker_field, tracker)?;
    if is_new {
        let entry_date = optional_date("entryDate", entry_date)?
            .ok_or_else(|| InventoryError::invalid_input("entryDate is required for a new document"))?;
        Ok(DocumentRef::New { tracker, entry_date })
    } else {
        Ok(DocumentRef::Existing { tracker })
    }
}

impl TransactionForm {
    pub fn direction(&self) -> InventoryResult<Direction> {
        self.direction
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(InventoryError::InvalidInput)
    }

    pub fn into_request(self) -> InventoryResult<MovementRequest> {
        let direction = self.direction()?;
        let is_new = flag(&self.is_new);
        let bill_of_entry_id = optional_id("billOfEntryId", &self.bill_of_entry_id)?;

        let (document, source_bill_id) = match direction {
            Direction::In => (
                document_ref(is_new, &self.bill_of_entry, "billOfEntry", bill_of_entry_id, &self.entry_date)?,
                None,
            ),
            Direction::Out => (
                document_ref(
                    is_new,
                    &self.sales_invoice,
                    "salesInvoice",
                    optional_id("salesInvoiceId", &self.sales_invoice_id)?,
                    &self.entry_date,
                )?,
                bill_of_entry_id,
            ),
        };

        let figures = MovementFigures {
            direction,
            prior_value: required_id("priorValue", &self.prior_value)?,
            change_value: required_id("changeValue", &self.change_value)?,
            result_value: required_id("resultValue", &self.result_value)?,
            big_quantity: required_decimal("bigQuantity", &self.big_quantity)?.abs(),
            rates: ConversionRates {
                small_per_big: required_decimal("smallPerBig", &self.small_per_big)?,
                raw_per_small: required_decimal("rawPerSmall", &self.raw_per_small)?,
            },
            total_pieces: required_decimal("totalPieces", &self.total_pieces)?,
            values: MovementValues {
                assessed: required_decimal("assessedValue", &self.assessed_value)?,
                duty: required_decimal("dutyValue", &self.duty_value)?,
                gst: required_decimal("gstValue", &self.gst_value)?,
                total: required_decimal("totalValue", &self.total_value)?,
            },
        };

        Ok(MovementRequest {
            document,
            source_bill_id,
            item_id: required_id("itemId", &self.item_id)?,
            warehouse_id: required_id("warehouseId", &self.warehouse_id)?,
            client_id: required_id("clientId", &self.client_id)?,
            customer_id: optional_id("customerId", &self.customer_id)?,
            figures,
            value_per_piece: optional_decimal("valuePerPiece", &self.value_per_piece)?,
            is_paid: flag(&self.is_paid),
            paid_amount: optional_decimal("paidAmount", &self.paid_amount)?.unwrap_or(Decimal::ZERO),
            payment_date: optional_date("paymentDate", &self.payment_date)?,
            field1: text(&self.field1),
            field2: text(&self.field2),
            remarks: text(&self.remarks),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Recorded {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: Receipt,
}

pub async fn record_transaction(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<TransactionForm>,
) -> InventoryResult<Json<Recorded>> {
    // Callers are authenticated before their direction is parsed.
    let direction = form.direction();
    let permission = match direction {
        Ok(Direction::Out) => Permission::TransactionOut,
        _ => Permission::TransactionIn,
    };
    require_permission(&cookies, &headers, &state, permission).await?;
    direction?;

    let request = form.into_request()?;
    let receipt = state.recorder.record(&request).await?;
    Ok(Json(Recorded {
        success: true,
        receipt,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValueForm {
    value: Option<String>,
}

async fn apply_update(
    state: &AppState,
    cookies: &Cookies,
    headers: &HeaderMap,
    id: i64,
    update: AdminUpdate,
) -> InventoryResult<Json<Outcome>> {
    require_permission(cookies, headers, state, Permission::View).await?;
    update_movement(state.store.as_ref(), id, &update).await?;
    Ok(Outcome::ok())
}

pub async fn set_paid_amount(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ValueForm>,
) -> InventoryResult<Json<Outcome>> {
    let amount = required_decimal("value", &form.value)?;
    apply_update(&state, &cookies, &headers, id, AdminUpdate::PaidAmount(amount)).await
}

pub async fn set_payment_date(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ValueForm>,
) -> InventoryResult<Json<Outcome>> {
    let date = optional_date("value", &form.value)?;
    apply_update(&state, &cookies, &headers, id, AdminUpdate::PaymentDate(date)).await
}

pub async fn set_field1(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ValueForm>,
) -> InventoryResult<Json<Outcome>> {
    apply_update(&state, &cookies, &headers, id, AdminUpdate::Field1(text(&form.value))).await
}

pub async fn set_field2(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ValueForm>,
) -> InventoryResult<Json<Outcome>> {
    apply_update(&state, &cookies, &headers, id, AdminUpdate::Field2(text(&form.value))).await
}

pub async fn set_remarks(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ValueForm>,
) -> InventoryResult<Json<Outcome>> {
    apply_update(&state, &cookies, &headers, id, AdminUpdate::Remarks(text(&form.value))).await
}

pub async fn set_error_flag(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ValueForm>,
) -> InventoryResult<Json<Outcome>> {
    apply_update(&state, &cookies, &headers, id, AdminUpdate::ErrorFlag(flag(&form.value))).await
}
