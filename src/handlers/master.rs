//! Master data: warehouses, clients, customers, items and documents.

use axum::{
    extract::{Form, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use log::info;
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_cookies::Cookies;

use super::{optional_id, required_decimal, required_id, required_text, Created};
use crate::{
    error::{InventoryError, InventoryResult},
    ledger::query_rate,
    middleware::{require_permission, Permission},
    models::{
        inventory::{distinct_column, group_by_location, group_by_name},
        BalanceKey, BillOfEntry, Client, Customer, ItemColumn, NewItem, NewWarehouse, Rate,
        SalesInvoice, WarehouseGroup, WarehouseLabel,
    },
    AppState,
};

pub async fn warehouses_by_location(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> InventoryResult<Json<Vec<WarehouseGroup>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    let warehouses = state.store.warehouses().await?;
    Ok(Json(group_by_location(&warehouses)))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> InventoryResult<Json<Vec<WarehouseLabel>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    let warehouses = state.store.warehouses().await?;
    Ok(Json(warehouses.iter().map(WarehouseLabel::from).collect()))
}

pub async fn list_clients(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> InventoryResult<Json<Vec<Client>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    Ok(Json(state.store.clients().await?))
}

pub async fn list_customers(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> InventoryResult<Json<Vec<Customer>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    Ok(Json(state.store.customers().await?))
}

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    only: Option<String>,
}

/// Items grouped by name, or with `?only=` the distinct values of one column.
pub async fn list_items(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Query(query): Query<ItemsQuery>,
) -> InventoryResult<Response> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    let items = state.store.items().await?;

    match query.only.as_deref() {
        Some(raw) => {
            let column = ItemColumn::parse(raw)
                .ok_or_else(|| InventoryError::invalid_input(format!("cannot list column '{raw}'")))?;
            Ok(Json(distinct_column(&items, column)).into_response())
        }
        None => Ok(Json(group_by_name(&items)).into_response()),
    }
}

pub async fn list_bills(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> InventoryResult<Json<Vec<BillOfEntry>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    Ok(Json(state.store.bills_of_entry().await?))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> InventoryResult<Json<Vec<SalesInvoice>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;
    Ok(Json(state.store.sales_invoices().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateForm {
    item_id: Option<String>,
    warehouse_id: Option<String>,
    client_id: Option<String>,
}

pub async fn rate(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<RateForm>,
) -> InventoryResult<Json<Rate>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;

    let key = BalanceKey {
        item_id: required_id("itemId", &form.item_id)?,
        // Without a warehouse/client the carton count is simply 0.
        warehouse_id: optional_id("warehouseId", &form.warehouse_id)?.unwrap_or(0),
        client_id: optional_id("clientId", &form.client_id)?.unwrap_or(0),
    };
    Ok(Json(query_rate(state.store.as_ref(), &key).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseForm {
    name: Option<String>,
    location: Option<String>,
    gstin: Option<String>,
    contact_name: Option<String>,
    contact_number: Option<String>,
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn register_warehouse(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<WarehouseForm>,
) -> InventoryResult<Json<Created>> {
    require_permission(&cookies, &headers, &state, Permission::CreateNew).await?;

    let warehouse = NewWarehouse {
        name: required_text("name", &form.name)?,
        location: required_text("location", &form.location)?,
        gstin: optional_text(form.gstin),
        contact_name: optional_text(form.contact_name),
        contact_number: optional_text(form.contact_number),
    };
    let id = state.store.insert_warehouse(&warehouse).await?;
    info!("registered warehouse {} ({})", id, warehouse.name);
    Ok(Created::new(id))
}

#[derive(Debug, Deserialize)]
pub struct NameForm {
    name: Option<String>,
}

pub async fn register_client(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<NameForm>,
) -> InventoryResult<Json<Created>> {
    require_permission(&cookies, &headers, &state, Permission::CreateNew).await?;
    let name = required_text("name", &form.name)?;
    let id = state.store.insert_client(&name).await?;
    info!("registered client {} ({})", id, name);
    Ok(Created::new(id))
}

pub async fn register_customer(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<NameForm>,
) -> InventoryResult<Json<Created>> {
    require_permission(&cookies, &headers, &state, Permission::CreateNew).await?;
    let name = required_text("name", &form.name)?;
    let id = state.store.insert_customer(&name).await?;
    info!("registered customer {} ({})", id, name);
    Ok(Created::new(id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemForm {
    name: Option<String>,
    variant: Option<String>,
    hsn_code: Option<String>,
    uom_raw: Option<String>,
    uom_small: Option<String>,
    uom_big: Option<String>,
    raw_per_small: Option<String>,
    small_per_big: Option<String>,
}

pub async fn register_item(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<ItemForm>,
) -> InventoryResult<Json<Created>> {
    require_permission(&cookies, &headers, &state, Permission::CreateNew).await?;

    let item = NewItem {
        name: required_text("name", &form.name)?,
        variant: optional_text(form.variant).unwrap_or_default(),
        hsn_code: optional_text(form.hsn_code).unwrap_or_default(),
        uom_raw: required_text("uomRaw", &form.uom_raw)?,
        uom_small: required_text("uomSmall", &form.uom_small)?,
        uom_big: required_text("uomBig", &form.uom_big)?,
        raw_per_small: required_decimal("rawPerSmall", &form.raw_per_small)?,
        small_per_big: required_decimal("smallPerBig", &form.small_per_big)?,
    };
    if item.raw_per_small <= Decimal::ZERO || item.small_per_big <= Decimal::ZERO {
        return Err(InventoryError::invalid_input("conversion rates must be positive"));
    }

    let id = state.store.insert_item(&item).await?;
    info!("registered item {} ({} {})", id, item.name, item.variant);
    Ok(Created::new(id))
}
