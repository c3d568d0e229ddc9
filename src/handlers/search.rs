use axum::{
    extract::{Form, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tower_cookies::Cookies;

use super::{id_list, optional_id};
use crate::{
    error::{InventoryError, InventoryResult},
    ledger::{
        overview::selected, query_overview, search_movements, search_stock, MovementFilter,
        MovementView, OverviewFilter, OverviewRow,
    },
    middleware::{require_permission, Permission},
    models::{Direction, StockQuery, StockRow},
    AppState,
};

/// Reads an optional id, where `all` or blank means no filter.
fn id_filter(name: &str, value: &Option<String>) -> InventoryResult<Option<i64>> {
    match value.as_deref().and_then(selected) {
        Some(raw) => optional_id(name, &Some(raw.to_string())),
        None => Ok(None),
    }
}

fn direction_filter(value: &Option<String>) -> InventoryResult<Option<Direction>> {
    value
        .as_deref()
        .and_then(selected)
        .map(|raw| raw.parse::<Direction>().map_err(InventoryError::InvalidInput))
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockForm {
    item_id: Option<String>,
    warehouse_id: Option<String>,
    client_id: Option<String>,
}

pub async fn stock(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<StockForm>,
) -> InventoryResult<Json<Vec<StockRow>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;

    let query = StockQuery {
        item_ids: id_list("itemId", &form.item_id)?,
        warehouse_ids: id_list("warehouseId", &form.warehouse_id)?,
        client_ids: id_list("clientId", &form.client_id)?,
    };
    Ok(Json(search_stock(state.store.as_ref(), &query).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSearchForm {
    bill_of_entry_id: Option<String>,
    client_id: Option<String>,
    customer_id: Option<String>,
    direction: Option<String>,
}

pub async fn movements(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<MovementSearchForm>,
) -> InventoryResult<Json<Vec<MovementView>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;

    let filter = MovementFilter {
        bill_of_entry_id: id_filter("billOfEntryId", &form.bill_of_entry_id)?,
        client_id: id_filter("clientId", &form.client_id)?,
        customer_id: id_filter("customerId", &form.customer_id)?,
        direction: direction_filter(&form.direction)?,
    };
    Ok(Json(search_movements(state.store.as_ref(), &filter).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewForm {
    tracker: Option<String>,
    client_id: Option<String>,
    customer_id: Option<String>,
    direction: Option<String>,
    item_name: Option<String>,
}

pub async fn overview(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<OverviewForm>,
) -> InventoryResult<Json<Vec<OverviewRow>>> {
    require_permission(&cookies, &headers, &state, Permission::View).await?;

    let filter = OverviewFilter {
        tracker: form.tracker.as_deref().and_then(selected).map(str::to_string),
        client_id: id_filter("clientId", &form.client_id)?,
        customer_id: id_filter("customerId", &form.customer_id)?,
        direction: direction_filter(&form.direction)?,
        item_name: form.item_name.as_deref().and_then(selected).map(str::to_string),
    };
    Ok(Json(query_overview(state.store.as_ref(), &filter).await?))
}
