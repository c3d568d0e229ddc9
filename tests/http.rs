mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use bonded_inventory::{config::Config, create_router, store::MemoryStore, AppState};

fn app(auth_required: bool) -> Router {
    app_on(Arc::new(MemoryStore::new()), auth_required)
}

fn app_on(store: Arc<MemoryStore>, auth_required: bool) -> Router {
    let config = Config {
        auth_required,
        jwt_secret: "test-secret".into(),
        ..Default::default()
    };
    create_router(AppState::new(store, config))
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn seed_master_data(app: &Router) {
    for (uri, body) in [
        ("/inventory/api/clients", "name=Acme+Imports"),
        ("/inventory/api/customers", "name=Harbour+Retail"),
        ("/inventory/api/warehouses", "name=Bond+4&location=Chennai"),
        (
            "/inventory/api/items",
            "name=Bolts&variant=M8&hsnCode=7318&uomRaw=pcs&uomSmall=box&uomBig=carton&rawPerSmall=10&smallPerBig=12",
        ),
    ] {
        let (status, body) = send(app, form(uri, body)).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["id"], 1);
    }
}

const INBOUND: &str = "direction=in&isNew=true&billOfEntry=BE-1&entryDate=2024-05-01\
&itemId=1&warehouseId=1&clientId=1&bigQuantity=5&priorValue=0&changeValue=5&resultValue=5\
&smallPerBig=12&rawPerSmall=10&totalPieces=600\
&assessedValue=500&dutyValue=52.50&gstValue=94.50&totalValue=647";

#[tokio::test]
async fn root_answers_ok() {
    let app = app(false);
    let response = app.oneshot(get("/inventory")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn movement_flows_from_form_to_reports() {
    let app = app(false);
    seed_master_data(&app).await;

    let (status, body) = send(&app, form("/inventory/api/transactions", INBOUND)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["billOfEntryId"], 1);

    let outbound = "direction=out&isNew=true&salesInvoice=SI-1&entryDate=2024-05-03&billOfEntryId=1\
&itemId=1&warehouseId=1&clientId=1&customerId=1&bigQuantity=2&priorValue=5&changeValue=-2&resultValue=3\
&smallPerBig=12&rawPerSmall=10&totalPieces=240\
&assessedValue=200&dutyValue=21&gstValue=37.80&totalValue=258.80&isPaid=false";
    let (status, body) = send(&app, form("/inventory/api/transactions", outbound)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["salesInvoiceId"], 1);

    let (status, rows) = send(&app, form("/inventory/api/search/overview", "tracker=all&direction=all")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["direction"], "in");
    assert_eq!(rows[0]["billOfEntry"], "BE-1");
    assert_eq!(rows[1]["direction"], "out");
    assert_eq!(rows[1]["salesInvoice"], "SI-1");
    assert_eq!(rows[1]["customer"], "Harbour Retail");

    let (_, stock) = send(&app, form("/inventory/api/search/stock", "itemId=1&warehouseId=&clientId=")).await;
    assert_eq!(stock.as_array().unwrap().len(), 1);
    assert_eq!(stock[0]["bigcartonQuantity"], "3");
    assert_eq!(stock[0]["warehouseName"], "Bond 4");

    let (_, rate) = send(&app, form("/inventory/api/rate", "itemId=1&warehouseId=1&clientId=1")).await;
    assert_eq!(rate["cartonQuantity"], "3");
    assert_eq!(rate["bigUnit"], "carton");

    let (_, movements) = send(&app, form("/inventory/api/search/movements", "direction=out")).await;
    assert_eq!(movements.as_array().unwrap().len(), 1);
    assert_eq!(movements[0]["billOfEntry"], "BE-1");

    let (status, _) = send(&app, form("/inventory/api/transactions/2/remarks", "value=short+shipped")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, movements) = send(&app, form("/inventory/api/search/movements", "")).await;
    assert_eq!(movements[1]["remarks"], "short shipped");
}

#[tokio::test]
async fn rejected_movement_reports_the_reason() {
    let app = app(false);
    seed_master_data(&app).await;

    let unbalanced = INBOUND.replace("totalValue=647", "totalValue=650");
    let (status, body) = send(&app, form("/inventory/api/transactions", &unbalanced)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["reason"].as_str().unwrap().contains("(value)"));

    let (_, bills) = send(&app, get("/inventory/api/bills")).await;
    assert!(bills.as_array().unwrap().is_empty());

    let (status, _) = send(&app, form("/inventory/api/transactions", INBOUND)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, form("/inventory/api/transactions", INBOUND)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn item_listing_can_select_one_column() {
    let app = app(false);
    seed_master_data(&app).await;

    let (_, groups) = send(&app, get("/inventory/api/items")).await;
    assert_eq!(groups[0]["name"], "Bolts");
    assert_eq!(groups[0]["itemId"][0], 1);

    let (_, names) = send(&app, get("/inventory/api/items?only=hsn_code")).await;
    assert_eq!(names, serde_json::json!(["7318"]));

    let (status, _) = send(&app, get("/inventory/api/items?only=password")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, locations) = send(&app, get("/inventory/api/warehouses/by-location")).await;
    assert_eq!(locations[0]["warehouseLocation"], "Chennai");
    let (_, labels) = send(&app, get("/inventory/api/warehouses")).await;
    assert_eq!(labels[0]["warehouseName"], "Bond 4, Chennai");
}

#[tokio::test]
async fn permissions_are_enforced_when_auth_is_on() {
    let app = app(true);

    let (status, body) = send(&app, get("/inventory/api/clients")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        form("/inventory/api/register", "username=clerk&password=pw&permission_view=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, form("/inventory/api/login", "username=clerk&password=wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(form("/inventory/api/login", "username=clerk&password=pw"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let login: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(login["permission_view"], true);
    assert_eq!(login["permission_createNew"], false);

    let authed = |request: Request<Body>| {
        let (mut parts, body) = request.into_parts();
        parts.headers.insert(header::COOKIE, cookie.parse().unwrap());
        Request::from_parts(parts, body)
    };

    let (status, _) = send(&app, authed(get("/inventory/api/clients"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, authed(form("/inventory/api/clients", "name=Acme"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "missing permission: createNew");

    let (status, _) = send(&app, authed(form("/inventory/api/transactions", INBOUND))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unauthenticated_transaction_is_refused_before_parsing() {
    let app = app(true);

    let (status, _) = send(&app, form("/inventory/api/transactions", "direction=sideways")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, form("/inventory/api/transactions", INBOUND)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn store_outage_during_auth_is_not_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let app = app_on(store.clone(), true);

    let (status, _) = send(
        &app,
        form("/inventory/api/register", "username=clerk&password=pw&permission_view=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(form("/inventory/api/login", "username=clerk&password=pw"))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    store.set_reachable(false);
    let mut request = get("/inventory/api/clients");
    request.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

