pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use ledger::TransactionRecorder;
use store::Store;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub recorder: TransactionRecorder,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let recorder = TransactionRecorder::new(store.clone(), config.quantity_rule);
        Self {
            store,
            config: Arc::new(config),
            recorder,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    use handlers::{auth, master, search, transactions};

    let api = Router::new()
        .route("/", get(handlers::root))
        // Master data
        .route("/api/warehouses/by-location", get(master::warehouses_by_location))
        .route(
            "/api/warehouses",
            get(master::list_warehouses).post(master::register_warehouse),
        )
        .route("/api/clients", get(master::list_clients).post(master::register_client))
        .route(
            "/api/customers",
            get(master::list_customers).post(master::register_customer),
        )
        .route("/api/items", get(master::list_items).post(master::register_item))
        .route("/api/bills", get(master::list_bills))
        .route("/api/invoices", get(master::list_invoices))
        .route("/api/rate", post(master::rate))
        // Movements
        .route("/api/transactions", post(transactions::record_transaction))
        .route("/api/transactions/:id/paid-amount", post(transactions::set_paid_amount))
        .route("/api/transactions/:id/payment-date", post(transactions::set_payment_date))
        .route("/api/transactions/:id/field1", post(transactions::set_field1))
        .route("/api/transactions/:id/field2", post(transactions::set_field2))
        .route("/api/transactions/:id/remarks", post(transactions::set_remarks))
        .route("/api/transactions/:id/error", post(transactions::set_error_flag))
        // Reports
        .route("/api/search/stock", post(search::stock))
        .route("/api/search/movements", post(search::movements))
        .route("/api/search/overview", post(search::overview))
        // Users
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout));

    let service_name = state.config.service_name.clone();
    let router = if service_name.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{service_name}"), api)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(1024 * 1024)),
        )
        .with_state(state)
}
