//! The movement pipeline: validate, resolve the document, append the ledger
//! row, update the balance, and report from the ledger afterwards.

pub mod balance;
pub mod overview;
pub mod recorder;
pub mod resolver;
pub mod validation;

pub use balance::{commit_balance, query_rate, search_stock, BalanceCommit};
pub use overview::{
    aggregate, query_overview, search_movements, update_movement, MovementFilter, MovementView,
    OverviewFilter, OverviewRow,
};
pub use recorder::{Receipt, TransactionRecorder};
pub use resolver::resolve_document;
pub use validation::{validate_movement, QuantityRule};
