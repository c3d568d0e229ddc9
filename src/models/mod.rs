pub mod document;
pub mod inventory;
pub mod movement;
pub mod user;

pub use document::{BillOfEntry, Direction, DocumentKind, DocumentRef, NewDocument, SalesInvoice};
pub use inventory::{
    Client, Customer, Item, ItemColumn, ItemGroup, NewItem, NewWarehouse, Rate, StockQuery,
    StockRow, Warehouse, WarehouseGroup, WarehouseLabel,
};
pub use movement::{
    AdminUpdate, BalanceKey, BalanceSnapshot, ConversionRates, LedgerEntry, Movement,
    MovementFigures, MovementRecord, MovementRequest, MovementValues, UnitQuantities,
};
pub use user::{LoginResponse, NewUser, Permissions, User};
