#[allow(clippy::module_inception)]
pub mod ledger;
pub mod memory;
pub mod model;
pub mod postgres;

pub use ledger::PurchaseLedger;
pub use memory::MemoryLedger;
pub use model::PurchaseRow;
pub use postgres::PostgresLedger;
