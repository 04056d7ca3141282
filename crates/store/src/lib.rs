pub mod db;
pub mod dialect;
pub mod query;
pub mod schema;
pub mod write;

pub use db::{StatusResponse, Store};
pub use dialect::Dialect;
pub use dwlog_core::model::log::LogEntry;
pub use schema::{CreateOutcome, DropOutcome, TABLE_NAME};
pub use write::LogWriter;
