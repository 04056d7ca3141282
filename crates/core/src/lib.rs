pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod severity;
pub mod time;

pub use error::{DwLogError, Result};
