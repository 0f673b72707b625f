//! Result-set data model

pub mod table;
pub mod value;

pub use table::{ResultTable, TableError};
pub use value::Value;
