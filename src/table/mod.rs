//! The remote datasheet: wire types, expense records, and the HTTP client.

pub mod api_types;
pub mod category;
pub mod client;
pub mod normalize;
pub mod types;

pub use api_types::{Field, WriteRecord, WriteResponse};
pub use category::Category;
pub use client::{RecordStore, TableClient};
pub use types::{ExpenseFields, ExpenseRecord, RecordSet};
