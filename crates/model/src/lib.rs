pub mod core;
pub mod filter;
pub mod records;
pub mod schema;
