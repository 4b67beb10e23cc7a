pub mod error;
pub mod executor;
pub mod query;
pub mod sql;

pub use error::{ConnectorError, DbError};
pub use executor::QueryExecutor;
pub use query::EntityQuery;
