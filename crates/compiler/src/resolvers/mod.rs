pub mod columns;
pub mod order;
pub mod where_clause;
