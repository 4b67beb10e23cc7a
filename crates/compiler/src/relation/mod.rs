pub mod chain;
pub mod join;
