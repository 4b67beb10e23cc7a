pub mod error;
pub mod operators;
pub mod relation;
pub mod resolvers;
pub mod session;
pub mod statement;
pub mod utils;

pub use error::CompileError;
pub use statement::{CompiledQuery, QueryCompiler};
