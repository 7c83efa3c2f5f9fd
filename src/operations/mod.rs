pub mod chain;
pub mod query;
