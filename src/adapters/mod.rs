// Adapters layer: concrete implementations of the domain ports.

pub mod duckdb_engine;
pub mod sql;
pub mod verify;

pub use duckdb_engine::{DuckDbConnector, DuckDbEngine};
