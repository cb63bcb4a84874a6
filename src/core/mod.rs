pub mod pipeline;
pub mod session;
pub mod state;

pub use crate::domain::model::ExportResult;
pub use crate::domain::ports::{Engine, EngineConnector};
pub use crate::utils::error::Result;
