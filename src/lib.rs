pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{DuckDbConnector, DuckDbEngine};
pub use config::{toml_config::TomlConfig, ExportConfig};
pub use core::pipeline::{run_export, PipelineRunner};
pub use core::state::PipelineState;
pub use domain::model::ExportResult;
pub use utils::error::{EtlError, Result};
