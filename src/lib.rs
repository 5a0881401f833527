pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod process;

pub use config::DbConfig;
pub use error::{EtlError, ValidationError};
pub use pipeline::{Phase, Pipeline, PipelineFailure, RunReport, Warehouse};
