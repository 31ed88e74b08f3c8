//! Core library for the `forecast-snapshot` CLI.
//!
//! This crate defines:
//! - Run configuration
//! - The variable catalogue and the typed forecast request/response
//! - Abstraction over forecast sources, with an Open-Meteo implementation
//! - Alignment of every variable onto one time axis
//! - CSV and HTML emitters
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod emit;
pub mod error;
pub mod model;
pub mod provider;
pub mod snapshot;
pub mod table;

pub use config::Config;
pub use error::{ErrorKind, SnapshotError};
pub use model::{ForecastRequest, ForecastResponse, Sample, VariableFamily};
pub use provider::{ForecastSource, source_from_config};
pub use snapshot::SnapshotReport;
pub use table::{OutputTable, Row, TableBuilder};
