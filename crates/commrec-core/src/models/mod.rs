//! Data models: configuration and typed cell values.

pub mod config;
pub mod value;

pub use config::{ExtractionConfig, IntakeConfig, LedgerConfig, ReconConfig};
pub use value::Value;
