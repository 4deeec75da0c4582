//! Shared data model, error taxonomy and configuration for Ad Lift.

pub mod config;
pub mod error;
pub mod types;

pub use crate::config::{AppConfig, CleaningConfig, ExportConfig};
pub use crate::error::{AdliftError, AdliftResult, MissingColumn};
