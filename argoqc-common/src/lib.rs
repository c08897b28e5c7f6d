//! # ArgoQC Common Library
//!
//! Shared code for the ArgoQC workspace:
//! - Error types
//! - TOML configuration loading
//! - Clock and date-token utilities used to version summary tables

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
