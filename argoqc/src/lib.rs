//! argoqc library interface
//!
//! Quality control of ArgoSlide calibration images: metrics, heatmaps and a
//! versioned per-instrument summary, published to a local folder tree or an
//! image repository.

pub mod backends;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::{Naming, PipelineConfig};
pub use crate::error::{QcError, QcResult};
pub use crate::services::pipeline::{ItemOutcome, Pipeline, RunReport};
