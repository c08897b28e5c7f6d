//! Services for argoqc
//!
//! Pure building blocks (name parsing, metrics, heatmaps), the analysis
//! boundary and the pipeline that ties them to a backend.

pub mod analyzer;
pub mod heatmap;
pub mod metrics;
pub mod name_parser;
pub mod pipeline;

pub use analyzer::{Analysis, JsonMeasurementAnalyzer, OpticalAnalyzer};
pub use heatmap::{build_heatmap, Feature, Heatmap, HeatmapParams, Raster};
pub use metrics::{compute_statistics, PccTable, Statistics};
pub use name_parser::{parse_name, NameFields};
pub use pipeline::{ItemOutcome, Pipeline, RunReport};
