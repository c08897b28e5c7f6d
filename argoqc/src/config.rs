//! Runtime configuration for a QC run
//!
//! Built once from the TOML bootstrap config plus CLI overrides, then passed
//! by reference to the pipeline and the backends. Nothing here is mutated
//! after construction.

use crate::services::heatmap::Feature;
use argoqc_common::config::{MarkerConfig, ProcessingConfig};
use tracing::warn;

/// Naming constants shared by every backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    /// Marker of items never processed
    pub raw_marker: String,
    /// Marker of items successfully processed at least once
    pub processed_marker: String,
    /// Slide-family marker added next to `processed`
    pub slide_marker: String,
    /// Substring identifying derived images (overview/macro series)
    pub derived_image_pattern: String,
    /// Last token of every summary table name
    pub table_suffix: String,
    /// Local marker ledger file, kept in the instrument folder
    pub ledger_file: String,
    /// Separator between markers inside one ledger cell
    pub marker_separator: char,
}

impl Default for Naming {
    fn default() -> Self {
        Self::from_markers(&MarkerConfig::default())
    }
}

impl Naming {
    pub fn from_markers(markers: &MarkerConfig) -> Self {
        Self {
            raw_marker: markers.raw.clone(),
            processed_marker: markers.processed.clone(),
            slide_marker: markers.slide_family.clone(),
            derived_image_pattern: markers.derived_image_pattern.clone(),
            table_suffix: "Table".to_string(),
            ledger_file: "processed_images.csv".to_string(),
            marker_separator: '%',
        }
    }

    /// Markers applied to an item after a successful run
    pub fn completion_markers(&self) -> Vec<String> {
        vec![self.processed_marker.clone(), self.slide_marker.clone()]
    }

    pub fn is_derived(&self, name: &str) -> bool {
        !self.derived_image_pattern.is_empty() && name.contains(&self.derived_image_pattern)
    }
}

/// Analysis and artifact options for the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub save_heatmaps: bool,
    pub heatmap_features: Vec<Feature>,
    pub lattice_spacing_um: f64,
    pub canvas_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_processing(&ProcessingConfig::default())
    }
}

impl PipelineConfig {
    /// Build from the `[processing]` section; unknown feature names are skipped
    pub fn from_processing(processing: &ProcessingConfig) -> Self {
        let mut heatmap_features = Vec::new();
        for name in &processing.heatmap_features {
            match Feature::from_tag(name) {
                Some(feature) if !heatmap_features.contains(&feature) => {
                    heatmap_features.push(feature)
                }
                Some(_) => {}
                None => warn!(feature = %name, "Unknown heatmap feature, ignoring"),
            }
        }

        Self {
            save_heatmaps: processing.save_heatmaps,
            heatmap_features,
            lattice_spacing_um: processing.lattice_spacing_um,
            canvas_height: processing.canvas_height.max(1),
        }
    }

    /// Features to render for this run (empty when heatmaps are disabled)
    pub fn active_features(&self) -> &[Feature] {
        if self.save_heatmaps {
            &self.heatmap_features
        } else {
            &[]
        }
    }
}
