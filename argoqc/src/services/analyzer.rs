//! Optical analysis boundary
//!
//! Ring detection and the raw per-ring measurements come from an external
//! image toolkit. The pipeline only sees the `OpticalAnalyzer` trait.
//!
//! `JsonMeasurementAnalyzer` reads the measurement documents such a detector
//! writes next to the images (`<image name without extension>.json`):
//!
//! ```json
//! {
//!   "pixel_size_um": 0.0645,
//!   "channels": [
//!     { "id": 0, "image_width": 2048, "image_height": 2048,
//!       "fwhm": [...], "field_distortion": [...], "field_uniformity": [...],
//!       "rotation_angle": 0.0021,
//!       "center_cross": { "x": 1010, "y": 1012, "width": 30, "height": 30 } }
//!   ]
//! }
//! ```

use crate::error::{QcError, QcResult};
use crate::models::{Channel, PixelRef, WorkItem};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Measurements of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Physical pixel size in micrometers
    pub pixel_size_um: f64,
    pub channels: Vec<Channel>,
}

/// Produces per-channel measurements for an item
pub trait OpticalAnalyzer {
    fn analyze(&self, item: &WorkItem) -> QcResult<Analysis>;
}

/// Reads measurements from JSON documents
#[derive(Debug, Clone, Default)]
pub struct JsonMeasurementAnalyzer {
    /// Folder holding the documents; defaults to the image's own folder
    measurements_dir: Option<PathBuf>,
}

impl JsonMeasurementAnalyzer {
    pub fn new(measurements_dir: Option<PathBuf>) -> Self {
        Self { measurements_dir }
    }

    /// Location of the document for an item
    pub fn document_path(&self, item: &WorkItem) -> QcResult<PathBuf> {
        let file_name = format!("{}.json", item.name_without_extension());
        if let Some(dir) = &self.measurements_dir {
            return Ok(dir.join(file_name));
        }
        match &item.pixels {
            PixelRef::File(path) => Ok(path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(file_name)),
            PixelRef::Repository(_) => Err(QcError::Analysis(format!(
                "No measurements folder configured for repository item {}",
                item.name
            ))),
        }
    }
}

impl OpticalAnalyzer for JsonMeasurementAnalyzer {
    fn analyze(&self, item: &WorkItem) -> QcResult<Analysis> {
        let path = self.document_path(item)?;
        debug!(item = %item.name, path = %path.display(), "Reading measurements");

        let text = std::fs::read_to_string(&path).map_err(|e| {
            QcError::Analysis(format!("Read {} failed: {}", path.display(), e))
        })?;
        let analysis: Analysis = serde_json::from_str(&text)?;

        if analysis.channels.is_empty() {
            return Err(QcError::Analysis(format!(
                "{} contains no channel",
                path.display()
            )));
        }
        if !(analysis.pixel_size_um > 0.0) {
            return Err(QcError::Analysis(format!(
                "{} has invalid pixel size {}",
                path.display(),
                analysis.pixel_size_um
            )));
        }
        Ok(analysis)
    }
}
