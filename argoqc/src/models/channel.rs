//! Per-channel measurements
//!
//! Produced by the optical analysis (ring detection is an external concern);
//! the field names double as the JSON layout of measurement documents.

use crate::services::heatmap::Feature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detected region: bounding box plus intensity centroid, in image pixels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Falls back to the bounding-box center when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<(f64, f64)>,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            centroid: None,
        }
    }

    pub fn with_centroid(mut self, cx: f64, cy: f64) -> Self {
        self.centroid = Some((cx, cy));
        self
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
            .unwrap_or((self.x + self.width / 2.0, self.y + self.height / 2.0))
    }
}

/// Rectangular block of pixel intensities, row-major
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelRegion {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl PixelRegion {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Self {
        Self {
            width,
            height,
            values,
        }
    }
}

/// Measurements of one channel of an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u32,
    pub image_width: u32,
    pub image_height: u32,

    /// Per-ring values; the three lists are parallel (one entry per ring)
    #[serde(default)]
    pub fwhm: Vec<f64>,
    #[serde(default)]
    pub field_distortion: Vec<f64>,
    #[serde(default)]
    pub field_uniformity: Vec<f64>,

    #[serde(default)]
    pub measured_grid: Vec<Region>,
    #[serde(default)]
    pub ideal_grid: Vec<Region>,

    /// Pattern rotation in radians
    #[serde(default)]
    pub rotation_angle: f64,

    /// Central cross of the pattern
    #[serde(default)]
    pub center_cross: Region,

    /// Pixel patches around each ring, for inter-channel correlation
    #[serde(default)]
    pub ring_patches: Vec<PixelRegion>,

    #[serde(default)]
    pub key_values: BTreeMap<String, String>,
}

impl Channel {
    pub fn new(id: u32, image_width: u32, image_height: u32) -> Self {
        Self {
            id,
            image_width,
            image_height,
            ..Self::default()
        }
    }

    /// Per-ring values of one feature
    pub fn values(&self, feature: Feature) -> &[f64] {
        match feature {
            Feature::FieldDistortion => &self.field_distortion,
            Feature::FieldUniformity => &self.field_uniformity,
            Feature::Fwhm => &self.fwhm,
        }
    }

    /// Number of rings when the three metric lists agree
    pub fn ring_count(&self) -> Option<usize> {
        let n = self.field_distortion.len();
        if self.field_uniformity.len() == n && self.fwhm.len() == n {
            Some(n)
        } else {
            None
        }
    }
}
