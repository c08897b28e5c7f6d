//! Heatmap construction
//!
//! Turns a per-ring metric list into a raster aligned with the acquired field
//! of view: the ring lattice is resampled to its physical size on a fixed-height
//! canvas, rotated by the detected pattern angle and centered on the detected
//! cross.
//!
//! **Algorithm:**
//! 1. `n = floor(sqrt(len + 1))`, NaN inserted at `len / 2` (the cross has no
//!    ring), giving an n×n grid in row-major order
//! 2. Nearest-neighbour enlargement to `targetSize²`, where
//!    `targetSize = round(canvasWidth * (n * spacing / pixelSize) / imageWidth)`
//! 3. Each enlarged pixel is rotated about the grid center (`targetSize / 2.0`), translated to the
//!    cross centroid (rescaled to canvas coordinates) and written to the
//!    nearest canvas pixel; out-of-bounds pixels are dropped and later writes
//!    win
//!
//! Unwritten canvas pixels stay 0.

use crate::error::{QcError, QcResult};
use crate::models::Channel;
use std::io::Cursor;
use tiff::encoder::{colortype, TiffEncoder};
use tracing::warn;

/// Largest enlarged lattice, in canvas diagonals; beyond it nearly every
/// pixel would fall outside the canvas
const MAX_TARGET_PER_DIAGONAL: f64 = 4.0;

/// Metric rendered by a heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    FieldDistortion,
    FieldUniformity,
    Fwhm,
}

impl Feature {
    pub const ALL: [Feature; 3] = [
        Feature::FieldDistortion,
        Feature::FieldUniformity,
        Feature::Fwhm,
    ];

    /// Marker/config name of the feature
    pub fn tag(&self) -> &'static str {
        match self {
            Feature::FieldDistortion => "field_distortion",
            Feature::FieldUniformity => "field_uniformity",
            Feature::Fwhm => "fwhm",
        }
    }

    /// Suffix used in heatmap titles
    pub fn title_suffix(&self) -> &'static str {
        match self {
            Feature::FieldDistortion => "FieldDistortion",
            Feature::FieldUniformity => "FieldUniformity",
            Feature::Fwhm => "FWHM",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.tag().eq_ignore_ascii_case(tag))
    }
}

/// Single-band 32-bit float raster, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

impl Raster {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.pixels[y as usize * self.width as usize + x as usize] = value;
    }

    /// Pixel data as raw bits, for exact comparisons involving NaN
    pub fn to_bits(&self) -> Vec<u32> {
        self.pixels.iter().map(|p| p.to_bits()).collect()
    }
}

/// Nearest-neighbour resize (no interpolation)
pub fn resize_nearest(src: &Raster, width: u32, height: u32) -> Raster {
    let mut out = Raster::zeros(width, height);
    if src.width == 0 || src.height == 0 {
        return out;
    }
    for y in 0..height {
        let sy = (y as u64 * src.height as u64 / height as u64) as u32;
        for x in 0..width {
            let sx = (x as u64 * src.width as u64 / width as u64) as u32;
            out.set(x, y, src.get(sx, sy));
        }
    }
    out
}

/// Physical and optical parameters of one heatmap
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapParams {
    pub image_width: u32,
    pub image_height: u32,
    /// Cross centroid in image pixels
    pub centroid: (f64, f64),
    /// Pattern rotation in radians
    pub rotation_rad: f64,
    pub pixel_size_um: f64,
    pub lattice_spacing_um: f64,
    pub canvas_height: u32,
}

impl HeatmapParams {
    pub fn for_channel(
        channel: &Channel,
        pixel_size_um: f64,
        lattice_spacing_um: f64,
        canvas_height: u32,
    ) -> Self {
        Self {
            image_width: channel.image_width,
            image_height: channel.image_height,
            centroid: channel.center_cross.centroid(),
            rotation_rad: channel.rotation_angle,
            pixel_size_um,
            lattice_spacing_um,
            canvas_height,
        }
    }

    /// Canvas width following the image aspect ratio (integer division), at least 1
    pub fn canvas_width(&self) -> u32 {
        let width = self.canvas_height as u64 * self.image_width as u64 / self.image_height as u64;
        (width.min(u32::MAX as u64) as u32).max(1)
    }
}

/// Build the heatmap raster of one per-ring metric list
///
/// Returns `None` for empty input or degenerate parameters (zero image size,
/// non-positive pixel size, a lattice far larger than the canvas).
pub fn build_heatmap(values: &[f64], params: &HeatmapParams) -> Option<Raster> {
    if values.is_empty()
        || params.image_width == 0
        || params.image_height == 0
        || params.canvas_height == 0
        || !(params.pixel_size_um > 0.0)
    {
        return None;
    }

    // Ring lattice with the unmeasured center
    let n = ((values.len() + 1) as f64).sqrt().floor() as u32;
    let mut grid: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    grid.insert(values.len() / 2, f32::NAN);
    grid.truncate(n as usize * n as usize);
    let base = Raster {
        width: n,
        height: n,
        pixels: grid,
    };

    let canvas_height = params.canvas_height;
    let canvas_width = params.canvas_width();

    let ratio = (n as f64 * params.lattice_spacing_um / params.pixel_size_um)
        / params.image_width as f64;
    let target = (canvas_width as f64 * ratio).round();
    if !target.is_finite() {
        return None;
    }
    let diagonal = (canvas_width as f64).hypot(canvas_height as f64);
    if target > MAX_TARGET_PER_DIAGONAL * diagonal {
        warn!(
            target_size = target,
            canvas_width,
            canvas_height,
            pixel_size_um = params.pixel_size_um,
            "Heatmap lattice exceeds the canvas, check the pixel size unit"
        );
        return None;
    }
    let target = (target as u32).max(1);
    let enlarged = resize_nearest(&base, target, target);

    let cx = params.centroid.0 * canvas_width as f64 / params.image_width as f64;
    let cy = params.centroid.1 * canvas_height as f64 / params.image_height as f64;
    let (sin, cos) = params.rotation_rad.sin_cos();
    let half = target as f64 / 2.0;

    let mut canvas = Raster::zeros(canvas_width, canvas_height);
    for j in 0..target {
        let dy = j as f64 - half;
        for i in 0..target {
            let dx = i as f64 - half;
            let x = (dx * cos - dy * sin + cx).round();
            let y = (dx * sin + dy * cos + cy).round();
            if x >= 0.0 && y >= 0.0 && x < canvas_width as f64 && y < canvas_height as f64 {
                canvas.set(x as u32, y as u32, enlarged.get(i, j));
            }
        }
    }

    Some(canvas)
}

/// Rendered heatmap of one feature of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    /// `<image name without extension>_ch<id>_<Feature>`
    pub title: String,
    pub feature: Feature,
    pub channel_id: u32,
    pub raster: Raster,
}

impl Heatmap {
    pub fn new(image_stem: &str, channel_id: u32, feature: Feature, raster: Raster) -> Self {
        Self {
            title: format!("{}_ch{}_{}", image_stem, channel_id, feature.title_suffix()),
            feature,
            channel_id,
            raster,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.tif", self.title)
    }

    /// Encode as a single-page 32-bit float grayscale TIFF
    pub fn to_tiff_bytes(&self) -> QcResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor)
                .map_err(|e| QcError::Encoding(format!("TIFF encoder: {}", e)))?;
            encoder
                .write_image::<colortype::Gray32Float>(
                    self.raster.width,
                    self.raster.height,
                    &self.raster.pixels,
                )
                .map_err(|e| QcError::Encoding(format!("Write {}: {}", self.title, e)))?;
        }
        Ok(cursor.into_inner())
    }
}
