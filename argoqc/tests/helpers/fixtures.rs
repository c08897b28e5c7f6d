//! Fixture builders

use argoqc::backends::local::LocalLayout;
use argoqc::models::{Channel, PixelRegion, Region};
use argoqc::services::Analysis;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const INSTRUMENT: &str = "lsm980";
pub const IMAGE_SIZE: u32 = 64;

/// Parsable image name of series `series`
pub fn image_name(series: usize) -> String {
    format!("{}_o63x_z1.2_oil_ArgoSLG511_b_d20230223_{}.czi", INSTRUMENT, series)
}

/// Channel with a 3x3 lattice (8 rings) and values derived from `id`
pub fn synthetic_channel(id: u32) -> Channel {
    let mut channel = Channel::new(id, IMAGE_SIZE, IMAGE_SIZE);
    let offset = id as f64 * 0.1;
    channel.fwhm = (0..8).map(|k| 0.2 + offset + k as f64 * 0.01).collect();
    channel.field_distortion = (0..8).map(|k| 0.05 + offset + k as f64 * 0.005).collect();
    channel.field_uniformity = (0..8).map(|k| 0.9 - offset - k as f64 * 0.01).collect();
    channel.measured_grid = (0..8)
        .map(|k| Region::new(8.0 * k as f64, 4.0, 3.0, 3.0))
        .collect();
    channel.ideal_grid = (0..8)
        .map(|k| Region::new(8.0 * k as f64, 5.0, 3.0, 3.0))
        .collect();
    channel.rotation_angle = 0.01;
    channel.center_cross = Region::new(30.0, 30.0, 4.0, 4.0);
    channel.ring_patches = (0..8)
        .map(|k| {
            let base = k as f32 + id as f32;
            PixelRegion::new(2, 2, vec![base, base + 1.0, base + 3.0, base + 2.0])
        })
        .collect();
    channel
        .key_values
        .insert(format!("Emission_ch{}", id), format!("{}", 500 + id * 50));
    channel
}

/// Analysis with `channels` synthetic channels
pub fn synthetic_analysis(channels: u32) -> Analysis {
    Analysis {
        pixel_size_um: 0.5,
        channels: (0..channels).map(synthetic_channel).collect(),
    }
}

/// Input and output folders of a local run
pub struct LocalFixture {
    pub root: TempDir,
}

impl LocalFixture {
    pub fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(root.path().join("input")).expect("input dir");
        std::fs::create_dir_all(root.path().join("output")).expect("output dir");
        Self { root }
    }

    pub fn input(&self) -> PathBuf {
        self.root.path().join("input")
    }

    pub fn output(&self) -> PathBuf {
        self.root.path().join("output")
    }

    /// Create empty image files for the given series numbers
    pub fn add_images(&self, series: impl IntoIterator<Item = usize>) -> Vec<String> {
        series
            .into_iter()
            .map(|s| {
                let name = image_name(s);
                std::fs::write(self.input().join(&name), b"").expect("image file");
                name
            })
            .collect()
    }

    pub fn layout(&self) -> LocalLayout {
        LocalLayout::resolve(&self.input(), &self.output()).expect("layout")
    }

    pub fn instrument_dir(&self) -> PathBuf {
        self.output().join(INSTRUMENT)
    }

    /// Summary table file names in the instrument folder, sorted
    pub fn summary_tables(&self) -> Vec<String> {
        csv_files(&self.instrument_dir())
            .into_iter()
            .filter(|n| n.ends_with("_Table.csv"))
            .collect()
    }
}

/// Sorted names of the CSV files directly inside `dir`
pub fn csv_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .filter(|n| n.ends_with(".csv"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
