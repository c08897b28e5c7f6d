//! Local filesystem backend
//!
//! Images are read from an input folder; results are written under an output
//! folder, inside the folder of the instrument that acquired them:
//!
//! ```text
//! <output>/<instrument>/
//!     processed_images.csv                      marker ledger
//!     20230223-14h05m09_<instrument>_Table.csv  current summary table
//!     <image name>/                             one folder per image
//!         keyValues.csv  PCC_table.csv  Results_table_ch0.csv
//!         measuredGrid_ch0.csv  idealGrid_ch0.csv  <image>_ch0_FWHM.tif ...
//! ```

pub mod ledger;
pub mod sink;
pub mod source;

pub use ledger::MarkerLedger;
pub use sink::LocalSink;
pub use source::LocalSource;

use crate::error::{QcError, QcResult};
use crate::services::name_parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// File extensions treated as images
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "czi", "lif", "vsi", "nd2", "lsm", "oib", "oir", "ims", "tif", "tiff",
];

/// Resolved folders of a local run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLayout {
    pub input_dir: PathBuf,
    /// Folder holding the ledger, the summary tables and the per-image folders
    pub instrument_dir: PathBuf,
    /// Instrument name the folder was resolved for
    pub instrument: String,
}

impl LocalLayout {
    /// Resolve the layout for images in `input_dir` written under `output_dir`
    ///
    /// The instrument is taken from the first image whose name parses, or
    /// from the input folder name when none does.
    pub fn resolve(input_dir: &Path, output_dir: &Path) -> QcResult<Self> {
        if !input_dir.is_dir() {
            return Err(QcError::Backend(format!(
                "Input folder not found: {}",
                input_dir.display()
            )));
        }
        std::fs::create_dir_all(output_dir)?;

        let instrument = list_image_files(input_dir)?
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| name_parser::parse_name(name).map(|f| f.microscope))
            .find(|microscope| !microscope.is_empty())
            .or_else(|| {
                input_dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "microscope".to_string());

        let instrument_dir = resolve_instrument_dir(output_dir, &instrument);
        info!(
            instrument = %instrument,
            folder = %instrument_dir.display(),
            "Resolved instrument folder"
        );

        Ok(Self {
            input_dir: input_dir.to_path_buf(),
            instrument_dir,
            instrument,
        })
    }

    /// Subject embedded in summary table names
    pub fn subject(&self) -> String {
        self.instrument_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.instrument)
            .to_string()
    }
}

/// Folder of `instrument` under `target`
///
/// `target` itself when its name already contains the instrument, else the
/// first subfolder whose name contains it, else a new `<target>/<instrument>`.
/// Falls back to `target` if that folder cannot be created.
pub fn resolve_instrument_dir(target: &Path, instrument: &str) -> PathBuf {
    let target_name = target.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if target_name.contains(instrument) {
        return target.to_path_buf();
    }

    let existing = WalkDir::new(target)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_dir() && e.file_name().to_string_lossy().contains(instrument));
    if let Some(entry) = existing {
        return entry.into_path();
    }

    let created = target.join(instrument);
    match std::fs::create_dir_all(&created) {
        Ok(()) => created,
        Err(e) => {
            error!(
                folder = %created.display(),
                error = %e,
                "Cannot create instrument folder, using target folder instead"
            );
            target.to_path_buf()
        }
    }
}

/// Image files directly inside `dir`, in file-name order
pub fn list_image_files(dir: &Path) -> QcResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            QcError::Backend(format!("Listing {} failed: {}", dir.display(), e))
        })?;
        if entry.file_type().is_file() && is_image_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    if hidden {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
