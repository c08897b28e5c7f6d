//! Marker ledger of the local backend
//!
//! Local files cannot carry tags, so markers are recorded in a CSV file in the
//! instrument folder: `Image,Tags`, one row per image, tags joined with the
//! marker separator (`processed%argolight`).

use crate::error::{QcError, QcResult};
use crate::models::Table;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const HEADERS: [&str; 2] = ["Image", "Tags"];

#[derive(Debug, Clone)]
pub struct MarkerLedger {
    path: PathBuf,
    separator: char,
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl MarkerLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger
    pub fn load(path: &Path, separator: char) -> QcResult<Self> {
        let mut ledger = Self {
            path: path.to_path_buf(),
            separator,
            entries: BTreeMap::new(),
        };
        if !path.exists() {
            return Ok(ledger);
        }

        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(ledger);
        }
        let table = Table::from_csv(&text)?;
        if table.headers != HEADERS {
            return Err(QcError::Backend(format!(
                "Unexpected marker ledger header in {}: {}",
                path.display(),
                table.headers.join(",")
            )));
        }
        for row in table.rows {
            let mut cells = row.into_iter();
            let Some(image) = cells.next() else { continue };
            let tags = cells
                .next()
                .unwrap_or_default()
                .split(separator)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            ledger.entries.insert(image, tags);
        }
        Ok(ledger)
    }

    /// Markers recorded for an image (empty when unknown)
    pub fn markers(&self, image: &str) -> BTreeSet<String> {
        self.entries.get(image).cloned().unwrap_or_default()
    }

    pub fn set_markers(&mut self, image: &str, markers: BTreeSet<String>) {
        self.entries.insert(image.to_string(), markers);
    }

    /// Write the whole ledger back to disk
    pub fn save(&self) -> QcResult<()> {
        let mut table = Table::new(HEADERS.iter().map(|h| h.to_string()).collect());
        let separator = self.separator.to_string();
        for (image, tags) in &self.entries {
            let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
            table.push_row(vec![image.clone(), tags.join(&separator)]);
        }
        std::fs::write(&self.path, table.to_csv()?)?;
        Ok(())
    }
}
