//! Work-item source over a local image folder

use super::{list_image_files, LocalLayout, MarkerLedger};
use crate::backends::selection::is_selected;
use crate::backends::WorkItemSource;
use crate::config::Naming;
use crate::error::QcResult;
use crate::models::{ItemId, PixelRef, WorkItem};
use std::path::PathBuf;
use tracing::debug;

pub struct LocalSource {
    input_dir: PathBuf,
    container: String,
    ledger_path: PathBuf,
    naming: Naming,
    process_all: bool,
}

impl LocalSource {
    pub fn new(layout: &LocalLayout, naming: Naming, process_all: bool) -> Self {
        Self {
            input_dir: layout.input_dir.clone(),
            container: layout.input_dir.display().to_string(),
            ledger_path: layout.instrument_dir.join(&naming.ledger_file),
            naming,
            process_all,
        }
    }
}

impl WorkItemSource for LocalSource {
    fn container(&self) -> &str {
        &self.container
    }

    fn list(&self) -> QcResult<Vec<WorkItem>> {
        let ledger = MarkerLedger::load(&self.ledger_path, self.naming.marker_separator)?;
        let mut items = Vec::new();

        for path in list_image_files(&self.input_dir)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            let markers = ledger.markers(&name);
            if !is_selected(&name, &markers, &self.naming, self.process_all) {
                debug!(item = %name, "Skipping image");
                continue;
            }
            items.push(
                WorkItem::new(ItemId::new(name.clone()), name, PixelRef::File(path))
                    .with_markers(markers),
            );
        }
        Ok(items)
    }

    fn is_processing_all_items(&self) -> bool {
        self.process_all
    }
}
