//! Artifact sink writing into the instrument folder

use super::{LocalLayout, MarkerLedger};
use crate::backends::selection::{apply_change, plan_marker_change};
use crate::backends::tables::{
    grid_points_table, key_values_table, select_latest, unique_summary_table_name,
};
use crate::backends::{report_failure, ArtifactSink, GridKind};
use crate::config::Naming;
use crate::error::{QcError, QcResult};
use crate::models::{Region, SummaryRow, Table, WorkItem};
use crate::services::heatmap::Heatmap;
use argoqc_common::time::{Clock, SystemClock};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct LocalSink {
    instrument_dir: PathBuf,
    subject: String,
    naming: Naming,
    clock: Box<dyn Clock>,
    ledger: Option<MarkerLedger>,
    /// Per-image folders already created during this run
    created: HashSet<PathBuf>,
}

impl LocalSink {
    pub fn new(layout: &LocalLayout, naming: Naming) -> Self {
        Self::with_clock(layout, naming, Box::new(SystemClock))
    }

    pub fn with_clock(layout: &LocalLayout, naming: Naming, clock: Box<dyn Clock>) -> Self {
        Self {
            instrument_dir: layout.instrument_dir.clone(),
            subject: layout.subject(),
            naming,
            clock,
            ledger: None,
            created: HashSet::new(),
        }
    }

    /// Folder of one image's artifacts, created on first use
    fn item_dir(&mut self, item: &WorkItem) -> QcResult<PathBuf> {
        let dir = self.instrument_dir.join(item.name_without_extension());
        if !self.created.contains(&dir) {
            std::fs::create_dir_all(&dir)?;
            self.created.insert(dir.clone());
        }
        Ok(dir)
    }

    fn write_artifact(&mut self, item: &WorkItem, file_name: &str, bytes: &[u8]) -> QcResult<()> {
        let path = self.item_dir(item)?.join(file_name);
        std::fs::write(&path, bytes)?;
        debug!(item = %item.name, path = %path.display(), "Artifact written");
        Ok(())
    }

    fn write_table(&mut self, item: &WorkItem, file_name: &str, table: &Table) {
        let result = table
            .to_csv()
            .map_err(QcError::from)
            .and_then(|csv| self.write_artifact(item, file_name, csv.as_bytes()));
        report_failure(result, &item.name, file_name);
    }

    fn ledger(&mut self) -> QcResult<&mut MarkerLedger> {
        let ledger = match self.ledger.take() {
            Some(ledger) => ledger,
            None => {
                let path = self.instrument_dir.join(&self.naming.ledger_file);
                MarkerLedger::load(&path, self.naming.marker_separator)?
            }
        };
        Ok(self.ledger.insert(ledger))
    }

    fn update_markers(&mut self, item: &WorkItem, markers: &[String]) -> QcResult<()> {
        let naming = self.naming.clone();
        let ledger = self.ledger()?;
        let mut current = ledger.markers(&item.name);
        let change = plan_marker_change(&current, markers, &naming);
        if change.is_empty() {
            debug!(item = %item.name, "Markers already applied");
            return Ok(());
        }
        apply_change(&mut current, &change);
        ledger.set_markers(&item.name, current);
        ledger.save()?;
        info!(item = %item.name, added = ?change.add, removed = ?change.remove, "Markers updated");
        Ok(())
    }

    fn write_summary(
        &mut self,
        rows: &[SummaryRow],
        metric_headers: &[String],
        extend: bool,
    ) -> QcResult<String> {
        let csv_names: Vec<String> = std::fs::read_dir(&self.instrument_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|n| n.ends_with(".csv"))
            .collect();
        let current = select_latest(
            &csv_names,
            |n| n.as_str(),
            &self.subject,
            &self.naming.table_suffix,
        )
        .cloned();

        // Only the table being extended may be overwritten
        let replaced = if extend { current.as_deref() } else { None };
        let new_stem = unique_summary_table_name(
            self.clock.now(),
            &self.subject,
            &self.naming.table_suffix,
            |stem| {
                let file = format!("{}.csv", stem);
                csv_names.iter().any(|n| *n == file && Some(n.as_str()) != replaced)
            },
        );
        let new_name = format!("{}.csv", new_stem);
        let new_path = self.instrument_dir.join(&new_name);

        match current {
            Some(old_name) if extend => {
                let old_path = self.instrument_dir.join(&old_name);
                let mut table = Table::from_csv(&std::fs::read_to_string(&old_path)?)?;
                table.extend_summary(rows);
                std::fs::write(&new_path, table.to_csv()?)?;
                if old_path != new_path {
                    std::fs::remove_file(&old_path)?;
                }
                info!(
                    previous = %old_name,
                    table = %new_name,
                    appended = rows.len(),
                    total = table.rows.len(),
                    "Summary table extended"
                );
            }
            _ => {
                let table = Table::summary(metric_headers, rows);
                std::fs::write(&new_path, table.to_csv()?)?;
                info!(table = %new_name, rows = rows.len(), "Summary table created");
            }
        }
        Ok(new_name)
    }
}

impl ArtifactSink for LocalSink {
    fn publish_heatmap(&mut self, item: &WorkItem, heatmap: &Heatmap) {
        let file_name = heatmap.file_name();
        let result = heatmap
            .to_tiff_bytes()
            .and_then(|bytes| self.write_artifact(item, &file_name, &bytes));
        report_failure(result, &item.name, &file_name);
    }

    fn publish_channel_table(&mut self, item: &WorkItem, channel_id: u32, table: &Table) {
        self.write_table(item, &format!("Results_table_ch{}.csv", channel_id), table);
    }

    fn publish_key_values(&mut self, item: &WorkItem, key_values: &BTreeMap<String, String>) {
        let mut key_values = key_values.clone();
        key_values.insert("Image_ID".to_string(), item.id.to_string());
        self.write_table(item, "keyValues.csv", &key_values_table(&key_values));
    }

    fn publish_grid_points(
        &mut self,
        item: &WorkItem,
        channel_id: u32,
        kind: GridKind,
        points: &[Region],
    ) {
        if points.is_empty() {
            warn!(item = %item.name, grid = kind.label(), channel = channel_id, "No grid points to save");
            return;
        }
        let file_name = format!("{}.csv", kind.artifact_name(channel_id));
        self.write_table(item, &file_name, &grid_points_table(points));
    }

    fn publish_pcc_table(&mut self, item: &WorkItem, table: &Table) {
        self.write_table(item, "PCC_table.csv", table);
    }

    fn apply_state_markers(&mut self, item: &WorkItem, markers: &[String]) {
        let result = self.update_markers(item, markers);
        report_failure(result, &item.name, "markers");
    }

    fn publish_summary(
        &mut self,
        rows: &[SummaryRow],
        metric_headers: &[String],
        extend: bool,
    ) -> Option<String> {
        let result = self.write_summary(rows, metric_headers, extend);
        let subject = self.subject.clone();
        report_failure(result, &subject, "summary table")
    }
}
