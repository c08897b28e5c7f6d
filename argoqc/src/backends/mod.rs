//! Storage backends
//!
//! A backend is a pair of a `WorkItemSource` (what to process) and an
//! `ArtifactSink` (where results go). Two variants exist:
//! - `local`: a folder of image files, results in a per-instrument folder tree
//! - `remote`: an annotation-capable image repository behind `RepositoryClient`
//!
//! Both are bound to one container (folder or dataset) when constructed.

pub mod local;
pub mod remote;
pub mod selection;
pub mod tables;

use crate::error::QcResult;
use crate::models::{Region, SummaryRow, Table, WorkItem};
use crate::services::heatmap::Heatmap;
use std::collections::BTreeMap;
use tracing::error;

/// Enumerates the items of a container that a run should process
pub trait WorkItemSource {
    /// Human-readable container identity, for logs
    fn container(&self) -> &str;

    /// Candidate items in native listing order
    ///
    /// Fails as a whole if markers cannot be read for any item.
    fn list(&self) -> QcResult<Vec<WorkItem>>;

    fn count(&self) -> QcResult<usize> {
        Ok(self.list()?.len())
    }

    /// True when already-listed raw items are reprocessed and a fresh summary
    /// table is started
    fn is_processing_all_items(&self) -> bool;
}

/// Which grid a set of points describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    /// Ring positions found in the image
    Measured,
    /// Positions of a perfect lattice fitted to the measured one
    Ideal,
}

impl GridKind {
    pub fn label(&self) -> &'static str {
        match self {
            GridKind::Measured => "measuredGrid",
            GridKind::Ideal => "idealGrid",
        }
    }

    /// Artifact name for one channel, without extension
    pub fn artifact_name(&self, channel_id: u32) -> String {
        format!("{}_ch{}", self.label(), channel_id)
    }
}

/// Publishes results of processed items
///
/// Every method reports its own failures (logged at error level) and never
/// returns them: one failed upload must not abort the batch.
pub trait ArtifactSink {
    fn publish_heatmap(&mut self, item: &WorkItem, heatmap: &Heatmap);

    /// Per-ring results of one channel
    fn publish_channel_table(&mut self, item: &WorkItem, channel_id: u32, table: &Table);

    fn publish_key_values(&mut self, item: &WorkItem, key_values: &BTreeMap<String, String>);

    fn publish_grid_points(
        &mut self,
        item: &WorkItem,
        channel_id: u32,
        kind: GridKind,
        points: &[Region],
    );

    fn publish_pcc_table(&mut self, item: &WorkItem, table: &Table);

    /// Attach markers; idempotent, and adding the processed marker removes raw
    fn apply_state_markers(&mut self, item: &WorkItem, markers: &[String]);

    /// Create, extend or replace the container's summary table
    ///
    /// Returns the name of the table now current, `None` if publishing failed.
    fn publish_summary(
        &mut self,
        rows: &[SummaryRow],
        metric_headers: &[String],
        extend: bool,
    ) -> Option<String>;
}

/// Log a failed artifact operation; used by every sink
pub(crate) fn report_failure<T>(result: QcResult<T>, item: &str, artifact: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(item = %item, artifact = %artifact, error = %e, "Publishing failed");
            None
        }
    }
}
