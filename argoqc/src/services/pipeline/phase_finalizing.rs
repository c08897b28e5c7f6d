//! FINALIZING: publish the container's summary table once per run

use super::Pipeline;
use crate::backends::{ArtifactSink, WorkItemSource};
use crate::models::SummaryRow;
use crate::services::metrics::summary_headers;
use tracing::info;

impl Pipeline {
    /// Extend the current summary table, or start a new one in process-all mode
    pub(super) fn phase_finalizing(
        &self,
        rows: &[SummaryRow],
        source: &dyn WorkItemSource,
        sink: &mut dyn ArtifactSink,
    ) -> Option<String> {
        if rows.is_empty() {
            info!(container = %source.container(), "No item processed, summary table untouched");
            return None;
        }
        let extend = !source.is_processing_all_items();
        sink.publish_summary(rows, &summary_headers(), extend)
    }
}
