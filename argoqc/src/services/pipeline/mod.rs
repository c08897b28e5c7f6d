//! QC pipeline
//!
//! Drives one run over a container:
//!
//! INIT (list items) → per item: ANALYZING → PUBLISHING → FINALIZING
//!
//! Each phase lives in its own `phase_*` file as methods on `Pipeline`.
//! A listing failure aborts the run; anything that goes wrong for a single
//! item becomes an `ItemOutcome::Failed` and the batch moves on.

use crate::backends::{ArtifactSink, WorkItemSource};
use crate::config::{Naming, PipelineConfig};
use crate::error::QcResult;
use crate::models::{SummaryRow, WorkItem};
use crate::services::analyzer::OpticalAnalyzer;
use tracing::{error, info};

mod phase_analyzing;
mod phase_finalizing;
mod phase_publishing;

/// Result of processing one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Processed {
        name: String,
        /// One summary row per channel
        rows: Vec<SummaryRow>,
    },
    Failed {
        name: String,
        error: String,
    },
}

/// What a run did, logged by the binary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub container: String,
    pub listed: usize,
    pub processed: Vec<String>,
    /// (item name, error)
    pub failed: Vec<(String, String)>,
    pub summary_rows: usize,
    /// Name of the summary table current after the run
    pub summary_table: Option<String>,
}

impl RunReport {
    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Processed { name, rows } => {
                self.processed.push(name.clone());
                self.summary_rows += rows.len();
            }
            ItemOutcome::Failed { name, error } => {
                self.failed.push((name.clone(), error.clone()));
            }
        }
    }
}

/// Pipeline service
pub struct Pipeline {
    naming: Naming,
    config: PipelineConfig,
    analyzer: Box<dyn OpticalAnalyzer>,
}

impl Pipeline {
    pub fn new(naming: Naming, config: PipelineConfig, analyzer: Box<dyn OpticalAnalyzer>) -> Self {
        Self {
            naming,
            config,
            analyzer,
        }
    }

    /// Process every selected item of `source`, publishing through `sink`
    ///
    /// Only a failed listing is returned as an error.
    pub fn run(
        &self,
        source: &dyn WorkItemSource,
        sink: &mut dyn ArtifactSink,
    ) -> QcResult<RunReport> {
        let items = source.list()?;
        info!(
            container = %source.container(),
            items = items.len(),
            process_all = source.is_processing_all_items(),
            "Run started"
        );

        let mut report = RunReport {
            container: source.container().to_string(),
            listed: items.len(),
            ..Default::default()
        };
        let mut rows: Vec<SummaryRow> = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            info!(item = %item.name, index = index + 1, total = report.listed, "Processing item");
            let outcome = self.process_item(item, sink);
            report.record(&outcome);
            match outcome {
                ItemOutcome::Processed { rows: item_rows, .. } => rows.extend(item_rows),
                ItemOutcome::Failed { name, error } => {
                    error!(item = %name, error = %error, "Item failed");
                }
            }
        }

        report.summary_table = self.phase_finalizing(&rows, source, sink);

        info!(
            container = %report.container,
            processed = report.processed.len(),
            failed = report.failed.len(),
            summary_rows = report.summary_rows,
            "Run completed"
        );
        Ok(report)
    }

    fn process_item(&self, mut item: WorkItem, sink: &mut dyn ArtifactSink) -> ItemOutcome {
        if let Err(e) = self.phase_analyzing(&mut item) {
            return ItemOutcome::Failed {
                name: item.name,
                error: e.to_string(),
            };
        }
        let rows = self.phase_publishing(&item, sink);
        ItemOutcome::Processed {
            name: item.name,
            rows,
        }
    }
}
