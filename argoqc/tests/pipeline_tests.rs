//! Pipeline tests: publishing order, failure isolation, summary finalization

mod helpers;

use argoqc::backends::{ArtifactSink, GridKind, WorkItemSource};
use argoqc::models::{ItemId, PixelRef, Region, SummaryRow, Table, WorkItem};
use argoqc::services::heatmap::Heatmap;
use argoqc::{Naming, Pipeline, PipelineConfig, QcError, QcResult};
use argoqc_common::config::ProcessingConfig;
use helpers::{image_name, ScriptedAnalyzer};
use std::collections::BTreeMap;

/// Fixed list of items
struct ListSource {
    items: Vec<String>,
    process_all: bool,
    broken: bool,
}

impl ListSource {
    fn new(count: usize) -> Self {
        Self {
            items: (1..=count).map(image_name).collect(),
            process_all: false,
            broken: false,
        }
    }
}

impl WorkItemSource for ListSource {
    fn container(&self) -> &str {
        "memory"
    }

    fn list(&self) -> QcResult<Vec<WorkItem>> {
        if self.broken {
            return Err(QcError::Backend("Listing refused".to_string()));
        }
        Ok(self
            .items
            .iter()
            .map(|name| WorkItem::new(ItemId::new(name.clone()), name.clone(), PixelRef::Repository(ItemId::new(name.clone()))))
            .collect())
    }

    fn is_processing_all_items(&self) -> bool {
        self.process_all
    }
}

/// Sink recording every call as `<operation> <item> <detail>`
#[derive(Default)]
struct RecordingSink {
    calls: Vec<String>,
    summaries: Vec<(Vec<SummaryRow>, bool)>,
}

impl RecordingSink {
    fn calls_for(&self, item: &str) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.split(' ').nth(1) == Some(item))
            .map(|c| {
                let mut parts = c.split(' ');
                let op = parts.next().unwrap_or_default();
                let detail = parts.nth(1).unwrap_or_default();
                format!("{} {}", op, detail).trim().to_string()
            })
            .collect()
    }
}

impl ArtifactSink for RecordingSink {
    fn publish_heatmap(&mut self, item: &WorkItem, heatmap: &Heatmap) {
        self.calls.push(format!("heatmap {} {}", item.name, heatmap.title));
    }

    fn publish_channel_table(&mut self, item: &WorkItem, channel_id: u32, _table: &Table) {
        self.calls.push(format!("results {} ch{}", item.name, channel_id));
    }

    fn publish_key_values(&mut self, item: &WorkItem, key_values: &BTreeMap<String, String>) {
        self.calls.push(format!("key_values {} {}", item.name, key_values.len()));
    }

    fn publish_grid_points(&mut self, item: &WorkItem, channel_id: u32, kind: GridKind, _points: &[Region]) {
        self.calls.push(format!("grid {} {}", item.name, kind.artifact_name(channel_id)));
    }

    fn publish_pcc_table(&mut self, item: &WorkItem, _table: &Table) {
        self.calls.push(format!("pcc {}", item.name));
    }

    fn apply_state_markers(&mut self, item: &WorkItem, markers: &[String]) {
        self.calls.push(format!("markers {} {}", item.name, markers.join("+")));
    }

    fn publish_summary(&mut self, rows: &[SummaryRow], metric_headers: &[String], extend: bool) -> Option<String> {
        assert_eq!(metric_headers.len(), 16);
        self.summaries.push((rows.to_vec(), extend));
        Some("summary".to_string())
    }
}

fn pipeline(analyzer: ScriptedAnalyzer, processing: ProcessingConfig) -> Pipeline {
    Pipeline::new(
        Naming::default(),
        PipelineConfig::from_processing(&processing),
        Box::new(analyzer),
    )
}

#[test]
fn test_failed_item_does_not_stop_the_batch() {
    let analyzer = ScriptedAnalyzer::new(1).failing_on(image_name(3));
    let calls = analyzer.clone();
    let pipeline = pipeline(analyzer, ProcessingConfig::default());
    let source = ListSource::new(5);
    let mut sink = RecordingSink::default();

    let report = pipeline.run(&source, &mut sink).unwrap();

    assert_eq!(calls.calls().len(), 5);
    assert_eq!(report.listed, 5);
    assert_eq!(
        report.processed,
        vec![image_name(1), image_name(2), image_name(4), image_name(5)]
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, image_name(3));
    assert!(report.failed[0].1.contains("No rings found"));

    // Nothing published for the failed item
    assert!(sink.calls_for(&image_name(3)).is_empty());

    assert_eq!(sink.summaries.len(), 1);
    let (rows, extend) = &sink.summaries[0];
    assert!(*extend);
    assert_eq!(rows.len(), 4);
    assert_eq!(report.summary_rows, 4);
    assert_eq!(report.summary_table.as_deref(), Some("summary"));
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert!(!labels.contains(&image_name(3).as_str()));
}

#[test]
fn test_publishing_order_for_two_channels() {
    let pipeline = pipeline(ScriptedAnalyzer::new(2), ProcessingConfig::default());
    let source = ListSource::new(1);
    let mut sink = RecordingSink::default();
    pipeline.run(&source, &mut sink).unwrap();

    let calls = sink.calls_for(&image_name(1));
    let stem = image_name(1).trim_end_matches(".czi").to_string();
    let mut expected = vec!["pcc".to_string()];
    for ch in 0..2 {
        expected.push(format!("grid measuredGrid_ch{}", ch));
        expected.push(format!("grid idealGrid_ch{}", ch));
        expected.push(format!("results ch{}", ch));
        for suffix in ["FieldDistortion", "FieldUniformity", "FWHM"] {
            expected.push(format!("heatmap {}_ch{}_{}", stem, ch, suffix));
        }
    }
    // 7 name fields, pixel size, lattice spacing, one emission entry per channel
    expected.push("key_values 11".to_string());
    expected.push("markers processed+argolight".to_string());
    assert_eq!(calls, expected);

    let (rows, _) = &sink.summaries[0];
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].values[0], 0.0);
    assert_eq!(rows[1].values[0], 1.0);
    assert_eq!(rows[0].image_id, image_name(1));
}

#[test]
fn test_heatmaps_follow_configuration() {
    let disabled = ProcessingConfig {
        save_heatmaps: false,
        ..ProcessingConfig::default()
    };
    let mut sink = RecordingSink::default();
    pipeline(ScriptedAnalyzer::new(1), disabled)
        .run(&ListSource::new(1), &mut sink)
        .unwrap();
    assert!(!sink.calls.iter().any(|c| c.starts_with("heatmap")));

    let fwhm_only = ProcessingConfig {
        heatmap_features: vec!["FWHM".to_string(), "unknown".to_string()],
        ..ProcessingConfig::default()
    };
    let mut sink = RecordingSink::default();
    pipeline(ScriptedAnalyzer::new(1), fwhm_only)
        .run(&ListSource::new(1), &mut sink)
        .unwrap();
    let heatmaps: Vec<&String> = sink.calls.iter().filter(|c| c.starts_with("heatmap")).collect();
    assert_eq!(heatmaps.len(), 1);
    assert!(heatmaps[0].ends_with("_ch0_FWHM"));
}

#[test]
fn test_process_all_requests_a_new_table() {
    let pipeline = pipeline(ScriptedAnalyzer::new(1), ProcessingConfig::default());
    let mut source = ListSource::new(2);
    source.process_all = true;
    let mut sink = RecordingSink::default();
    pipeline.run(&source, &mut sink).unwrap();

    assert_eq!(sink.summaries.len(), 1);
    assert!(!sink.summaries[0].1);
}

#[test]
fn test_no_success_skips_summary() {
    let analyzer = ScriptedAnalyzer::new(1)
        .failing_on(image_name(1))
        .failing_on(image_name(2));
    let mut sink = RecordingSink::default();
    let report = pipeline(analyzer, ProcessingConfig::default())
        .run(&ListSource::new(2), &mut sink)
        .unwrap();

    assert!(sink.summaries.is_empty());
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.summary_table, None);
}

#[test]
fn test_listing_failure_is_fatal() {
    let mut source = ListSource::new(3);
    source.broken = true;
    let mut sink = RecordingSink::default();
    let result = pipeline(ScriptedAnalyzer::new(1), ProcessingConfig::default()).run(&source, &mut sink);

    assert!(matches!(result, Err(QcError::Backend(_))));
    assert!(sink.calls.is_empty());
}
