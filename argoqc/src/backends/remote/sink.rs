//! Artifact sink publishing to the repository

use super::client::{RepositoryClient, Scope};
use crate::backends::selection::plan_marker_change;
use crate::backends::tables::{
    grid_points_table, is_subject_table, select_latest, unique_summary_table_name,
};
use crate::backends::{report_failure, ArtifactSink, GridKind};
use crate::config::Naming;
use crate::error::{QcError, QcResult};
use crate::models::{ItemId, Region, SummaryRow, Table, WorkItem};
use crate::services::heatmap::Heatmap;
use argoqc_common::time::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub struct RemoteSink {
    client: Rc<dyn RepositoryClient>,
    container: String,
    /// Container name, embedded in summary table names
    subject: String,
    naming: Naming,
    clock: Box<dyn Clock>,
}

impl RemoteSink {
    /// Bind to `container`; fails if the container cannot be resolved
    pub fn new(
        client: Rc<dyn RepositoryClient>,
        container: impl Into<String>,
        naming: Naming,
    ) -> QcResult<Self> {
        Self::with_clock(client, container, naming, Box::new(SystemClock))
    }

    pub fn with_clock(
        client: Rc<dyn RepositoryClient>,
        container: impl Into<String>,
        naming: Naming,
        clock: Box<dyn Clock>,
    ) -> QcResult<Self> {
        let container = container.into();
        let subject = client.container_name(&container)?;
        Ok(Self {
            client,
            container,
            subject,
            naming,
            clock,
        })
    }

    /// Upload a table and drop older tables of the same name in `scope`
    fn replace_table(&self, scope: &Scope, name: &str, table: &Table) -> QcResult<String> {
        let stale: Vec<String> = self
            .client
            .list_tables(scope)?
            .into_iter()
            .filter(|t| t.name == name)
            .map(|t| t.id)
            .collect();
        let id = self.client.upload_table(scope, name, table)?;
        for old in stale {
            self.client.delete_table(&old)?;
        }
        Ok(id)
    }

    /// Upload a file and drop older files of the same name in `scope`
    fn replace_file(&self, scope: &Scope, name: &str, content: &[u8]) -> QcResult<String> {
        let stale: Vec<String> = self
            .client
            .list_files(scope)?
            .into_iter()
            .filter(|f| f.name == name)
            .map(|f| f.id)
            .collect();
        let id = self.client.upload_file(scope, name, content)?;
        for old in stale {
            self.client.delete_file(&old)?;
        }
        Ok(id)
    }

    fn import_heatmap(&self, heatmap: &Heatmap) -> QcResult<ItemId> {
        let bytes = heatmap.to_tiff_bytes()?;
        let id = self
            .client
            .import_image(&self.container, &heatmap.file_name(), &bytes)?;
        for marker in [
            self.naming.processed_marker.as_str(),
            heatmap.feature.tag(),
            self.naming.slide_marker.as_str(),
        ] {
            self.client.add_marker(&id, marker)?;
        }
        Ok(id)
    }

    fn update_markers(&self, item: &WorkItem, markers: &[String]) -> QcResult<()> {
        let current = self.client.get_markers(&item.id)?;
        let change = plan_marker_change(&current, markers, &self.naming);
        if change.is_empty() {
            debug!(item = %item.name, "Markers already applied");
            return Ok(());
        }
        for marker in &change.add {
            self.client.add_marker(&item.id, marker)?;
        }
        for marker in &change.remove {
            self.client.remove_marker(&item.id, marker)?;
        }
        info!(item = %item.name, added = ?change.add, removed = ?change.remove, "Markers updated");
        Ok(())
    }

    fn write_summary(
        &self,
        rows: &[SummaryRow],
        metric_headers: &[String],
        extend: bool,
    ) -> QcResult<String> {
        let scope = Scope::Container(self.container.clone());
        let suffix = &self.naming.table_suffix;
        let tables = self.client.list_tables(&scope)?;
        let current = select_latest(&tables, |t| t.name.as_str(), &self.subject, suffix).cloned();
        let replaced = if extend { current.as_ref().map(|t| t.id.as_str()) } else { None };
        let new_name = unique_summary_table_name(self.clock.now(), &self.subject, suffix, |name| {
            tables.iter().any(|t| t.name == name && Some(t.id.as_str()) != replaced)
        });

        match current {
            Some(old) if extend => {
                let mut table = self.client.read_table(&old.id)?;
                table.extend_summary(rows);
                self.client.upload_table(&scope, &new_name, &table)?;
                self.client.delete_table(&old.id)?;

                // Rewrite the CSV mirror
                for file in self.client.list_files(&scope)? {
                    if is_subject_table(&file.name, &self.subject, suffix) {
                        self.client.delete_file(&file.id)?;
                    }
                }
                self.upload_mirror(&scope, &new_name, &table)?;
                info!(
                    previous = %old.name,
                    table = %new_name,
                    appended = rows.len(),
                    total = table.rows.len(),
                    "Summary table replaced"
                );
            }
            _ => {
                let table = Table::summary(metric_headers, rows);
                self.client.upload_table(&scope, &new_name, &table)?;
                self.upload_mirror(&scope, &new_name, &table)?;
                info!(table = %new_name, rows = rows.len(), "Summary table created");
            }
        }
        Ok(new_name)
    }

    fn upload_mirror(&self, scope: &Scope, table_name: &str, table: &Table) -> QcResult<()> {
        let file_name = format!("{}.csv", table_name);
        self.client
            .upload_file(scope, &file_name, table.to_csv()?.as_bytes())?;
        Ok(())
    }
}

impl ArtifactSink for RemoteSink {
    fn publish_heatmap(&mut self, item: &WorkItem, heatmap: &Heatmap) {
        let result = self.import_heatmap(heatmap);
        if let Some(id) = report_failure(result, &item.name, &heatmap.title) {
            debug!(item = %item.name, heatmap = %heatmap.title, image = %id, "Heatmap imported");
        }
    }

    fn publish_channel_table(&mut self, item: &WorkItem, channel_id: u32, table: &Table) {
        let name = format!("Results_table_ch{}", channel_id);
        let result = self.replace_table(&Scope::Item(item.id.clone()), &name, table);
        report_failure(result, &item.name, &name);
    }

    fn publish_key_values(&mut self, item: &WorkItem, key_values: &BTreeMap<String, String>) {
        let result = self.client.add_key_values(&item.id, key_values);
        report_failure(result, &item.name, "key-values");
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
        let name = format!("{}.csv", kind.artifact_name(channel_id));
        let result = grid_points_table(points)
            .to_csv()
            .map_err(QcError::from)
            .and_then(|csv| self.replace_file(&Scope::Item(item.id.clone()), &name, csv.as_bytes()));
        report_failure(result, &item.name, &name);
    }

    fn publish_pcc_table(&mut self, item: &WorkItem, table: &Table) {
        let result = self.replace_table(&Scope::Item(item.id.clone()), "PCC_table", table);
        report_failure(result, &item.name, "PCC_table");
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
        report_failure(result, &self.subject, "summary table")
    }
}
