//! PUBLISHING: derive results of an analysed item and hand them to the sink

use super::Pipeline;
use crate::backends::{ArtifactSink, GridKind};
use crate::models::{Channel, SummaryRow, WorkItem};
use crate::services::heatmap::{build_heatmap, Heatmap, HeatmapParams};
use crate::services::metrics::{channel_summary, results_table, PccTable};
use tracing::{debug, warn};

impl Pipeline {
    /// Publish every artifact of `item`, then mark it processed
    ///
    /// Returns the item's summary rows. Sink failures are logged by the sink
    /// and do not stop the remaining artifacts.
    pub(super) fn phase_publishing(
        &self,
        item: &WorkItem,
        sink: &mut dyn ArtifactSink,
    ) -> Vec<SummaryRow> {
        if let Some(pcc) = PccTable::compute(&item.channels) {
            sink.publish_pcc_table(item, &pcc.to_table());
        }

        let mut rows = Vec::with_capacity(item.channels.len());
        for channel in &item.channels {
            sink.publish_grid_points(item, channel.id, GridKind::Measured, &channel.measured_grid);
            sink.publish_grid_points(item, channel.id, GridKind::Ideal, &channel.ideal_grid);

            match results_table(channel) {
                Some(table) => sink.publish_channel_table(item, channel.id, &table),
                None => warn!(
                    item = %item.name,
                    channel = channel.id,
                    fwhm = channel.fwhm.len(),
                    distortion = channel.field_distortion.len(),
                    uniformity = channel.field_uniformity.len(),
                    "Per-ring lists differ in length, results table skipped"
                ),
            }

            for heatmap in self.heatmaps(item, channel) {
                sink.publish_heatmap(item, &heatmap);
            }

            rows.push(SummaryRow {
                image_id: item.id.to_string(),
                label: item.name.clone(),
                values: channel_summary(channel),
            });
        }

        sink.publish_key_values(item, &item.key_values);
        sink.apply_state_markers(item, &self.naming.completion_markers());
        rows
    }

    fn heatmaps(&self, item: &WorkItem, channel: &Channel) -> Vec<Heatmap> {
        let features = self.config.active_features();
        let Some(pixel_size_um) = item.pixel_size_um else {
            return Vec::new();
        };
        let params = HeatmapParams::for_channel(
            channel,
            pixel_size_um,
            self.config.lattice_spacing_um,
            self.config.canvas_height,
        );
        let stem = item.name_without_extension();

        let mut heatmaps = Vec::with_capacity(features.len());
        for &feature in features {
            let values = channel.values(feature);
            if values.is_empty() {
                debug!(item = %item.name, channel = channel.id, feature = feature.tag(), "No values, heatmap skipped");
                continue;
            }
            match build_heatmap(values, &params) {
                Some(raster) => heatmaps.push(Heatmap::new(&stem, channel.id, feature, raster)),
                None => warn!(
                    item = %item.name,
                    channel = channel.id,
                    feature = feature.tag(),
                    "Heatmap could not be built"
                ),
            }
        }
        heatmaps
    }
}
