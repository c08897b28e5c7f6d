//! ANALYZING: run the optical analysis and attach its measurements

use super::Pipeline;
use crate::error::QcResult;
use crate::models::table::format_number;
use crate::models::WorkItem;
use tracing::debug;

impl Pipeline {
    /// Populate `item` with channels, pixel size and processing key-values
    pub(super) fn phase_analyzing(&self, item: &mut WorkItem) -> QcResult<()> {
        let analysis = self.analyzer.analyze(item)?;
        debug!(
            item = %item.name,
            channels = analysis.channels.len(),
            pixel_size_um = analysis.pixel_size_um,
            "Analysis complete"
        );

        item.key_values.insert(
            "Pixel_size__um".to_string(),
            format_number(analysis.pixel_size_um),
        );
        item.key_values.insert(
            "Lattice_spacing__um".to_string(),
            format_number(self.config.lattice_spacing_um),
        );
        for channel in &analysis.channels {
            item.key_values.extend(channel.key_values.clone());
        }

        item.pixel_size_um = Some(analysis.pixel_size_um);
        item.channels = analysis.channels;
        Ok(())
    }
}
