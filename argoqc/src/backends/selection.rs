//! Work-item selection and marker bookkeeping shared by both backends

use crate::config::Naming;
use std::collections::BTreeSet;

/// Whether an item with these markers is picked up by a run
///
/// Derived images are never selected. In new-only mode items already carrying
/// the raw or processed marker are skipped; when processing all items only
/// the processed marker excludes.
pub fn is_selected(
    name: &str,
    markers: &BTreeSet<String>,
    naming: &Naming,
    process_all: bool,
) -> bool {
    if naming.is_derived(name) {
        return false;
    }
    if markers.contains(&naming.processed_marker) {
        return false;
    }
    process_all || !markers.contains(&naming.raw_marker)
}

/// Marker changes needed to apply `adding` on top of `current`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerChange {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl MarkerChange {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Compute the additions and removals for an idempotent marker update
///
/// Markers already present are not added again; adding the processed marker
/// removes the raw one.
pub fn plan_marker_change(
    current: &BTreeSet<String>,
    adding: &[String],
    naming: &Naming,
) -> MarkerChange {
    let mut change = MarkerChange::default();
    for marker in adding {
        if marker.is_empty() || current.contains(marker) || change.add.contains(marker) {
            continue;
        }
        change.add.push(marker.clone());
    }
    let completes = adding.iter().any(|m| *m == naming.processed_marker);
    let adds_raw = adding.iter().any(|m| *m == naming.raw_marker);
    if completes && current.contains(&naming.raw_marker) {
        change.remove.push(naming.raw_marker.clone());
    }
    if completes && adds_raw {
        change.add.retain(|m| *m != naming.raw_marker);
    }
    change
}

/// Apply a planned change to a marker set
pub fn apply_change(markers: &mut BTreeSet<String>, change: &MarkerChange) {
    for marker in &change.remove {
        markers.remove(marker);
    }
    markers.extend(change.add.iter().cloned());
}
