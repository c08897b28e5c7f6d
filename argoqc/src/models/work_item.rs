//! Work items: images selected from a container for processing

use crate::models::Channel;
use crate::services::name_parser::{self, NameFields};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Identifier of an item, unique within its container
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the raw pixels live; decoding belongs to the image toolkit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelRef {
    /// Image file on the local filesystem
    File(PathBuf),
    /// Image stored in the remote repository
    Repository(ItemId),
}

/// One image picked up by a run
///
/// Lives for the duration of one run. The only persistent state of an item is
/// what the backend stores: its markers and published artifacts.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: ItemId,
    /// Display name as listed by the backend
    pub name: String,
    pub pixels: PixelRef,
    /// Fields parsed from the display name (all empty when it does not match)
    pub fields: NameFields,
    /// Markers currently attached on the backend
    pub markers: BTreeSet<String>,
    /// Metadata published with the item's results
    pub key_values: BTreeMap<String, String>,
    /// Filled by the analysis phase
    pub channels: Vec<Channel>,
    /// Physical pixel size in micrometers, filled by the analysis phase
    pub pixel_size_um: Option<f64>,
}

impl WorkItem {
    /// Create an item and parse its display name into `fields` and `key_values`
    pub fn new(id: ItemId, name: impl Into<String>, pixels: PixelRef) -> Self {
        let name = name.into();
        let mut key_values = BTreeMap::new();
        let fields = name_parser::parse_into(&name, &mut key_values);
        Self {
            id,
            name,
            pixels,
            fields,
            markers: BTreeSet::new(),
            key_values,
            channels: Vec::new(),
            pixel_size_um: None,
        }
    }

    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers.extend(markers.into_iter().map(Into::into));
        self
    }

    /// Display name with its image extension removed
    pub fn name_without_extension(&self) -> String {
        name_parser::strip_extension(&self.name)
    }
}
