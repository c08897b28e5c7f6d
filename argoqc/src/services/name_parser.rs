//! Image name parsing
//!
//! Acquisition names follow
//! `<microscope>_o<objective>_z<zoom>_<immersion>_<slide>_<pattern>_d<date>[_<series>].<ext>`,
//! optionally followed by a container series suffix such as ` [img1]`
//! (`sp8_o63x_z2.6_gly_ArgoSLG511_b_d20230223.lif [img1]`).
//!
//! Fields may contain underscores; each group extends as far right as the
//! remaining markers allow.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// Fields extracted from an image name; all empty when the name does not match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFields {
    pub microscope: String,
    pub objective: String,
    pub zoom: String,
    pub immersion: String,
    pub slide_name: String,
    pub slide_pattern: String,
    pub acquisition_date: String,
    pub series: String,
}

impl NameFields {
    /// Key-value pairs published with the item's results
    pub fn key_values(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Microscope", self.microscope.as_str()),
            ("Objective", self.objective.as_str()),
            ("Immersion", self.immersion.as_str()),
            ("Zoom", self.zoom.as_str()),
            ("ArgoSlide_name", self.slide_name.as_str()),
            ("ArgoSlide_pattern", self.slide_pattern.as_str()),
            ("Acquisition_date", self.acquisition_date.as_str()),
        ]
    }
}

/// Naming grammar; greedy groups so a name with extra underscores still
/// resolves to the rightmost `_o`, `_z` and `_d` markers that leave a match
const NAME_PATTERN: &str = r"(?P<microscope>.*)_o(?P<objective>.*)_z(?P<zoom>.*)_(?P<immersion>.*)_(?P<slide>.*)_(?P<pattern>.*)_d(?P<date>\d*)_?(?P<series>.*)\.(?P<extension>.*)";

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(NAME_PATTERN).ok()).as_ref()
}

/// Parse an image name; `None` when it does not follow the naming grammar
pub fn parse_name(name: &str) -> Option<NameFields> {
    let base = match name.find(" [") {
        Some(pos) => &name[..pos],
        None => name,
    };
    let captures = name_pattern()?.captures(base)?;
    let group = |key: &str| {
        captures
            .name(key)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    Some(NameFields {
        microscope: group("microscope"),
        objective: group("objective"),
        zoom: group("zoom"),
        immersion: group("immersion"),
        slide_name: group("slide"),
        slide_pattern: group("pattern"),
        acquisition_date: group("date"),
        series: group("series"),
    })
}

/// Parse `name` and record its fields in `key_values`
///
/// A non-matching name is reported and yields empty fields; nothing is
/// written to `key_values` in that case.
pub fn parse_into(name: &str, key_values: &mut BTreeMap<String, String>) -> NameFields {
    match parse_name(name) {
        Some(fields) => {
            for (key, value) in fields.key_values() {
                key_values.insert(key.to_string(), value.to_string());
            }
            fields
        }
        None => {
            warn!(
                name = %name,
                "Image name is not correctly formatted, expected e.g. \
                 lsm980_o63x_z1.2_oil_ArgoSLG511_b_d20230223_1.czi"
            );
            NameFields::default()
        }
    }
}

/// Remove the image extension from a display name
///
/// `.lif` and `.vsi` are removed wherever they occur (multi-series containers
/// put the series label after them). Otherwise everything from the last dot
/// is dropped, unless that dot starts the name.
pub fn strip_extension(name: &str) -> String {
    for container in [".lif", ".vsi"] {
        if name.contains(container) {
            return name.replace(container, "");
        }
    }
    match name.rfind('.') {
        Some(pos) if pos > 0 => name[..pos].to_string(),
        _ => name.to_string(),
    }
}
