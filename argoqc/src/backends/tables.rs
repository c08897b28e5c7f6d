//! Summary table naming and version selection
//!
//! Summary tables are named `<date>_<subject>_Table` (plus `.csv` for flat
//! files), where `<date>` is a date token and `<subject>` the container
//! subject: the instrument folder name locally, the dataset name remotely.
//! The current table of a subject is the one with the greatest date.

use crate::models::table::format_number;
use crate::models::{Region, Table};
use argoqc_common::time::{format_date_token, parse_date_token};
use chrono::{Duration, NaiveDateTime};
use tracing::warn;

/// Table name (without extension) stamped with `at`
pub fn summary_table_name(at: NaiveDateTime, subject: &str, suffix: &str) -> String {
    format!("{}_{}_{}", format_date_token(at), subject, suffix)
}

/// Table name stamped with `at`, or with the first later second whose name is
/// not `taken`
pub fn unique_summary_table_name<F>(
    at: NaiveDateTime,
    subject: &str,
    suffix: &str,
    taken: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let mut at = at;
    loop {
        let name = summary_table_name(at, subject, suffix);
        if !taken(&name) {
            return name;
        }
        at += Duration::seconds(1);
    }
}

/// Whether `name` is a summary table of `subject`, regardless of its date
pub fn is_subject_table(name: &str, subject: &str, suffix: &str) -> bool {
    let stem = name.strip_suffix(".csv").unwrap_or(name);
    match stem.split_once('_') {
        Some((_, rest)) => rest == format!("{}_{}", subject, suffix),
        None => false,
    }
}

/// Date of a summary table, from its leading token
pub fn leading_date(name: &str) -> Option<NaiveDateTime> {
    name.split('_').next().and_then(parse_date_token)
}

/// Pick the current summary table of `subject` among `candidates`
///
/// Candidates of other subjects are ignored. Subject tables whose leading
/// token is not a valid date are reported and skipped. Equal dates are
/// resolved by the greater name.
pub fn select_latest<'a, T, F>(
    candidates: &'a [T],
    name_of: F,
    subject: &str,
    suffix: &str,
) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    candidates
        .iter()
        .filter(|c| is_subject_table(name_of(*c), subject, suffix))
        .filter_map(|c| {
            let name = name_of(c);
            match leading_date(name) {
                Some(date) => Some((date, name, c)),
                None => {
                    warn!(table = %name, "Summary table name has no valid date token, ignoring");
                    None
                }
            }
        })
        .max_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)))
        .map(|(_, _, c)| c)
}

/// Grid points as a table: `index,x,y,width,height`
pub fn grid_points_table(points: &[Region]) -> Table {
    let mut table = Table::new(
        ["index", "x", "y", "width", "height"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
    );
    for (index, point) in points.iter().enumerate() {
        table.push_row(vec![
            index.to_string(),
            format_number(point.x),
            format_number(point.y),
            format_number(point.width),
            format_number(point.height),
        ]);
    }
    table
}

/// Key-value map as a table: `key,value`
pub fn key_values_table<'a, I>(key_values: I) -> Table
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut table = Table::new(vec!["key".to_string(), "value".to_string()]);
    for (key, value) in key_values {
        table.push_row(vec![key.clone(), value.clone()]);
    }
    table
}
