//! Data models for argoqc
//!
//! - `WorkItem`: one image selected for a run, with its parsed name fields
//! - `Channel`: per-channel measurements returned by the optical analysis
//! - `Table`: flat CSV-shaped table used for results and summaries

pub mod channel;
pub mod table;
pub mod work_item;

pub use channel::{Channel, PixelRegion, Region};
pub use table::{SummaryRow, Table};
pub use work_item::{ItemId, PixelRef, WorkItem};
