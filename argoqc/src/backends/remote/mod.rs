//! Remote repository backend
//!
//! Items are the images of one repository container. Markers are repository
//! tags; per-image results are attached to the image, heatmaps are imported
//! as new images of the container, and the summary table (plus its CSV
//! mirror) is attached to the container.

pub mod client;
pub mod http_client;
pub mod sink;
pub mod source;

pub use client::{RemoteItem, RemoteObject, RepositoryClient, Scope};
pub use http_client::HttpRepositoryClient;
pub use sink::RemoteSink;
pub use source::RemoteSource;
