//! Remote repository boundary
//!
//! The repository stores images grouped in containers (datasets) and lets
//! tags, key-value maps, tables and flat files be attached to a container or
//! to a single image. Calls are independent: there are no transactions.

use crate::error::QcResult;
use crate::models::{ItemId, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Object a table or file is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Container(String),
    Item(ItemId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Container(id) => write!(f, "container {}", id),
            Scope::Item(id) => write!(f, "item {}", id),
        }
    }
}

/// Image listed in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: ItemId,
    pub name: String,
}

/// Table or file attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
}

pub trait RepositoryClient {
    /// Display name of a container; the subject of its summary tables
    fn container_name(&self, container: &str) -> QcResult<String>;

    /// Images of a container, in repository order
    fn list_items(&self, container: &str) -> QcResult<Vec<RemoteItem>>;

    fn get_markers(&self, item: &ItemId) -> QcResult<BTreeSet<String>>;
    fn add_marker(&self, item: &ItemId, marker: &str) -> QcResult<()>;
    fn remove_marker(&self, item: &ItemId, marker: &str) -> QcResult<()>;

    fn add_key_values(&self, item: &ItemId, key_values: &BTreeMap<String, String>) -> QcResult<()>;

    fn list_tables(&self, scope: &Scope) -> QcResult<Vec<RemoteObject>>;
    fn read_table(&self, table_id: &str) -> QcResult<Table>;
    /// Returns the id of the new table
    fn upload_table(&self, scope: &Scope, name: &str, table: &Table) -> QcResult<String>;
    fn delete_table(&self, table_id: &str) -> QcResult<()>;

    fn list_files(&self, scope: &Scope) -> QcResult<Vec<RemoteObject>>;
    /// Returns the id of the new file
    fn upload_file(&self, scope: &Scope, name: &str, content: &[u8]) -> QcResult<String>;
    fn delete_file(&self, file_id: &str) -> QcResult<()>;

    /// Import a raster as a new image of `container`
    fn import_image(&self, container: &str, name: &str, content: &[u8]) -> QcResult<ItemId>;
}
