//! In-memory repository client
//!
//! Clones share the same state, so a test keeps one handle for inspection
//! while the source and sink hold another.

use argoqc::backends::remote::{RemoteItem, RemoteObject, RepositoryClient, Scope};
use argoqc::models::{ItemId, Table};
use argoqc::{QcError, QcResult};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub id: ItemId,
    pub container: String,
    pub name: String,
    pub markers: BTreeSet<String>,
    pub key_values: BTreeMap<String, String>,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StoredTable {
    pub id: String,
    pub scope: Scope,
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub scope: Scope,
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct RepositoryState {
    next_id: u64,
    containers: BTreeMap<String, String>,
    items: Vec<StoredItem>,
    tables: Vec<StoredTable>,
    files: Vec<StoredFile>,
    failing_marker_reads: bool,
    failing_uploads: bool,
}

impl RepositoryState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn item_mut(&mut self, id: &ItemId) -> QcResult<&mut StoredItem> {
        self.items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| QcError::Backend(format!("No item {}", id)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Rc<RefCell<RepositoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container and return its id
    pub fn add_container(&self, name: &str) -> String {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.containers.insert(id.clone(), name.to_string());
        id
    }

    /// Add an image to `container` with the given markers
    pub fn add_item(&self, container: &str, name: &str, markers: &[&str]) -> ItemId {
        let mut state = self.state.borrow_mut();
        let id = ItemId::new(state.allocate_id());
        state.items.push(StoredItem {
            id: id.clone(),
            container: container.to_string(),
            name: name.to_string(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
            key_values: BTreeMap::new(),
            content: Vec::new(),
        });
        id
    }

    pub fn fail_marker_reads(&self, failing: bool) {
        self.state.borrow_mut().failing_marker_reads = failing;
    }

    pub fn fail_uploads(&self, failing: bool) {
        self.state.borrow_mut().failing_uploads = failing;
    }

    pub fn item(&self, id: &ItemId) -> Option<StoredItem> {
        self.state.borrow().items.iter().find(|i| &i.id == id).cloned()
    }

    pub fn items_in(&self, container: &str) -> Vec<StoredItem> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|i| i.container == container)
            .cloned()
            .collect()
    }

    pub fn markers(&self, id: &ItemId) -> BTreeSet<String> {
        self.item(id).map(|i| i.markers).unwrap_or_default()
    }

    pub fn tables_in(&self, scope: &Scope) -> Vec<StoredTable> {
        self.state
            .borrow()
            .tables
            .iter()
            .filter(|t| &t.scope == scope)
            .cloned()
            .collect()
    }

    pub fn files_in(&self, scope: &Scope) -> Vec<StoredFile> {
        self.state
            .borrow()
            .files
            .iter()
            .filter(|f| &f.scope == scope)
            .cloned()
            .collect()
    }

    pub fn has_table(&self, table_id: &str) -> bool {
        self.state.borrow().tables.iter().any(|t| t.id == table_id)
    }

    /// Store a table directly, as if left by an earlier run
    pub fn seed_table(&self, scope: Scope, name: &str, table: Table) -> String {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.tables.push(StoredTable {
            id: id.clone(),
            scope,
            name: name.to_string(),
            table,
        });
        id
    }

    fn check_upload(&self) -> QcResult<()> {
        if self.state.borrow().failing_uploads {
            return Err(QcError::Backend("Upload refused".to_string()));
        }
        Ok(())
    }
}

impl RepositoryClient for MemoryRepository {
    fn container_name(&self, container: &str) -> QcResult<String> {
        self.state
            .borrow()
            .containers
            .get(container)
            .cloned()
            .ok_or_else(|| QcError::Backend(format!("No container {}", container)))
    }

    fn list_items(&self, container: &str) -> QcResult<Vec<RemoteItem>> {
        Ok(self
            .items_in(container)
            .into_iter()
            .map(|i| RemoteItem {
                id: i.id,
                name: i.name,
            })
            .collect())
    }

    fn get_markers(&self, item: &ItemId) -> QcResult<BTreeSet<String>> {
        if self.state.borrow().failing_marker_reads {
            return Err(QcError::Backend("Tag service unavailable".to_string()));
        }
        self.item(item)
            .map(|i| i.markers)
            .ok_or_else(|| QcError::Backend(format!("No item {}", item)))
    }

    fn add_marker(&self, item: &ItemId, marker: &str) -> QcResult<()> {
        let mut state = self.state.borrow_mut();
        state.item_mut(item)?.markers.insert(marker.to_string());
        Ok(())
    }

    fn remove_marker(&self, item: &ItemId, marker: &str) -> QcResult<()> {
        let mut state = self.state.borrow_mut();
        state.item_mut(item)?.markers.remove(marker);
        Ok(())
    }

    fn add_key_values(&self, item: &ItemId, key_values: &BTreeMap<String, String>) -> QcResult<()> {
        self.check_upload()?;
        let mut state = self.state.borrow_mut();
        state.item_mut(item)?.key_values.extend(key_values.clone());
        Ok(())
    }

    fn list_tables(&self, scope: &Scope) -> QcResult<Vec<RemoteObject>> {
        Ok(self
            .tables_in(scope)
            .into_iter()
            .map(|t| RemoteObject {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    fn read_table(&self, table_id: &str) -> QcResult<Table> {
        self.state
            .borrow()
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .map(|t| t.table.clone())
            .ok_or_else(|| QcError::Backend(format!("No table {}", table_id)))
    }

    fn upload_table(&self, scope: &Scope, name: &str, table: &Table) -> QcResult<String> {
        self.check_upload()?;
        Ok(self.seed_table(scope.clone(), name, table.clone()))
    }

    fn delete_table(&self, table_id: &str) -> QcResult<()> {
        let mut state = self.state.borrow_mut();
        let before = state.tables.len();
        state.tables.retain(|t| t.id != table_id);
        if state.tables.len() == before {
            return Err(QcError::Backend(format!("No table {}", table_id)));
        }
        Ok(())
    }

    fn list_files(&self, scope: &Scope) -> QcResult<Vec<RemoteObject>> {
        Ok(self
            .files_in(scope)
            .into_iter()
            .map(|f| RemoteObject {
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    fn upload_file(&self, scope: &Scope, name: &str, content: &[u8]) -> QcResult<String> {
        self.check_upload()?;
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.files.push(StoredFile {
            id: id.clone(),
            scope: scope.clone(),
            name: name.to_string(),
            content: content.to_vec(),
        });
        Ok(id)
    }

    fn delete_file(&self, file_id: &str) -> QcResult<()> {
        let mut state = self.state.borrow_mut();
        let before = state.files.len();
        state.files.retain(|f| f.id != file_id);
        if state.files.len() == before {
            return Err(QcError::Backend(format!("No file {}", file_id)));
        }
        Ok(())
    }

    fn import_image(&self, container: &str, name: &str, content: &[u8]) -> QcResult<ItemId> {
        self.check_upload()?;
        let id = self.add_item(container, name, &[]);
        self.state.borrow_mut().item_mut(&id)?.content = content.to_vec();
        Ok(id)
    }
}
