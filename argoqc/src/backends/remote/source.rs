//! Work-item source over a repository container

use super::client::RepositoryClient;
use crate::backends::selection::is_selected;
use crate::backends::WorkItemSource;
use crate::config::Naming;
use crate::error::QcResult;
use crate::models::{PixelRef, WorkItem};
use std::rc::Rc;
use tracing::debug;

pub struct RemoteSource {
    client: Rc<dyn RepositoryClient>,
    container: String,
    naming: Naming,
    process_all: bool,
}

impl RemoteSource {
    pub fn new(
        client: Rc<dyn RepositoryClient>,
        container: impl Into<String>,
        naming: Naming,
        process_all: bool,
    ) -> Self {
        Self {
            client,
            container: container.into(),
            naming,
            process_all,
        }
    }
}

impl WorkItemSource for RemoteSource {
    fn container(&self) -> &str {
        &self.container
    }

    fn list(&self) -> QcResult<Vec<WorkItem>> {
        let mut items = Vec::new();
        for remote in self.client.list_items(&self.container)? {
            if self.naming.is_derived(&remote.name) {
                debug!(item = %remote.name, "Skipping derived image");
                continue;
            }
            let markers = self.client.get_markers(&remote.id)?;
            if !is_selected(&remote.name, &markers, &self.naming, self.process_all) {
                debug!(item = %remote.name, markers = ?markers, "Skipping image");
                continue;
            }
            let pixels = PixelRef::Repository(remote.id.clone());
            items.push(WorkItem::new(remote.id, remote.name, pixels).with_markers(markers));
        }
        Ok(items)
    }

    fn is_processing_all_items(&self) -> bool {
        self.process_all
    }
}
