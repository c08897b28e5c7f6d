//! HTTP client for a JSON REST repository gateway
//!
//! Endpoints (relative to the base URL):
//! - `GET  /api/containers/{id}` → `{id, name}`
//! - `GET  /api/containers/{id}/items` → `[{id, name}]`
//! - `GET|POST /api/items/{id}/tags`, `DELETE /api/items/{id}/tags/{name}`
//! - `POST /api/items/{id}/key-values` with `{values: {..}}`
//! - `GET|POST /api/{scope}/tables`, `GET|DELETE /api/tables/{id}`
//! - `GET|POST /api/{scope}/files?name=..`, `DELETE /api/files/{id}`
//! - `POST /api/containers/{id}/images?name=..` (TIFF body) → `{id, name}`
//!
//! where `{scope}` is `containers/{id}` or `items/{id}`. Requests carry a
//! bearer token when one is configured.

use super::client::{RemoteItem, RemoteObject, RepositoryClient, Scope};
use crate::error::{QcError, QcResult};
use crate::models::{ItemId, Table};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("argoqc/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContainerInfo {
    name: String,
}

#[derive(Debug, Serialize)]
struct MarkerBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct KeyValuesBody<'a> {
    values: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct TableUpload<'a> {
    name: &'a str,
    #[serde(flatten)]
    table: &'a Table,
}

pub struct HttpRepositoryClient {
    http_client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRepositoryClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> QcResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| QcError::Backend(format!("Invalid repository URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(QcError::Backend(format!(
                "Repository URL cannot hold a path: {}",
                base_url
            )));
        }
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            token,
        })
    }

    /// `<base>/api/<segments>`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> QcResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QcError::Backend(format!("Repository URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn scope_segments(scope: &Scope) -> [&str; 2] {
        match scope {
            Scope::Container(id) => ["containers", id.as_str()],
            Scope::Item(id) => ["items", id.as_str()],
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> QcResult<Response> {
        let response = self.authorized(request).send()?;
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().unwrap_or_default();
            return Err(QcError::Backend(format!(
                "{} returned {}: {}",
                url,
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> QcResult<T> {
        let url = self.url(segments)?;
        debug!(url = %url, "GET");
        Ok(self.send(self.http_client.get(url))?.json()?)
    }

    fn delete(&self, segments: &[&str]) -> QcResult<()> {
        let url = self.url(segments)?;
        debug!(url = %url, "DELETE");
        self.send(self.http_client.delete(url))?;
        Ok(())
    }

    fn post_bytes(&self, segments: &[&str], name: &str, content: &[u8]) -> QcResult<RemoteObject> {
        let url = self.url(segments)?;
        debug!(url = %url, name = %name, bytes = content.len(), "POST");
        let request = self
            .http_client
            .post(url)
            .query(&[("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content.to_vec());
        Ok(self.send(request)?.json()?)
    }
}

impl RepositoryClient for HttpRepositoryClient {
    fn container_name(&self, container: &str) -> QcResult<String> {
        let info: ContainerInfo = self.get_json(&["containers", container])?;
        Ok(info.name)
    }

    fn list_items(&self, container: &str) -> QcResult<Vec<RemoteItem>> {
        self.get_json(&["containers", container, "items"])
    }

    fn get_markers(&self, item: &ItemId) -> QcResult<BTreeSet<String>> {
        self.get_json(&["items", item.as_str(), "tags"])
    }

    fn add_marker(&self, item: &ItemId, marker: &str) -> QcResult<()> {
        let request = self
            .http_client
            .post(self.url(&["items", item.as_str(), "tags"])?)
            .json(&MarkerBody { name: marker });
        self.send(request)?;
        Ok(())
    }

    fn remove_marker(&self, item: &ItemId, marker: &str) -> QcResult<()> {
        self.delete(&["items", item.as_str(), "tags", marker])
    }

    fn add_key_values(&self, item: &ItemId, key_values: &BTreeMap<String, String>) -> QcResult<()> {
        let request = self
            .http_client
            .post(self.url(&["items", item.as_str(), "key-values"])?)
            .json(&KeyValuesBody { values: key_values });
        self.send(request)?;
        Ok(())
    }

    fn list_tables(&self, scope: &Scope) -> QcResult<Vec<RemoteObject>> {
        let [kind, id] = Self::scope_segments(scope);
        self.get_json(&[kind, id, "tables"])
    }

    fn read_table(&self, table_id: &str) -> QcResult<Table> {
        self.get_json(&["tables", table_id])
    }

    fn upload_table(&self, scope: &Scope, name: &str, table: &Table) -> QcResult<String> {
        let [kind, id] = Self::scope_segments(scope);
        let request = self
            .http_client
            .post(self.url(&[kind, id, "tables"])?)
            .json(&TableUpload { name, table });
        let created: RemoteObject = self.send(request)?.json()?;
        Ok(created.id)
    }

    fn delete_table(&self, table_id: &str) -> QcResult<()> {
        self.delete(&["tables", table_id])
    }

    fn list_files(&self, scope: &Scope) -> QcResult<Vec<RemoteObject>> {
        let [kind, id] = Self::scope_segments(scope);
        self.get_json(&[kind, id, "files"])
    }

    fn upload_file(&self, scope: &Scope, name: &str, content: &[u8]) -> QcResult<String> {
        let [kind, id] = Self::scope_segments(scope);
        let created = self.post_bytes(&[kind, id, "files"], name, content)?;
        Ok(created.id)
    }

    fn delete_file(&self, file_id: &str) -> QcResult<()> {
        self.delete(&["files", file_id])
    }

    fn import_image(&self, container: &str, name: &str, content: &[u8]) -> QcResult<ItemId> {
        let created = self.post_bytes(&["containers", container, "images"], name, content)?;
        Ok(ItemId::new(created.id))
    }
}
