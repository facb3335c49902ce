//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use plaza_image_index::index_storage::SharedStore;
use plaza_image_index::source::{SharedSource, TreeSource};
use plaza_image_index::{ImageLocator, IndexConfig, MemoryStore, TreePayload};
use serde_json::{Value, json};

/// Builder for remote tree payloads
pub struct TreeBuilder {
    regions: Vec<Vec<FolderBuilder>>,
    total_images: Option<u64>,
}

impl TreeBuilder {
    /// Create a tree with no regions
    pub fn new() -> Self {
        Self { regions: Vec::new(), total_images: None }
    }

    /// Add a region holding the given folders
    pub fn region(mut self, folders: Vec<FolderBuilder>) -> Self {
        self.regions.push(folders);
        self
    }

    /// Set the declared image total
    pub fn total_images(mut self, total: u64) -> Self {
        self.total_images = Some(total);
        self
    }

    pub fn to_value(&self) -> Value {
        let regions: Vec<Value> = self
            .regions
            .iter()
            .enumerate()
            .map(|(i, folders)| {
                json!({
                    "id": format!("region-{}", i),
                    "estado": format!("Estado {}", i),
                    "children": folders.iter().map(FolderBuilder::to_value).collect::<Vec<_>>(),
                })
            })
            .collect();

        let mut tree = json!({
            "generated_at": "2026-01-01T00:00:00Z",
            "structure": { "name": "root", "children": regions },
        });
        if let Some(total) = self.total_images {
            tree["total_images"] = json!(total);
        }
        tree
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn to_payload(&self) -> TreePayload {
        serde_json::from_value(self.to_value()).expect("Failed to parse tree fixture")
    }

    /// Write the tree as `drive_tree.json` inside `dir`
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("drive_tree.json");
        fs::write(&path, self.to_json()).expect("Failed to write tree file");
        path
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for plaza folders
pub struct FolderBuilder {
    key: Option<String>,
    alias: Option<String>,
    name: Option<String>,
    files: Vec<Value>,
}

impl FolderBuilder {
    /// Folder with an explicit key
    pub fn keyed(key: &str) -> Self {
        Self { key: Some(key.to_string()), alias: None, name: None, files: Vec::new() }
    }

    /// Folder whose key must be derived from its name
    pub fn named(name: &str) -> Self {
        Self { key: None, alias: None, name: Some(name.to_string()), files: Vec::new() }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Add a file with a precomputed medium URL of `https://img.test/<id>`
    pub fn image(mut self, id: &str) -> Self {
        self.files.push(json!({
            "i": id,
            "n": format!("{}.jpg", id),
            "s": 1024,
            "mediumUrl": image_url(id),
        }));
        self
    }

    /// Add a file with only an id, so its URL is synthesized
    pub fn bare_image(mut self, id: &str) -> Self {
        self.files.push(json!({ "id": id }));
        self
    }

    /// Add an arbitrary raw file node
    pub fn raw_file(mut self, file: Value) -> Self {
        self.files.push(file);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut folder = json!({ "children": self.files });
        if let Some(key) = &self.key {
            folder["k"] = json!(key);
        }
        if let Some(alias) = &self.alias {
            folder["alias"] = json!(alias);
        }
        if let Some(name) = &self.name {
            folder["name"] = json!(name);
        }
        folder
    }
}

/// URL generated by [`FolderBuilder::image`]
pub fn image_url(id: &str) -> String {
    format!("https://img.test/{}", id)
}

/// The tree most tests start from: one plaza with an alias and two images
pub fn plaza_centro_tree() -> TreeBuilder {
    TreeBuilder::new().region(vec![
        FolderBuilder::keyed("i-01-002-03").alias("Plaza Centro").image("a").image("b"),
        FolderBuilder::keyed("i-15-001-09").image("c"),
    ])
}

struct MockState {
    version: String,
    tree: String,
    offline: bool,
    single: HashMap<String, Vec<String>>,
}

/// In-memory tree source with swappable content and call counters
pub struct MockSource {
    state: Mutex<MockState>,
    version_calls: AtomicUsize,
    tree_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(version: &str, tree: &TreeBuilder) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                version: version.to_string(),
                tree: tree.to_json(),
                offline: false,
                single: HashMap::new(),
            }),
            version_calls: AtomicUsize::new(0),
            tree_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        })
    }

    /// Replace the served tree and version
    pub fn publish(&self, version: &str, tree: &TreeBuilder) {
        let mut state = self.state.lock().unwrap();
        state.version = version.to_string();
        state.tree = tree.to_json();
    }

    /// Serve a raw (possibly invalid) tree body
    pub fn publish_raw(&self, version: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.version = version.to_string();
        state.tree = body.to_string();
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Answer for the single-key lookup
    pub fn set_single(&self, key: &str, urls: &[&str]) {
        let urls = urls.iter().map(|u| u.to_string()).collect();
        self.state.lock().unwrap().single.insert(key.to_string(), urls);
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    pub fn tree_calls(&self) -> usize {
        self.tree_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TreeSource for MockSource {
    async fn fetch_version(&self) -> Result<String> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.offline {
            bail!("network unreachable");
        }
        Ok(state.version.clone())
    }

    async fn fetch_tree(&self) -> Result<TreePayload> {
        self.tree_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.offline {
            bail!("network unreachable");
        }
        Ok(serde_json::from_str(&state.tree)?)
    }

    async fn lookup_single(&self, key: &str) -> Result<Vec<String>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.offline {
            bail!("network unreachable");
        }
        Ok(state.single.get(key).cloned().unwrap_or_default())
    }
}

/// Locator over `source` and `store` with default settings
pub fn locator_with(source: &Arc<MockSource>, store: SharedStore) -> Arc<ImageLocator> {
    locator_with_config(source, store, IndexConfig::default())
}

pub fn locator_with_config(
    source: &Arc<MockSource>,
    store: SharedStore,
    config: IndexConfig,
) -> Arc<ImageLocator> {
    let source: SharedSource = source.clone();
    Arc::new(ImageLocator::new(source, store, config))
}

/// Locator over `source` with a fresh in-memory store
pub fn locator(source: &Arc<MockSource>) -> Arc<ImageLocator> {
    locator_with(source, Arc::new(MemoryStore::new()))
}
