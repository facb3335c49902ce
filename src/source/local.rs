use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::TreeSource;
use crate::indexer::build_index;
use crate::lookup::resolve_local;
use crate::models::TreePayload;

/// Tree source reading a `drive_tree.json` file from disk.
///
/// The file modification time (Unix milliseconds) is the version token.
#[derive(Debug, Clone)]
pub struct LocalTreeSource {
    path: PathBuf,
    url_template: String,
}

impl LocalTreeSource {
    pub fn new(path: impl Into<PathBuf>, url_template: &str) -> Self {
        Self { path: path.into(), url_template: url_template.to_string() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TreeSource for LocalTreeSource {
    async fn fetch_version(&self) -> Result<String> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .with_context(|| format!("Failed to stat tree file: {}", self.path.display()))?;
        let modified = metadata.modified().context("File modification time unavailable")?;
        let millis = modified.duration_since(SystemTime::UNIX_EPOCH)?.as_millis();
        Ok(millis.to_string())
    }

    async fn fetch_tree(&self) -> Result<TreePayload> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read tree file: {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse tree file: {}", self.path.display()))
    }

    /// Scans the file directly, without fuzzy matching
    async fn lookup_single(&self, key: &str) -> Result<Vec<String>> {
        let tree = self.fetch_tree().await?;
        let built = build_index(&tree, &self.url_template);
        let urls = resolve_local(&built.index, key)
            .filter(|resolution| !resolution.tier.is_fuzzy())
            .map(|resolution| resolution.urls())
            .unwrap_or_default();
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const TREE: &str = r#"{"structure": {"children": [{"children": [
        {"k": "i-01-002-03", "alias": "Plaza Centro", "children": [{"i": "a"}, {"i": "b"}]}
    ]}]}}"#;

    fn write_tree(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("drive_tree.json");
        fs::write(&path, content).expect("Failed to write tree file");
        path
    }

    #[tokio::test]
    async fn test_reads_tree_and_version() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let source = LocalTreeSource::new(write_tree(&dir, TREE), "https://img/{id}");

        let version = source.fetch_version().await.unwrap();
        assert!(version.parse::<u128>().is_ok());

        let tree = source.fetch_tree().await.unwrap();
        assert_eq!(tree.structure.children.len(), 1);
    }

    #[tokio::test]
    async fn test_single_lookup_exact_and_alias_only() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let source = LocalTreeSource::new(write_tree(&dir, TREE), "https://img/{id}");

        assert_eq!(
            source.lookup_single("I-01-002-03").await.unwrap(),
            vec!["https://img/a", "https://img/b"]
        );
        assert_eq!(source.lookup_single("plaza centro").await.unwrap().len(), 2);
        assert!(source.lookup_single("002-03").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let source = LocalTreeSource::new(dir.path().join("missing.json"), "https://img/{id}");
        assert!(source.fetch_version().await.is_err());
        assert!(source.fetch_tree().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let source = LocalTreeSource::new(write_tree(&dir, "not json"), "https://img/{id}");
        let err = source.fetch_tree().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse tree file"));
    }
}
