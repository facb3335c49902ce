//! Index builder for the remote plaza image tree.
//!
//! # Error Handling Strategy
//!
//! Building never fails on bad data, only on a failed fetch:
//!
//! - **Folder-level problems**: folders without a resolvable key, or without a single
//!   indexable file, are skipped and counted as skipped
//! - **File-level problems**: files without an identifier or URL are skipped
//! - **Fetch/parse problems**: propagated to the caller through `anyhow::Result`, so
//!   a broken download never produces a half-built index

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::models::{BuildStats, FileNode, FolderNode, ImageIndex, IndexEntry, TreePayload};
use crate::parsers::extract_key;
use crate::source::TreeSource;
use crate::utils::encode_url_component;

/// Result of flattening a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltIndex {
    pub index: ImageIndex,
    pub stats: BuildStats,
}

/// Flatten the remote tree into primary and alias maps
///
/// Walks regions -> plaza folders -> files in a single pass. Folder keys come from
/// the server-normalized `k` field, or from [`extract_key`] applied to the folder
/// name when `k` is missing.
///
/// `url_template` is used for files that carry no pre-computed URL; `{id}` in the
/// template is replaced by the file identifier.
///
/// # Examples
///
/// ```
/// use plaza_image_index::indexer::build_index;
/// use plaza_image_index::models::TreePayload;
///
/// let tree: TreePayload = serde_json::from_str(r#"{"structure": {"children": [
///     {"children": [{"k": "i-01-002-03", "children": [{"i": "abc", "n": "a.jpg"}]}]}
/// ]}}"#)?;
/// let built = build_index(&tree, "https://img.example/{id}");
/// assert_eq!(built.stats.files, 1);
/// assert_eq!(built.index.entries("i-01-002-03").unwrap()[0].url, "https://img.example/abc");
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn build_index(tree: &TreePayload, url_template: &str) -> BuiltIndex {
    let mut index = ImageIndex::new();
    let mut stats = BuildStats::default();
    let mut skipped_folders = 0usize;

    for region in &tree.structure.children {
        stats.regions += 1;

        for folder in &region.children {
            let Some((key, derived_alias)) = resolve_folder_key(folder) else {
                skipped_folders += 1;
                debug!(name = ?folder.name, "skipping folder without a recognizable key");
                continue;
            };

            let entries: Vec<IndexEntry> =
                folder.children.iter().filter_map(|file| resolve_file(file, url_template)).collect();
            if entries.is_empty() {
                skipped_folders += 1;
                continue;
            }

            stats.folders += 1;
            stats.files += entries.len();
            index.append_entries(&key, entries);

            for alias in [folder.alias.as_deref(), derived_alias.as_deref()].into_iter().flatten() {
                index.insert_alias(alias, &key);
            }
        }
    }

    if let Some(declared) = tree.total_images {
        if declared as usize != stats.files {
            warn!(declared, indexed = stats.files, "indexed file count differs from tree total");
        }
    }

    info!(
        regions = stats.regions,
        folders = stats.folders,
        files = stats.files,
        aliases = index.alias_count(),
        skipped_folders,
        "built image index"
    );

    BuiltIndex { index, stats }
}

/// Fetch the tree from `source` and build an index from it
pub async fn fetch_and_build(source: &dyn TreeSource, url_template: &str) -> Result<BuiltIndex> {
    let tree = source.fetch_tree().await.context("Failed to fetch image tree")?;
    Ok(build_index(&tree, url_template))
}

/// Key for a folder plus the raw name as alias when the key was derived from it
fn resolve_folder_key(folder: &FolderNode) -> Option<(String, Option<String>)> {
    if let Some(k) = folder.k.as_deref() {
        let key = k.trim().to_lowercase();
        if !key.is_empty() {
            return Some((key, None));
        }
    }

    let name = folder.name.as_deref()?;
    let key = extract_key(name)?;
    let alias = (name.trim().to_lowercase() != key).then(|| name.to_string());
    Some((key, alias))
}

/// A file counts only with an identifier; the URL falls back to one built from it
fn resolve_file(file: &FileNode, url_template: &str) -> Option<IndexEntry> {
    let id = file.identifier()?;
    let url = match file.precomputed_url() {
        Some(url) => url.to_string(),
        None => synthesize_url(url_template, id),
    };
    let name = file.display_name().unwrap_or(id).to_string();

    Some(IndexEntry { name, url, size: file.byte_size() })
}

/// Build a display URL from a raw file identifier
pub fn synthesize_url(url_template: &str, id: &str) -> String {
    url_template.replace("{id}", &encode_url_component(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://img.example/{id}";

    fn parse(json: &str) -> TreePayload {
        serde_json::from_str(json).expect("valid tree json")
    }

    #[test]
    fn test_builds_primary_index_in_tree_order() {
        let tree = parse(
            r#"{"structure": {"children": [
                {"estado": "Jalisco", "children": [
                    {"k": "I-14-001-01", "children": [
                        {"i": "a", "n": "a.jpg", "s": 10},
                        {"i": "b", "n": "b.jpg", "s": 20}
                    ]},
                    {"k": "i-14-002-01", "children": [{"i": "c", "n": "c.jpg"}]}
                ]}
            ]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        assert_eq!(built.stats, BuildStats { folders: 2, files: 3, regions: 1 });

        let entries = built.index.entries("i-14-001-01").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.jpg");
        assert_eq!(entries[0].size, 10);
        assert_eq!(entries[1].url, "https://img.example/b");

        let keys: Vec<&str> = built.index.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["i-14-001-01", "i-14-002-01"]);
    }

    #[test]
    fn test_prefers_precomputed_urls() {
        let tree = parse(
            r#"{"structure": {"children": [{"children": [
                {"k": "i-01-001-01", "children": [
                    {"i": "a", "n": "a.jpg", "directUrl": "https://direct/a", "mediumUrl": "https://medium/a"},
                    {"i": "t", "thumbnailUrl": "https://thumb/t", "directUrl": "https://direct/t"}
                ]}
            ]}]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        let entries = built.index.entries("i-01-001-01").unwrap();
        assert_eq!(entries[0].url, "https://medium/a");
        assert_eq!(entries[1].url, "https://thumb/t");
    }

    #[test]
    fn test_precomputed_url_without_identifier_is_skipped() {
        let tree = parse(
            r#"{"structure": {"children": [{"children": [
                {"k": "i-01-001-01", "children": [{"n": "x.jpg", "mediumUrl": "https://m/x"}]},
                {"k": "i-01-001-02", "children": [
                    {"n": "y.jpg", "thumbnailUrl": "https://t/y"},
                    {"id": "z", "mediumUrl": "https://m/z"}
                ]}
            ]}]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        assert!(built.index.entries("i-01-001-01").is_none());
        assert_eq!(built.stats.files, 1);
        assert_eq!(built.index.entries("i-01-001-02").unwrap()[0].url, "https://m/z");
    }

    #[test]
    fn test_mixed_field_spellings_keep_the_file() {
        let tree = parse(
            r#"{"structure": {"children": [{"children": [
                {"k": "i-01-001-01", "children": [{"i": "a", "id": "a", "n": "a.jpg", "size": 12}]}
            ]}]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        let entries = built.index.entries("i-01-001-01").unwrap();
        assert_eq!(entries[0].name, "a.jpg");
        assert_eq!(entries[0].size, 12);
    }

    #[test]
    fn test_string_or_null_total_images_does_not_abort() {
        for total in [r#""3""#, "null", r#""unknown""#] {
            let tree = parse(&format!(
                r#"{{"total_images": {}, "structure": {{"children": [{{"children": [
                    {{"k": "i-01-001-01", "children": [{{"i": "a"}}, {{"i": "b"}}, {{"i": "c"}}]}}
                ]}}]}}}}"#,
                total
            ));

            let built = build_index(&tree, TEMPLATE);
            assert_eq!(built.stats.files, 3);
        }
    }

    #[test]
    fn test_skips_files_without_identifier_or_url() {
        let tree = parse(
            r#"{"structure": {"children": [{"children": [
                {"k": "i-01-001-01", "children": [{"n": "orphan.jpg"}, {"s": 5}]},
                {"k": "i-01-001-02", "children": [{"n": "orphan.jpg"}, {"id": "ok"}]}
            ]}]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        assert!(built.index.entries("i-01-001-01").is_none());
        assert_eq!(built.stats.folders, 1);
        assert_eq!(built.stats.files, 1);
        // Name falls back to the identifier
        assert_eq!(built.index.entries("i-01-001-02").unwrap()[0].name, "ok");
    }

    #[test]
    fn test_falls_back_to_name_heuristic() {
        let tree = parse(
            r#"{"structure": {"children": [{"children": [
                {"name": "MEXICO_l-15-86-2x", "children": [{"i": "a"}]},
                {"name": "MEXICO_I-15-086-02", "children": [{"i": "b"}]},
                {"name": "PLAZA CROC MAZATLAN", "children": [{"i": "c"}]}
            ]}]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        assert_eq!(built.stats.folders, 1);
        assert_eq!(built.index.entries("i-15-086-02").unwrap().len(), 1);
        assert_eq!(built.index.alias_target("mexico_i-15-086-02"), Some("i-15-086-02"));
    }

    #[test]
    fn test_records_declared_aliases() {
        let tree = parse(
            r#"{"structure": {"children": [{"children": [
                {"k": "i-01-002-03", "alias": "Plaza Centro", "children": [{"i": "a"}]},
                {"k": "i-01-002-04", "alias": "I-01-002-04", "children": [{"i": "b"}]},
                {"k": "i-01-002-05", "alias": "Sin Fotos", "children": []}
            ]}]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        assert_eq!(built.index.alias_target("plaza centro"), Some("i-01-002-03"));
        assert_eq!(built.index.alias_count(), 1);
    }

    #[test]
    fn test_duplicate_keys_append() {
        let tree = parse(
            r#"{"structure": {"children": [
                {"children": [{"k": "i-01-001-01", "children": [{"i": "a"}]}]},
                {"children": [{"k": "i-01-001-01", "children": [{"i": "b"}]}]}
            ]}}"#,
        );

        let built = build_index(&tree, TEMPLATE);
        let names: Vec<&str> =
            built.index.entries("i-01-001-01").unwrap().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(built.stats.folders, 2);
    }

    #[test]
    fn test_empty_tree() {
        let built = build_index(&TreePayload::default(), TEMPLATE);
        assert!(built.index.is_empty());
        assert_eq!(built.stats, BuildStats::default());
    }

    #[test]
    fn test_synthesize_url_encodes_identifier() {
        assert_eq!(synthesize_url(TEMPLATE, "a b"), "https://img.example/a%20b");
        assert_eq!(
            synthesize_url("https://drive.google.com/uc?id={id}", "1hRf_x-Y"),
            "https://drive.google.com/uc?id=1hRf_x-Y"
        );
    }
}
