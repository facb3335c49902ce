use serde::Deserialize;

use crate::parsers::deserializers::{lenient_count, lenient_nodes, lenient_string};

/// Remote image tree as served by the tree endpoint.
///
/// Every level is deserialized leniently: a node with the wrong shape is dropped
/// instead of failing the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreePayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub generated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_images: Option<u64>,
    #[serde(default)]
    pub structure: TreeRoot,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeRoot {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<RegionNode>,
}

/// First level: one node per region (state)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<FolderNode>,
}

/// Second level: one folder per plaza
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderNode {
    /// Key already normalized by the server
    #[serde(default, deserialize_with = "lenient_string")]
    pub k: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub alias: Option<String>,
    /// Free-text folder name, used when `k` is missing
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<FileNode>,
}

/// Leaf: one image file. Accepts both the compact (`i`, `n`, `s`) and the
/// legacy (`id`, `name`, `size`) field names, compact first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub i: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub n: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub s: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub size: Option<u64>,
    #[serde(default, rename = "mediumUrl", deserialize_with = "lenient_string")]
    pub medium_url: Option<String>,
    #[serde(default, rename = "thumbnailUrl", deserialize_with = "lenient_string")]
    pub thumbnail_url: Option<String>,
    #[serde(default, rename = "directUrl", deserialize_with = "lenient_string")]
    pub direct_url: Option<String>,
}

impl FileNode {
    pub fn identifier(&self) -> Option<&str> {
        self.i.as_deref().or(self.id.as_deref())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.n.as_deref().or(self.name.as_deref())
    }

    /// Size in bytes, 0 when unknown
    pub fn byte_size(&self) -> u64 {
        self.s.or(self.size).unwrap_or(0)
    }

    /// Pre-computed URL, in preference order
    pub fn precomputed_url(&self) -> Option<&str> {
        self.medium_url
            .as_deref()
            .or(self.thumbnail_url.as_deref())
            .or(self.direct_url.as_deref())
    }
}

/// Response of the version endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
}
