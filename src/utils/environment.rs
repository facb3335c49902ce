use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "PLAZA_INDEX_CACHE_DIR";

const CACHE_DIR_NAME: &str = "plaza-image-index";

/// Get the directory holding persisted index records
///
/// Uses `PLAZA_INDEX_CACHE_DIR` when set, otherwise the platform cache directory
/// - macOS: `~/Library/Caches/plaza-image-index/`
/// - Linux: `~/.cache/plaza-image-index/`
/// - Windows: `%LOCALAPPDATA%\plaza-image-index\`
pub fn get_cache_dir() -> Result<PathBuf> {
    resolve_cache_dir(env::var(CACHE_DIR_ENV).ok().as_deref())
}

/// Cache directory from an explicit override, falling back to the platform default
pub fn resolve_cache_dir(override_dir: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::cache_dir().context("Failed to get platform cache directory")?;
    Ok(base.join(CACHE_DIR_NAME))
}
