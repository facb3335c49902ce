use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Extension used for store entries on disk
pub const STORE_FILE_EXTENSION: &str = "kv";

// Everything except alphanumerics and a few filename-safe characters
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

// Path segments and query values inside synthesized URLs
const URL_COMPONENT_SET: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Encodes a store key into a file name that is safe on every platform
///
/// # Examples
///
/// ```
/// use plaza_image_index::utils::encode_store_key;
///
/// assert_eq!(encode_store_key("plaza_img_meta_1712.5").unwrap(), "plaza_img_meta_1712%2E5.kv");
/// ```
pub fn encode_store_key(key: &str) -> Result<String> {
    validate_store_key(key)?;
    Ok(format!("{}.{}", utf8_percent_encode(key, KEY_ENCODE_SET), STORE_FILE_EXTENSION))
}

/// Decodes a store file name back to its key. Returns `None` for foreign files.
pub fn decode_store_key(file_name: &str) -> Option<String> {
    let encoded = file_name.strip_suffix(&format!(".{}", STORE_FILE_EXTENSION))?;
    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    if decoded.is_empty() { None } else { Some(decoded.into_owned()) }
}

/// Path of a store entry inside `root`
pub fn store_entry_path(root: &Path, key: &str) -> Result<PathBuf> {
    Ok(root.join(encode_store_key(key)?))
}

/// Rejects keys that cannot be stored
pub fn validate_store_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("Store key cannot be empty");
    }
    if key.chars().any(char::is_control) {
        bail!("Store key contains control characters: {:?}", key);
    }
    Ok(())
}

/// Percent-encodes a value for use inside a URL
pub fn encode_url_component(value: &str) -> String {
    utf8_percent_encode(value, URL_COMPONENT_SET).to_string()
}
