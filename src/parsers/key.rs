use std::sync::LazyLock;

use regex::Regex;

/// `<type>-<region>-<number>-<sub>` with room for the usual folder-name noise:
/// OCR-confused type letters, a space after the first dash, short segments.
static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z1])-\s*(\d{2,3})-(\d{2,3})-(\d{2,3})").expect("key pattern is valid")
});

/// Normalize user or server supplied key text for comparison
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Extract a plaza key from free-text folder name
///
/// # Examples
///
/// ```
/// use plaza_image_index::parsers::extract_key;
///
/// assert_eq!(extract_key("MEXICO_I-15-086-02").as_deref(), Some("i-15-086-02"));
/// assert_eq!(extract_key("l-11-007-02").as_deref(), Some("i-11-007-02"));
/// assert_eq!(extract_key("I-07-49-02").as_deref(), Some("i-07-049-02"));
/// assert_eq!(extract_key("PLAZA CROC MAZATLAN"), None);
/// ```
pub fn extract_key(name: &str) -> Option<String> {
    let caps = KEY_PATTERN.captures(name.trim())?;

    let mut kind = caps[1].to_ascii_lowercase();
    // 'l' and '1' are scanning artefacts of 'I'
    if kind == "l" || kind == "1" {
        kind = "i".to_string();
    }

    Some(format!("{}-{:0>2}-{:0>3}-{:0>2}", kind, &caps[2], &caps[3], &caps[4]))
}
