use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts strings and numbers, trimming strings. Anything else (null, objects,
/// blank strings) becomes `None` instead of an error.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Non-negative count (file size, image total) as a number or numeric string.
/// Unparseable values become `None`.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Child node list where each malformed element is skipped individually
pub fn lenient_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    let total = items.len();
    let nodes: Vec<T> =
        items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect();
    if nodes.len() < total {
        tracing::debug!(skipped = total - nodes.len(), "skipped malformed tree nodes");
    }
    Ok(nodes)
}
