use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn load_airports(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read airports: {}", path.display()))?;
    parse_airports(&content).with_context(|| format!("Failed to parse airports: {}", path.display()))
}

pub fn parse_airports(content: &str) -> Result<HashMap<String, String>> {
    let raw: HashMap<String, Value> = serde_json::from_str(content)?;
    let mut table = HashMap::with_capacity(raw.len());
    for (name, value) in raw {
        match value {
            Value::String(code) => {
                table.insert(name, code);
            }
            other => debug!("skipping airport {name}: non-string value {other}"),
        }
    }
    Ok(table)
}
