//! Values payloads and ordered `--set` overrides

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Values file contents, passed to the release manager as-is
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Option<JsonValue> = serde_yaml::from_str(yaml)?;
        Ok(value.map(Self).unwrap_or_default())
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    match path.split_first() {
        None => Some(value),
        Some((key, remaining)) => match value {
            JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
            _ => None,
        },
    }
}

/// Ordered `key=value` overrides handed to the release manager
///
/// Setting a key twice keeps its first position and the last value, which
/// matches the release manager's own last-wins semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetOverrides(IndexMap<String, String>);

impl SetOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw string value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set a JSON value, rendering it the way `--set` expects
    pub fn set_json(&mut self, key: impl Into<String>, value: &JsonValue) {
        self.0.insert(key.into(), render_set_value(value));
    }

    /// Flatten a (possibly nested) values map into dotted keys
    pub fn extend_from_json(&mut self, values: &JsonValue) {
        flatten_into(self, None, values);
    }

    /// Append every override of `other`, replacing existing keys
    pub fn extend(&mut self, other: &SetOverrides) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `key=value` arguments
    pub fn to_args(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }
}

fn flatten_into(out: &mut SetOverrides, prefix: Option<&str>, value: &JsonValue) {
    match (value, prefix) {
        (JsonValue::Object(map), _) => {
            for (k, v) in map {
                let key = match prefix {
                    Some(p) => format!("{}.{}", p, k),
                    None => k.clone(),
                };
                flatten_into(out, Some(&key), v);
            }
        }
        (other, Some(key)) => out.set_json(key, other),
        (_, None) => {}
    }
}

fn render_set_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        // An unescaped comma would split the argument into two overrides
        JsonValue::String(s) => s.replace(',', "\\,"),
        JsonValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_set_value).collect();
            format!("{{{}}}", rendered.join(","))
        }
        JsonValue::Object(_) => value.to_string(),
    }
}

/// Parse --set arguments (key=value format)
pub fn parse_set_values(set_args: &[String]) -> Result<SetOverrides> {
    let mut overrides = SetOverrides::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::Values {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        if key.trim().is_empty() {
            return Err(CoreError::Values {
                message: format!("Invalid --set format: '{}'. Key is empty", arg),
            });
        }

        overrides.set(key.trim(), val);
    }

    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_empty_values() {
        let values = Values::from_yaml("").unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_parse_set_values() {
        let args = vec!["image.tag=v2".to_string(), "replicas=5".to_string()];

        let overrides = parse_set_values(&args).unwrap();

        assert_eq!(overrides.get("image.tag"), Some("v2"));
        assert_eq!(overrides.get("replicas"), Some("5"));
        assert!(parse_set_values(&["novalue".to_string()]).is_err());
        assert!(parse_set_values(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_overrides_last_wins_keeps_position() {
        let mut overrides = SetOverrides::new();
        overrides.set("namespace", "acme-dev");
        overrides.set("tenant.tier", "bronze");
        overrides.set("namespace", "acme-prod");

        assert_eq!(
            overrides.to_args(),
            vec!["namespace=acme-prod", "tenant.tier=bronze"]
        );
    }

    #[test]
    fn test_overrides_flatten_json() {
        let json = serde_json::json!({
            "minio": { "enabled": true, "replicas": 2 },
            "spark.enabled": false,
            "zones": ["a", "b"],
        });

        let mut overrides = SetOverrides::new();
        overrides.extend_from_json(&json);

        assert_eq!(overrides.get("minio.enabled"), Some("true"));
        assert_eq!(overrides.get("minio.replicas"), Some("2"));
        assert_eq!(overrides.get("spark.enabled"), Some("false"));
        assert_eq!(overrides.get("zones"), Some("{a,b}"));
    }

    #[test]
    fn test_json_strings_escape_commas() {
        let mut overrides = SetOverrides::new();
        overrides.set_json("hosts", &JsonValue::String("a,b".into()));
        overrides.set("raw", "x,y");
        assert_eq!(overrides.to_args(), vec!["hosts=a\\,b", "raw=x,y"]);
    }
}
