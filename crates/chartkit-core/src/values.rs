//! Chart values trees with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Values document handed to a chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Render as a YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Insert a top-level key, replacing any previous value
    pub fn insert(&mut self, key: &str, value: JsonValue) {
        if !self.0.is_object() {
            self.0 = JsonValue::Object(serde_json::Map::new());
        }
        if let JsonValue::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
        }
    }

    /// Set a value by dotted path (e.g., "controller.replicaCount")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::ValuesMerge {
                message: format!("Invalid values path: '{}'", path),
            });
        }
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Check whether a dotted path is present
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
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

impl From<JsonValue> for Values {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        if remaining.is_empty() {
            map.insert((*key).to_string(), new_value);
        } else {
            let entry = map
                .entry((*key).to_string())
                .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
            set_nested(entry, remaining, new_value);
        }
    }
}

fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Parse --set arguments (key=value format)
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        // Try to parse as JSON, fallback to string
        let json_value = if val == "true" {
            JsonValue::Bool(true)
        } else if val == "false" {
            JsonValue::Bool(false)
        } else if val == "null" {
            JsonValue::Null
        } else if let Ok(num) = val.parse::<i64>() {
            JsonValue::Number(num.into())
        } else if let Some(num) = val.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            JsonValue::Number(num)
        } else if val.starts_with('[') || val.starts_with('{') {
            serde_json::from_str(val).unwrap_or_else(|_| JsonValue::String(val.to_string()))
        } else {
            JsonValue::String(val.to_string())
        };

        values.set(key, json_value)?;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(r#"
controller:
  kind: Deployment
  replicaCount: 1
  service:
    type: LoadBalancer
"#).unwrap();

        let overlay = Values::from_yaml(r#"
controller:
  replicaCount: 3
  service:
    loadBalancerIP: 10.0.0.10
"#).unwrap();

        base.merge(&overlay);

        assert_eq!(*base.get("controller.kind").unwrap(), "Deployment");
        assert_eq!(base.get("controller.replicaCount").unwrap(), 3);
        assert_eq!(*base.get("controller.service.type").unwrap(), "LoadBalancer");
        assert_eq!(*base.get("controller.service.loadBalancerIP").unwrap(), "10.0.0.10");
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let mut base = Values(json!({"hosts": ["a.example.com", "b.example.com"]}));
        base.merge(&Values(json!({"hosts": ["c.example.com"]})));

        assert_eq!(base.get("hosts").unwrap(), &json!(["c.example.com"]));
    }

    #[test]
    fn test_set_nested() {
        let mut values = Values::new();
        values.set("persistence.size", json!("10Gi")).unwrap();
        values.set("adminUser", json!("admin")).unwrap();

        assert_eq!(*values.get("persistence.size").unwrap(), "10Gi");
        assert_eq!(*values.get("adminUser").unwrap(), "admin");
    }

    #[test]
    fn test_set_rejects_empty_segment() {
        let mut values = Values::new();
        assert!(values.set("controller..kind", json!("DaemonSet")).is_err());
    }

    #[test]
    fn test_insert_and_contains() {
        let mut values = Values::new();
        assert!(values.is_empty());

        values.insert("ingress", json!({"enabled": false}));

        assert!(values.contains("ingress.enabled"));
        assert!(!values.contains("ingress.hosts"));
        assert!(!values.is_empty());
    }

    #[test]
    fn test_parse_set_values() {
        let args = vec![
            "controller.image.tag=v1.1.0".to_string(),
            "controller.replicaCount=5".to_string(),
            "persistence.enabled=true".to_string(),
            "controller.extraArgs={\"v\":\"2\"}".to_string(),
        ];

        let values = parse_set_values(&args).unwrap();

        assert_eq!(*values.get("controller.image.tag").unwrap(), "v1.1.0");
        assert_eq!(values.get("controller.replicaCount").unwrap(), 5);
        assert_eq!(values.get("persistence.enabled").unwrap(), true);
        assert_eq!(*values.get("controller.extraArgs.v").unwrap(), "2");
    }

    #[test]
    fn test_parse_set_values_invalid() {
        let err = parse_set_values(&["replicaCount".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Expected key=value"));
    }

    #[test]
    fn test_to_yaml() {
        let values = Values(json!({"tcp": {"5432": "db/postgres:5432"}}));
        let yaml = values.to_yaml().unwrap();

        assert!(yaml.contains("tcp:"));
        assert!(yaml.contains("db/postgres:5432"));
    }
}
