//! Registry loading: turns the registry JSON asset into `ToolDefinition`s.
//!
//! Entries are normalized one at a time. A malformed entry is logged and
//! skipped rather than failing the whole registry (partial success model);
//! only an unreadable file or a non-object root is fatal.

use crate::error::{AppError, Result};
use crate::registry::types::ToolDefinition;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Immutable mapping from tool identifier to its definition.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (String, ToolDefinition)>,
    {
        Self {
            tools: definitions.into_iter().collect(),
        }
    }

    /// Read and normalize the registry asset at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigurationError(format!(
                "Failed to read tool registry {}: {}",
                path.display(),
                e
            ))
        })?;

        let json: Value = serde_json::from_str(&raw).map_err(|e| {
            AppError::ConfigurationError(format!("Tool registry is not valid JSON: {}", e))
        })?;

        let registry = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            tools = registry.len(),
            fingerprint = %registry.fingerprint(),
            "Tool registry loaded"
        );

        Ok(registry)
    }

    /// Build a registry from an already-parsed JSON object.
    pub fn from_json(json: &Value) -> Result<Self> {
        let entries = json.as_object().ok_or_else(|| {
            AppError::ConfigurationError("Tool registry root must be a JSON object".into())
        })?;

        let mut tools = HashMap::with_capacity(entries.len());
        for (id, entry) in entries {
            match normalize_entry(entry) {
                Ok(def) => {
                    tools.insert(id.clone(), def);
                }
                Err(e) => {
                    tracing::warn!(tool_id = %id, error = %e, "Skipping malformed registry entry");
                }
            }
        }

        Ok(Self { tools })
    }

    pub fn get(&self, id: &str) -> Option<&ToolDefinition> {
        self.tools.get(id)
    }

    /// The registry's own key alongside the definition, borrowed from the registry.
    pub fn entry(&self, id: &str) -> Option<(&str, &ToolDefinition)> {
        self.tools
            .get_key_value(id)
            .map(|(key, def)| (key.as_str(), def))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolDefinition)> {
        self.tools.iter()
    }

    /// SHA-256 over sorted `(id, embedding_text)` pairs, hex encoded.
    ///
    /// Changes whenever a vector-relevant part of the registry changes, so a
    /// stale vectors asset can be spotted by comparing log lines.
    pub fn fingerprint(&self) -> String {
        let mut ids: Vec<&String> = self.tools.keys().collect();
        ids.sort();

        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update(b"|");
            hasher.update(self.tools[id].embedding_text.as_bytes());
            hasher.update(b"\n");
        }

        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

fn normalize_entry(entry: &Value) -> Result<ToolDefinition> {
    let obj = entry
        .as_object()
        .ok_or_else(|| AppError::ValidationError("Registry entry is not an object".into()))?;

    let embedding_text = obj
        .get("embedding_text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::ValidationError("Registry entry missing string 'embedding_text'".into())
        })?;

    let signals: BTreeSet<String> = obj
        .get("signals")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ToolDefinition {
        embedding_text: embedding_text.to_string(),
        guidance: string_field(obj, "guidance").unwrap_or_default(),
        guidance_ios: string_field(obj, "guidance_ios"),
        guidance_android: string_field(obj, "guidance_android"),
        signals,
    })
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_from_json_valid_registry() {
        let json = json!({
            "demo.echo.v1": {
                "embedding_text": "echo text back",
                "guidance": "Echo",
                "signals": []
            },
            "demo.image.describe.v1": {
                "embedding_text": "describe an image",
                "guidance": "Describe",
                "guidance_ios": "Describe (iOS)",
                "signals": ["image", 42]
            }
        });

        let registry = ToolRegistry::from_json(&json).unwrap();

        assert_eq!(registry.len(), 2);
        let image = registry.get("demo.image.describe.v1").unwrap();
        assert!(image.has_signal("image"));
        assert_eq!(image.signals.len(), 1);
        assert_eq!(image.guidance_ios.as_deref(), Some("Describe (iOS)"));
        assert!(image.guidance_android.is_none());
    }

    #[test]
    fn test_from_json_skips_malformed_entries() {
        let json = json!({
            "not.an.object": 7,
            "missing.text": { "guidance": "no embedding text" },
            "valid.tool": { "embedding_text": "ok" }
        });

        let registry = ToolRegistry::from_json(&json).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("valid.tool"));
        assert_eq!(registry.get("valid.tool").unwrap().guidance, "");
    }

    #[test]
    fn test_from_json_rejects_non_object_root() {
        assert!(ToolRegistry::from_json(&json!(["a", "b"])).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_embedding_text() {
        let a = ToolRegistry::from_definitions([(
            "t".to_string(),
            ToolDefinition::new("one", "g"),
        )]);
        let b = ToolRegistry::from_definitions([(
            "t".to_string(),
            ToolDefinition::new("two", "g"),
        )]);
        let c = ToolRegistry::from_definitions([(
            "t".to_string(),
            ToolDefinition::new("one", "different guidance"),
        )]);

        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"demo.echo.v1": {{"embedding_text": "echo text back", "guidance": "Echo"}}}}"#
        )
        .unwrap();

        let registry = ToolRegistry::load(file.path()).unwrap();
        assert!(registry.contains("demo.echo.v1"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = ToolRegistry::load(Path::new("/nonexistent/registry.json"));
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }

    #[test]
    fn test_guidance_for_platform() {
        let mut def = ToolDefinition::new("x", "default");
        def.guidance_android = Some("android".into());

        assert_eq!(def.guidance_for("android"), "android");
        assert_eq!(def.guidance_for("ios"), "default");
        assert_eq!(def.guidance_for("web"), "default");
    }
}
