//! Persisted watch-face settings.
//!
//! The settings page saves its values as one JSON object keyed by message key
//! (`APIKEY`, `USECELSIUS`, ...). The blob is rewritten wholesale on every save
//! and is read-only here. Reading never fails: an absent or corrupt blob is
//! treated as "nothing configured".

use serde_json::{Map, Value};
use std::path::PathBuf;

/// Settings key for the user-supplied weather API key.
pub const KEY_API_KEY: &str = "APIKEY";
/// Settings key for the Celsius display toggle.
pub const KEY_USE_CELSIUS: &str = "USECELSIUS";
/// Settings key for the metric distance toggle.
pub const KEY_USE_METRIC: &str = "USEMETRIC";

/// A snapshot of the persisted key-value settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings(Map<String, Value>);

impl Settings {
    /// String value for `key`, if it is stored as a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Boolean-like value for `key`.
    ///
    /// The settings page may persist toggles as a native boolean, a number or a
    /// string depending on how the value was serialized, so `true`, `1` and
    /// `"true"` all count as set. Anything else, including a missing key, is unset.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for Settings {
    /// Only JSON objects carry settings; any other value yields an empty snapshot.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Read access to the persisted settings.
pub trait SettingsStore: Send + Sync {
    fn read(&self) -> Settings;
}

/// Settings persisted as a JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for FileSettingsStore {
    fn read(&self) -> Settings {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings saved yet at {}", self.path.display());
                return Settings::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read settings {}: {}", self.path.display(), e);
                return Settings::default();
            }
        };

        if raw.trim().is_empty() {
            return Settings::default();
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Settings(map),
            Ok(other) => {
                tracing::warn!(
                    "Settings {} hold a JSON {} instead of an object, ignoring",
                    self.path.display(),
                    json_kind(&other)
                );
                Settings::default()
            }
            Err(e) => {
                tracing::warn!("Error parsing settings {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }
}

/// In-memory settings, replaced wholesale like the persisted blob.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: std::sync::RwLock<Settings>,
}

#[cfg(test)]
impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: std::sync::RwLock::new(settings),
        }
    }

    /// Overwrite the stored snapshot, as a settings save does.
    pub fn replace(&self, settings: Settings) {
        match self.settings.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }
}

#[cfg(test)]
impl SettingsStore for MemorySettingsStore {
    fn read(&self) -> Settings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn settings(value: Value) -> Settings {
        Settings::from(value)
    }

    #[test]
    fn test_flag_truthy_forms() {
        for v in [json!(true), json!(1), json!(1.0), json!("true")] {
            let s = settings(json!({ "USECELSIUS": v.clone() }));
            assert!(s.flag(KEY_USE_CELSIUS), "{} should be true", v);
        }
    }

    #[test]
    fn test_flag_falsy_forms() {
        for v in [
            json!(false),
            json!(0),
            json!("false"),
            json!("TRUE"),
            json!("1"),
            json!(null),
            json!(2),
        ] {
            let s = settings(json!({ "USECELSIUS": v.clone() }));
            assert!(!s.flag(KEY_USE_CELSIUS), "{} should be false", v);
        }
        assert!(!Settings::default().flag(KEY_USE_CELSIUS));
    }

    #[test]
    fn test_get_str_ignores_non_strings() {
        let s = settings(json!({ "APIKEY": 42 }));
        assert_eq!(s.get_str(KEY_API_KEY), None);
        assert!(!s.is_empty());
    }

    #[test]
    fn test_non_object_blob_is_empty() {
        assert!(settings(json!([1, 2, 3])).is_empty());
        assert!(settings(json!("APIKEY")).is_empty());
    }

    #[test]
    fn test_file_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("absent.json"));
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_file_store_reads_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"APIKEY":"user-key","USECELSIUS":true,"QUADRANT_TL":"date"}}"#
        )
        .unwrap();

        let store = FileSettingsStore::new(file.path());
        let s = store.read();
        assert_eq!(s.get_str(KEY_API_KEY), Some("user-key"));
        assert!(s.flag(KEY_USE_CELSIUS));
        assert!(!s.flag(KEY_USE_METRIC));
    }

    #[test]
    fn test_file_store_corrupt_blob_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let store = FileSettingsStore::new(file.path());
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_file_store_picks_up_rewrites() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"APIKEY":"first"}}"#).unwrap();
        let store = FileSettingsStore::new(file.path());
        assert_eq!(store.read().get_str(KEY_API_KEY), Some("first"));

        std::fs::write(file.path(), r#"{"APIKEY":"second"}"#).unwrap();
        assert_eq!(store.read().get_str(KEY_API_KEY), Some("second"));
    }

    #[test]
    fn test_memory_store_replace() {
        let store = MemorySettingsStore::default();
        assert!(store.read().is_empty());

        store.replace(settings(json!({ "USEMETRIC": "true" })));
        assert!(store.read().flag(KEY_USE_METRIC));
    }
}
