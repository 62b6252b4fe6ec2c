//! Effective per-run configuration derived from the persisted settings.

use std::fmt;

use crate::services::settings::{Settings, KEY_API_KEY, KEY_USE_CELSIUS, KEY_USE_METRIC};

/// Where the effective API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Entered by the user on the settings page.
    User,
    /// Injected fallback key.
    Default,
}

/// The API key used for a run.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: KeySource,
}

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> KeySource {
        self.source
    }
}

// Keep the key out of logs.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Configuration in effect for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// `None` means the run must stop before any network access.
    pub api_key: Option<ApiKey>,
    pub use_celsius: bool,
    pub use_metric: bool,
}

/// Resolves settings against the injected fallback key.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    default_api_key: Option<String>,
}

impl ConfigResolver {
    pub fn new(default_api_key: Option<String>) -> Self {
        Self { default_api_key }
    }

    /// Derive the effective configuration. Never fails; a missing key is
    /// reported through `ResolvedConfig::api_key`.
    pub fn resolve(&self, settings: &Settings) -> ResolvedConfig {
        let api_key = match settings.get_str(KEY_API_KEY).filter(|k| !k.is_empty()) {
            Some(user_key) => Some(ApiKey {
                value: user_key.to_string(),
                source: KeySource::User,
            }),
            None => self
                .default_api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .map(|k| ApiKey {
                    value: k.to_string(),
                    source: KeySource::Default,
                }),
        };

        ResolvedConfig {
            api_key,
            use_celsius: settings.flag(KEY_USE_CELSIUS),
            use_metric: settings.flag(KEY_USE_METRIC),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: serde_json::Value) -> Settings {
        Settings::from(value)
    }

    #[test]
    fn test_empty_user_key_falls_back_to_default() {
        let resolver = ConfigResolver::new(Some("D".to_string()));
        let config = resolver.resolve(&settings(json!({ "APIKEY": "" })));

        let key = config.api_key.unwrap();
        assert_eq!(key.as_str(), "D");
        assert_eq!(key.source(), KeySource::Default);
    }

    #[test]
    fn test_user_key_wins_over_default() {
        let resolver = ConfigResolver::new(Some("D".to_string()));
        let config = resolver.resolve(&settings(json!({ "APIKEY": "U" })));

        let key = config.api_key.unwrap();
        assert_eq!(key.as_str(), "U");
        assert_eq!(key.source(), KeySource::User);
    }

    #[test]
    fn test_no_key_anywhere() {
        let resolver = ConfigResolver::new(None);
        let config = resolver.resolve(&Settings::default());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_empty_default_key_is_no_key() {
        let resolver = ConfigResolver::new(Some(String::new()));
        let config = resolver.resolve(&settings(json!({ "APIKEY": "" })));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_non_string_user_key_is_ignored() {
        let resolver = ConfigResolver::new(Some("D".to_string()));
        let config = resolver.resolve(&settings(json!({ "APIKEY": 1234 })));
        assert_eq!(config.api_key.unwrap().as_str(), "D");
    }

    #[test]
    fn test_unit_flags() {
        let resolver = ConfigResolver::default();

        for v in [json!(true), json!(1), json!("true")] {
            let config = resolver.resolve(&settings(json!({ "USECELSIUS": v.clone(), "USEMETRIC": v })));
            assert!(config.use_celsius);
            assert!(config.use_metric);
        }

        for v in [json!(false), json!(0), json!("false")] {
            let config = resolver.resolve(&settings(json!({ "USECELSIUS": v })));
            assert!(!config.use_celsius);
        }

        let config = resolver.resolve(&Settings::default());
        assert!(!config.use_celsius);
        assert!(!config.use_metric);
    }

    #[test]
    fn test_debug_output_hides_key() {
        let resolver = ConfigResolver::new(None);
        let config = resolver.resolve(&settings(json!({ "APIKEY": "s3cret" })));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("User"));
    }
}
