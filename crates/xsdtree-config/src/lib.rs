//! Configuration types for xsdtree tools.
//!
//! The configuration is stored in `Xsdtree.json` files at project roots.
//! Every field is optional; a missing file means the defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The standard configuration filename.
pub const CONFIG_FILENAME: &str = "Xsdtree.json";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings of an editing session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EditorConfig {
    /// Name of the root element. The first top-level element of the main
    /// schema file when absent.
    pub root_element: Option<String>,
    /// Prefix of the namespace written on save, e.g. `ots`.
    pub namespace_prefix: Option<String>,
    pub namespace_uri: Option<String>,
    /// Attribute that makes a node identifiable.
    pub id_attribute: String,
    /// Number of actions that can be undone.
    pub max_undo: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            root_element: None,
            namespace_prefix: None,
            namespace_uri: None,
            id_attribute: "Id".to_string(),
            max_undo: 50,
        }
    }
}

impl EditorConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Parse configuration from a string. Blank content gives the defaults.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(content)?)
    }

    /// Find the configuration file by searching upward from the given directory.
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let config_path = current.join(CONFIG_FILENAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration by searching upward from the given directory.
    pub fn load_from_dir(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(config_path) = Self::find_config_file(start_dir) {
            let config = Self::load(&config_path)?;
            Ok(Some((config_path, config)))
        } else {
            Ok(None)
        }
    }

    /// Prefix and URI, when both are configured.
    pub fn namespace(&self) -> Option<(&str, &str)> {
        self.namespace_prefix.as_deref().zip(self.namespace_uri.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config() {
        let content = r#"{
            "root-element": "Ots",
            "namespace-prefix": "ots",
            "namespace-uri": "http://www.opentrafficsim.org/ots",
            "max-undo": 10
        }"#;

        let config = EditorConfig::parse_str(content).unwrap();
        assert_eq!(config.root_element.as_deref(), Some("Ots"));
        assert_eq!(
            config.namespace(),
            Some(("ots", "http://www.opentrafficsim.org/ots"))
        );
        assert_eq!(config.id_attribute, "Id");
        assert_eq!(config.max_undo, 10);
    }

    #[test]
    fn test_empty_config() {
        let config = EditorConfig::parse_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.namespace(), None);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = EditorConfig::parse_str(r#"{ "max-undos": 3 }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_find_config_file_searches_upward() {
        let dir = std::env::temp_dir().join(format!("xsdtree-config-{}", std::process::id()));
        let nested = dir.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.join(CONFIG_FILENAME), r#"{ "id-attribute": "Name" }"#).unwrap();

        let found = EditorConfig::find_config_file(&nested).unwrap();
        assert_eq!(found, dir.join(CONFIG_FILENAME));
        let (_, config) = EditorConfig::load_from_dir(&nested).unwrap().unwrap();
        assert_eq!(config.id_attribute, "Name");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
