use std::fs;

use anyhow::Context;
use tracing::{debug, info};
use xsdtree_config::EditorConfig;
use xsdtree_schema::{FileResolver, SchemaIndex, SchemaLoader};

/// Configuration found from the current directory upward, or the defaults.
pub fn load_config() -> anyhow::Result<EditorConfig> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    match EditorConfig::load_from_dir(&current_dir)? {
        Some((path, config)) => {
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => {
            debug!("no configuration file, using defaults");
            Ok(EditorConfig::default())
        }
    }
}

pub fn load_schema(location: &str, config: &EditorConfig) -> anyhow::Result<SchemaIndex> {
    SchemaLoader::new(FileResolver)
        .root_element(config.root_element.clone())
        .load(location)
        .with_context(|| format!("Failed to load schema {location}"))
}

pub fn read_file(path: &str) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Error reading file {path}"))
}
