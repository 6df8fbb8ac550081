//! Launch configuration and item-file loading.

use allot_core::{Entity, ExperimentOptions, Item};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// TOML file describing an experiment launch.
#[derive(Debug, Deserialize)]
pub struct LaunchConfig {
    pub sample_source: String,
    pub sample_name: String,
    #[serde(default = "default_minimum")]
    pub minimum_annotations_per_unit: usize,
    #[serde(default = "default_unit_size")]
    pub max_unit_size: usize,
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Deserialize)]
pub struct EntityConfig {
    pub shortcut: char,
    pub name: String,
}

impl LaunchConfig {
    pub fn options(&self) -> ExperimentOptions {
        ExperimentOptions {
            minimum_annotations_per_unit: self.minimum_annotations_per_unit,
            max_unit_size: self.max_unit_size,
        }
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .map(|e| Entity::new(e.shortcut, e.name.clone()))
            .collect()
    }
}

pub fn load_launch_config(path: &Path) -> Result<LaunchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<LaunchConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// One item per line: `{"id": ..., "text": "..."}`. Non-string ids are kept
/// in their JSON rendering.
#[derive(Debug, Deserialize)]
struct ItemRecord {
    id: serde_json::Value,
    text: String,
}

pub fn read_items(path: &Path) -> Result<Vec<Item>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut items = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: ItemRecord = serde_json::from_str(line)
            .with_context(|| format!("Bad item record at {}:{}", path.display(), lineno + 1))?;
        let external_id = match record.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        items.push(Item::new(external_id, record.text));
    }
    Ok(items)
}

const fn default_minimum() -> usize {
    2
}

const fn default_unit_size() -> usize {
    10
}
