//! Labeling-tool configuration templating.
//!
//! Pure text generation from an ordered entity list: an entity inventory, a
//! keyboard-shortcut map, and a visual label list, written under the
//! experiment's tool-config path. The labeling UI consumes these verbatim.

use crate::store::{BlobStore, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::info;

/// A taggable entity: one-character keyboard shortcut plus display name.
///
/// Persisted as a `[shortcut, name]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(char, String)", into = "(char, String)")]
pub struct Entity {
    pub shortcut: char,
    pub name: String,
}

impl Entity {
    #[must_use]
    pub fn new(shortcut: char, name: impl Into<String>) -> Self {
        Self {
            shortcut,
            name: name.into(),
        }
    }
}

impl From<(char, String)> for Entity {
    fn from((shortcut, name): (char, String)) -> Self {
        Self { shortcut, name }
    }
}

impl From<Entity> for (char, String) {
    fn from(entity: Entity) -> Self {
        (entity.shortcut, entity.name)
    }
}

/// Entity inventory: `[entities]` heading, one name per line, plus the
/// empty sections the labeling tool expects to find.
#[must_use]
pub fn annotation_conf(entities: &[Entity]) -> String {
    let mut out = String::from("[entities]\n");
    for entity in entities {
        let _ = writeln!(out, "{}", entity.name);
    }
    out.push_str("[relations]\n\n# none defined\n");
    out.push_str("[attributes]\n\n# none defined\n");
    out.push_str("[events]\n\n# none defined\n");
    out
}

/// Shortcut map: one `"<shortcut> <name>"` line per entity.
#[must_use]
pub fn kb_shortcuts_conf(entities: &[Entity]) -> String {
    let mut out = String::new();
    for entity in entities {
        let _ = writeln!(out, "{} {}", entity.shortcut, entity.name);
    }
    out
}

/// Visual label list: `[labels]` heading, one name per line, entity order.
#[must_use]
pub fn visual_conf(entities: &[Entity]) -> String {
    let mut out = String::from("[labels]\n");
    for entity in entities {
        let _ = writeln!(out, "{}", entity.name);
    }
    out
}

/// Write all three config artifacts under `config_path`.
pub fn write_tool_config(
    store: &dyn BlobStore,
    config_path: &str,
    entities: &[Entity],
) -> Result<(), StoreError> {
    store.write(
        &format!("{config_path}/annotation.conf"),
        annotation_conf(entities).as_bytes(),
    )?;
    store.write(
        &format!("{config_path}/kb_shortcuts.conf"),
        kb_shortcuts_conf(entities).as_bytes(),
    )?;
    store.write(
        &format!("{config_path}/visual.conf"),
        visual_conf(entities).as_bytes(),
    )?;
    info!(path = %config_path, entities = entities.len(), "tool config written");
    Ok(())
}
