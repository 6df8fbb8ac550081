//! Unit partitioning.
//!
//! Divides an ordered corpus into fixed-size named units and materializes
//! each item's text (plus an empty annotation placeholder) through the blob
//! store. External item identifiers are recorded in the returned member
//! lists only; workers see positional indices, never source identity.

use crate::error::ExperimentError;
use crate::store::BlobStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An opaque text payload plus its external identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub external_id: String,
    pub text: String,
}

impl Item {
    #[must_use]
    pub fn new(external_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            text: text.into(),
        }
    }
}

/// Position-within-unit paired with the item's external identifier.
///
/// Persisted as a `[local_index, external_id]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, String)", into = "(usize, String)")]
pub struct UnitMember {
    pub local_index: usize,
    pub external_id: String,
}

impl From<(usize, String)> for UnitMember {
    fn from((local_index, external_id): (usize, String)) -> Self {
        Self {
            local_index,
            external_id,
        }
    }
}

impl From<UnitMember> for (usize, String) {
    fn from(member: UnitMember) -> Self {
        (member.local_index, member.external_id)
    }
}

/// An immutable named batch of items, created once at partition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub members: Vec<UnitMember>,
}

/// Worker-visible directory for a unit's artifacts under `data_path`.
///
/// The leading dot keeps unit directories semi-hidden from labeling-tool
/// directory listings; workers only ever see their own copies.
#[must_use]
pub fn unit_dir(data_path: &str, unit_name: &str) -> String {
    format!("{data_path}/.{unit_name}")
}

/// Split `items` into units of at most `unit_size`, in arrival order.
///
/// Unit names are `unit_<k>` for k = 0, 1, 2, … with no gaps; the last unit
/// may be short and is never padded or merged. For every item two artifacts
/// are written under the unit's directory: `<local_index>.txt` with the
/// UTF-8 text and an empty `<local_index>.ann` placeholder.
///
/// # Errors
///
/// `Configuration` if `unit_size` is zero or `items` is empty; `Storage` if
/// an artifact write fails.
pub fn partition(
    store: &dyn BlobStore,
    data_path: &str,
    items: &[Item],
    unit_size: usize,
) -> Result<Vec<Unit>, ExperimentError> {
    if unit_size < 1 {
        return Err(ExperimentError::Configuration(
            "unit size must be at least 1".into(),
        ));
    }
    if items.is_empty() {
        return Err(ExperimentError::Configuration(
            "cannot partition an empty item sequence".into(),
        ));
    }

    info!(items = items.len(), unit_size, "partitioning corpus into units");

    let mut units = Vec::with_capacity(items.len().div_ceil(unit_size));
    for (unit_num, batch) in items.chunks(unit_size).enumerate() {
        let name = format!("unit_{unit_num}");
        let dir = unit_dir(data_path, &name);
        let mut members = Vec::with_capacity(batch.len());

        for (local_index, item) in batch.iter().enumerate() {
            debug!(unit = %name, local_index, "writing unit artifact");
            store.write(&format!("{dir}/{local_index}.txt"), item.text.as_bytes())?;
            store.write(&format!("{dir}/{local_index}.ann"), b"")?;
            members.push(UnitMember {
                local_index,
                external_id: item.external_id.clone(),
            });
        }

        units.push(Unit { name, members });
    }

    info!(units = units.len(), "partitioning complete");
    Ok(units)
}
