//! Allocation engine.
//!
//! Decides, per worker, which unit to hand out next. Coverage is always
//! recomputed from the authoritative allocation map, never cached, so the
//! staleness window is bounded by the caller's read-modify-write cycle.
//!
//! Selection policy, in strict priority order:
//!
//! 1. the first unit (creation order) the worker has not seen whose coverage
//!    is still below the minimum;
//! 2. else the first unit (creation order) the worker has not seen;
//! 3. else none — the worker has exhausted the pool.

use indexmap::IndexMap;

/// Per-worker allocation history, insertion-ordered both across workers and
/// within each worker's unit list. Append-only.
pub type AllocationMap = IndexMap<String, Vec<String>>;

/// A worker's history, empty when the worker has no allocations yet.
///
/// Get-or-default-empty is part of the contract: absent keys and empty
/// histories are indistinguishable to callers.
#[must_use]
pub fn history<'a>(allocations: &'a AllocationMap, worker_id: &str) -> &'a [String] {
    allocations.get(worker_id).map_or(&[], Vec::as_slice)
}

/// Number of distinct workers whose history contains `unit_name`.
#[must_use]
pub fn coverage(allocations: &AllocationMap, unit_name: &str) -> usize {
    allocations
        .values()
        .filter(|units| units.iter().any(|u| u == unit_name))
        .count()
}

/// True while fewer than `minimum_coverage` distinct workers hold the unit.
#[must_use]
pub fn needs_more_coverage(
    allocations: &AllocationMap,
    unit_name: &str,
    minimum_coverage: usize,
) -> bool {
    coverage(allocations, unit_name) < minimum_coverage
}

/// Pick the next unit for `worker_id`, or `None` when every unit is already
/// in the worker's history.
#[must_use]
pub fn select_next<'a>(
    unit_names: &'a [String],
    allocations: &AllocationMap,
    worker_id: &str,
    minimum_coverage: usize,
) -> Option<&'a str> {
    let seen = history(allocations, worker_id);
    let unseen = |name: &&String| !seen.iter().any(|u| u == *name);

    unit_names
        .iter()
        .filter(unseen)
        .find(|name| needs_more_coverage(allocations, name, minimum_coverage))
        .or_else(|| unit_names.iter().find(unseen))
        .map(String::as_str)
}

/// Append `unit_name` to the worker's history.
///
/// The caller must have chosen the unit via [`select_next`]; handing a
/// worker the same unit twice violates the engine's invariant.
pub fn record_allocation(allocations: &mut AllocationMap, worker_id: &str, unit_name: &str) {
    let units = allocations.entry(worker_id.to_string()).or_default();
    debug_assert!(
        !units.iter().any(|u| u == unit_name),
        "worker {worker_id} already holds {unit_name}"
    );
    units.push(unit_name.to_string());
}
