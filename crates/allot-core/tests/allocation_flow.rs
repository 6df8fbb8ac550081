//! End-to-end allocation scenarios against an in-memory store: the
//! 100-item / unit-size-20 / coverage-2 walkthrough, exhaustion behavior,
//! and durability of decisions across facade re-instantiation.

use allot_core::{
    BlobStore, Entity, Experiment, ExperimentError, ExperimentOptions, Item, MemoryStore,
};
use std::sync::Arc;

fn corpus(n: usize) -> Vec<Item> {
    (100..100 + n)
        .map(|i| Item::new(format!("posting-{i}"), format!("{i}")))
        .collect()
}

fn start_experiment(store: &Arc<MemoryStore>) -> Experiment {
    let exp = Experiment::new(
        Arc::clone(store) as Arc<dyn BlobStore>,
        "bucket/annotation",
        "skills-tagging",
    );
    exp.start(
        "s3://bucket/samples",
        "weighted_300",
        &corpus(100),
        &[Entity::new('c', "Competency")],
        &ExperimentOptions {
            minimum_annotations_per_unit: 2,
            max_unit_size: 20,
        },
    )
    .expect("start");
    exp
}

#[test]
fn hundred_items_make_five_units_of_twenty() {
    let store = Arc::new(MemoryStore::new());
    let exp = start_experiment(&store);

    let units = exp.units().expect("units");
    assert_eq!(units.len(), 5);
    for (name, members) in &units {
        assert_eq!(members.len(), 20, "{name} has wrong size");
        let indices: Vec<usize> = members.iter().map(|m| m.local_index).collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }

    // External ids are absent from every worker-visible artifact.
    for path in store.list(&exp.data_path()).expect("list") {
        assert!(!path.contains("posting-"), "id leaked into {path}");
        let body = String::from_utf8(store.read(&path).expect("read")).expect("utf-8");
        assert!(!body.contains("posting-"), "id leaked into {path}");
    }
}

#[test]
fn coverage_first_walkthrough() {
    let store = Arc::new(MemoryStore::new());
    let exp = start_experiment(&store);

    // Register A -> A receives unit_0.
    let a_first = exp.register_worker("alice", "pw-a").expect("register a");
    assert_eq!(a_first, exp.allocation_path("alice", "unit_0"));

    // Register B -> B receives unit_0 too (coverage 1 < 2).
    let b_first = exp.register_worker("bert", "pw-b").expect("register b");
    assert_eq!(b_first, exp.allocation_path("bert", "unit_0"));

    // A again -> unit_1: unit_0 is covered and already in A's history.
    let a_second = exp.allocate_next("alice").expect("allocate a");
    assert_eq!(a_second, exp.allocation_path("alice", "unit_1"));

    assert!(!exp.needs_more_coverage("unit_0").expect("coverage"));
    assert!(exp.needs_more_coverage("unit_1").expect("coverage"));
}

#[test]
fn third_worker_follows_creation_order_then_everyone_exhausts() {
    let store = Arc::new(MemoryStore::new());
    let exp = start_experiment(&store);

    exp.register_worker("alice", "pw").expect("register");
    exp.register_worker("bert", "pw").expect("register");
    for _ in 0..4 {
        exp.allocate_next("alice").expect("alice");
        exp.allocate_next("bert").expect("bert");
    }

    // Both now hold all 5 units; a third worker's first allocations walk
    // the pool in creation order even though the coverage target is met.
    exp.register_worker("cara", "pw").expect("register");
    for expected in ["unit_1", "unit_2", "unit_3", "unit_4"] {
        let dest = exp.allocate_next("cara").expect("cara");
        assert_eq!(dest, exp.allocation_path("cara", expected));
    }

    for worker in ["alice", "bert", "cara"] {
        let err = exp.allocate_next(worker).expect_err("exhausted");
        assert!(matches!(err, ExperimentError::Exhausted(ref w) if w == worker));
    }
}

#[test]
fn worker_histories_never_contain_duplicates() {
    let store = Arc::new(MemoryStore::new());
    let exp = start_experiment(&store);

    exp.register_worker("alice", "pw").expect("register");
    while exp.allocate_next("alice").is_ok() {}

    let history = exp.allocations("alice").expect("history");
    assert_eq!(history.len(), 5);
    let mut deduped = history.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), history.len());
}

#[test]
fn allocations_survive_facade_restart() {
    let store = Arc::new(MemoryStore::new());
    let exp = start_experiment(&store);
    exp.register_worker("alice", "pw").expect("register");
    drop(exp);

    // A fresh handle over the same store sees the committed state and
    // continues from it rather than re-returning unit_0.
    let exp = Experiment::new(
        Arc::clone(&store) as Arc<dyn BlobStore>,
        "bucket/annotation",
        "skills-tagging",
    );
    assert_eq!(exp.allocations("alice").expect("history"), vec!["unit_0"]);
    let dest = exp.allocate_next("alice").expect("allocate");
    assert_eq!(dest, exp.allocation_path("alice", "unit_1"));

    let err = exp
        .start(
            "s3://bucket/samples",
            "weighted_300",
            &corpus(100),
            &[Entity::new('c', "Competency")],
            &ExperimentOptions::default(),
        )
        .expect_err("restart");
    assert!(matches!(err, ExperimentError::AlreadyStarted(_)));
}

#[test]
fn allocation_materializes_unit_contents() {
    let store = Arc::new(MemoryStore::new());
    let exp = start_experiment(&store);
    let dest = exp.register_worker("alice", "pw").expect("register");

    let copied = store.list(&dest).expect("list");
    assert_eq!(copied.len(), 40, "20 items x (.txt + .ann)");
    // Relative structure preserved: positional filenames only.
    assert!(copied.contains(&format!("{dest}/0.txt")));
    assert!(copied.contains(&format!("{dest}/19.ann")));
}
