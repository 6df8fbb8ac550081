//! End-to-end lifecycle: start an experiment from a launch config and an
//! items file, register workers, allocate until exhaustion.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn allot(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("allot").expect("binary");
    cmd.arg("--root").arg(root).arg("--experiment").arg("tagging");
    cmd
}

fn write_fixtures(dir: &Path) {
    fs::write(
        dir.join("launch.toml"),
        r#"
sample_source = "s3://bucket/samples"
sample_name = "weighted_300"
minimum_annotations_per_unit = 2
max_unit_size = 2

[[entities]]
shortcut = "c"
name = "Competency"
"#,
    )
    .expect("write launch.toml");

    let items: String = (0..4)
        .map(|i| format!("{{\"id\": {i}, \"text\": \"document {i}\"}}\n"))
        .collect();
    fs::write(dir.join("items.jsonl"), items).expect("write items.jsonl");
}

fn start(root: &Path) {
    allot(root)
        .arg("start")
        .arg("--config")
        .arg(root.join("launch.toml"))
        .arg("--items")
        .arg(root.join("items.jsonl"))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 units"));
}

#[test]
fn start_writes_units_and_tool_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    start(dir.path());

    let exp_dir = dir.path().join("experiments/tagging");
    assert!(exp_dir.join("metadata").is_file());
    assert!(exp_dir.join("tool_config/annotation.conf").is_file());
    assert!(exp_dir.join("tool_config/data/.unit_0/0.txt").is_file());
    assert!(exp_dir.join("tool_config/data/.unit_1/1.ann").is_file());

    let visual =
        fs::read_to_string(exp_dir.join("tool_config/visual.conf")).expect("read visual.conf");
    assert_eq!(visual, "[labels]\nCompetency\n");

    // Starting again is rejected.
    allot(dir.path())
        .arg("start")
        .arg("--config")
        .arg(dir.path().join("launch.toml"))
        .arg("--items")
        .arg(dir.path().join("items.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn workers_allocate_until_exhaustion_maps_to_exit_code_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    start(dir.path());

    // Registration seeds unit_0.
    allot(dir.path())
        .arg("add-worker")
        .arg("annie")
        .arg("--credential")
        .arg("pw")
        .assert()
        .success()
        .stdout(predicate::str::contains(".annie/unit_0"));

    // Next allocation advances to unit_1.
    allot(dir.path())
        .arg("allocate")
        .arg("annie")
        .assert()
        .success()
        .stdout(predicate::str::contains(".annie/unit_1"));

    // Pool exhausted: distinct exit code, not a generic failure.
    allot(dir.path())
        .arg("allocate")
        .arg("annie")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E2003"));

    // Allocated artifacts were copied into the worker area.
    let copied = dir
        .path()
        .join("experiments/tagging/tool_config/data/.annie/unit_0/0.txt");
    assert_eq!(fs::read_to_string(copied).expect("read"), "document 0");
}

#[test]
fn unknown_worker_and_duplicate_registration_fail_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    start(dir.path());

    allot(dir.path())
        .arg("allocate")
        .arg("stranger")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));

    allot(dir.path())
        .arg("add-worker")
        .arg("annie")
        .arg("--credential")
        .arg("pw")
        .assert()
        .success();

    allot(dir.path())
        .arg("add-worker")
        .arg("annie")
        .arg("--credential")
        .arg("pw2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn status_reports_workers_and_histories() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    start(dir.path());

    allot(dir.path())
        .arg("add-worker")
        .arg("annie")
        .arg("--credential")
        .arg("pw")
        .assert()
        .success();

    allot(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("units: 2")
                .and(predicate::str::contains("worker annie: unit_0")),
        );
}
