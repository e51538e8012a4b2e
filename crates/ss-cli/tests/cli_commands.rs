#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Create a script root with one entity function, one item function and a
/// behavior that calls the entity function.
fn test_scripts() -> TempDir {
    let dir = TempDir::new().unwrap();
    for sub in ["entity", "item", "behavior"] {
        fs::create_dir(dir.path().join(sub)).unwrap();
    }
    fs::write(
        dir.path().join("entity/door.open.script"),
        "$SetNumParams(1)\nexit(_param0 * 2)\n",
    )
    .unwrap();
    fs::write(dir.path().join("item/key.turn.script"), "exit(1)\n").unwrap();
    fs::write(
        dir.path().join("behavior/knocker.script"),
        "var r = $Entity[1].open(5)\nlog(r)\nexit()\n",
    )
    .unwrap();
    dir
}

/// Write a scenario with an npc at the origin facing a door to its right.
fn write_scenario(dir: &Path, npc_fields: &str) -> std::path::PathBuf {
    let path = dir.join("scenario.json");
    fs::write(
        &path,
        format!(
            r#"{{
    "name": "Doorstep",
    "entity_types": [
        {{ "id": 0, "name": "Npc", "storage_slots": 1 }},
        {{ "id": 1, "name": "Door", "solid": true }}
    ],
    "item_types": [{{ "id": 0, "name": "Key" }}],
    "entities": [
        {{ "type": "Npc", "position": [0, 0, 0], "direction": "right", {npc_fields} }},
        {{ "type": "Door", "position": [1, 0, 0] }}
    ]
}}"#
        ),
    )
    .unwrap();
    path
}

fn ss() -> Command {
    Command::cargo_bin("ss").unwrap()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_inline_source() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""source": "log(\"hello\")\nexit()""#);

    ss().args(["run", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Doorstep"))
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("Npc #0"));
}

#[test]
fn run_behavior_calls_entity_function() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""script": "knocker""#);

    ss().args(["run", "--ticks", "1", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("    10"))
        .stdout(predicate::str::contains("1 scripts attached, 0 still running"));
}

#[test]
fn run_with_event_log() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""items": ["Key"], "source": "log(1)\nexit()""#);

    ss().args(["run", "--events", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Event Log"))
        .stdout(predicate::str::contains("received item 0 in slot 0"))
        .stdout(predicate::str::contains("1/1"));
}

#[test]
fn run_event_log_filters() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""items": ["Key"], "source": "log(1)\nexit()""#);

    ss().args(["run", "--events", "--event-tick", "1", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Npc #0: 1"))
        .stdout(predicate::str::contains("received item").not());

    ss().args(["run", "--events", "--event-entity", "1", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(no events)"));
}

#[test]
fn event_filters_need_events_flag() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""source": "exit()""#);

    ss().args(["run", "--event-entity", "0", "--scenario"])
        .arg(&scenario)
        .assert()
        .failure();
}

#[test]
fn run_budget_flag_drains_tokens() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""source": "log(1)\nlog(2)\nlog(3)""#);

    ss().args(["run", "--budget", "1", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("budget=1"))
        .stdout(predicate::str::contains("Logic tokens drained"));
}

#[test]
fn run_missing_scenario() {
    let dir = TempDir::new().unwrap();
    ss().args(["run", "--scenario"])
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: cannot read"));
}

#[test]
fn run_unknown_behavior() {
    let dir = test_scripts();
    let scenario = write_scenario(dir.path(), r#""script": "ghost""#);

    ss().args(["run", "--scenario"])
        .arg(&scenario)
        .arg("--scripts")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("script not found: ghost"));
}

// ---------------------------------------------------------------------------
// functions
// ---------------------------------------------------------------------------

#[test]
fn functions_lists_repository() {
    let dir = test_scripts();
    ss().args(["functions", "--scripts"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(2 in"))
        .stdout(predicate::str::contains("door"))
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("turn"));
}

#[test]
fn functions_empty_dir() {
    let dir = TempDir::new().unwrap();
    ss().args(["functions", "--scripts"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No function scripts found"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_valid_script() {
    let dir = test_scripts();
    ss().arg("check")
        .arg(dir.path().join("behavior/knocker.script"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn check_reports_first_problem() {
    let dir = test_scripts();
    let bad = dir.path().join("bad.script");
    fs::write(&bad, "log(1)\nif 1 == 1\nlog(2)\n").unwrap();

    ss().arg("check")
        .arg(dir.path().join("entity/door.open.script"))
        .arg(&bad)
        .assert()
        .failure()
        .stdout(predicate::str::contains("bad.script:2: Missing 'end' for block"))
        .stderr(predicate::str::contains("error: 1 of 2 scripts have problems"));
}

#[test]
fn check_requires_files() {
    ss().arg("check").assert().failure();
}
