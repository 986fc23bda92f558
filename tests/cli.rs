use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn farmstead(resources: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("farmstead").expect("binary exists");
    cmd.arg("--resources").arg(resources.path());
    cmd
}

#[test]
fn summary_lists_scene_and_lights() {
    let resources = TempDir::new().expect("temp dir");
    let mut cmd = farmstead(&resources);
    cmd.arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 292 instances (4 lights)"))
        .stdout(contains(" - corn x270"))
        .stdout(contains(" - fence x9"))
        .stdout(contains(" - directional light towards (-0.20, -0.10, -0.30)"))
        .stdout(contains(" - point light at (4.00, 4.00, 0.00)"))
        .stdout(contains("Bloom on (exposure 1.00, 10 blur passes)"));
}

#[test]
fn summary_saves_settings_record() {
    let resources = TempDir::new().expect("temp dir");
    farmstead(&resources)
        .arg("--summary-only")
        .assert()
        .success();
    let saved = fs::read_to_string(resources.path().join("program_state.txt"))
        .expect("settings written");
    let lines: Vec<&str> = saved.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(&lines[..7], ["0", "0", "0", "0", "0", "0", "3"]);
    assert_eq!(lines[9], "-1");
    assert_eq!(lines[10], "1");
}

#[test]
fn saved_settings_are_loaded_back() {
    let resources = TempDir::new().expect("temp dir");
    let settings = resources.path().join("state.txt");
    fs::write(&settings, "0.1\n0.2\n0.3\n0\n5\n2\n-4\n0\n0\n-1\n0\n").expect("write settings");
    farmstead(&resources)
        .arg("--settings")
        .arg(&settings)
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Bloom off"));
    let saved = fs::read_to_string(&settings).expect("settings rewritten");
    assert!(saved.starts_with("0.1\n0.2\n0.3\n0\n5\n2\n-4\n"));
}

#[test]
fn flags_adjust_bloom() {
    let resources = TempDir::new().expect("temp dir");
    farmstead(&resources)
        .args(["--exposure", "0.2", "--blur-passes", "4", "--summary-only"])
        .assert()
        .success()
        .stdout(contains("Bloom on (exposure 0.20, 4 blur passes)"));
}

#[test]
fn unknown_argument_fails() {
    let resources = TempDir::new().expect("temp dir");
    farmstead(&resources)
        .arg("--wireframe")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Unknown argument: --wireframe"));
}
