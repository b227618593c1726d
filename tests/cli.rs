//! End-to-end runs of the binary with `true`/`false` standing in for make.

use std::path::Path;
use std::process::{Command, Output};

fn write_pool(dir: &Path, ids: &[&str]) -> std::path::PathBuf {
    let path = dir.join("ids.csv");
    std::fs::write(&path, ids.join("\n")).unwrap();
    path
}

fn run_sampler(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_run-sampler"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[cfg(unix)]
#[test]
fn failing_build_tool_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_pool(dir.path(), &["a", "b", "c"]);
    let out = run_sampler(&[
        "--run_ids_file",
        csv.to_str().unwrap(),
        "--num_run_ids",
        "2",
        "--step_id",
        "s1",
        "--test_type",
        "run-local",
        "--make_path",
        dir.path().to_str().unwrap(),
        "--make_program",
        "false",
    ]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Running the following command: FIXED_RUN_IDS="));
    assert!(stdout.contains("Started process with PID: "));
    assert!(stdout.contains("failed with return code 1"));
}

#[cfg(unix)]
#[test]
fn successful_build_tool_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_pool(dir.path(), &["a", "b", "c"]);
    let out = run_sampler(&[
        "--run_ids_file",
        csv.to_str().unwrap(),
        "--num_run_ids",
        "1",
        "--step_id",
        "s1",
        "--test_type",
        "deploy-test-in-cloud",
        "--make_path",
        dir.path().to_str().unwrap(),
        "--make_program",
        "true",
    ]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("executed successfully"));
}

#[test]
fn oversized_sample_fails_before_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_pool(dir.path(), &["a", "b"]);
    let out = run_sampler(&[
        "--run_ids_file",
        csv.to_str().unwrap(),
        "--num_run_ids",
        "3",
        "--step_id",
        "s1",
        "--test_type",
        "run-local",
        "--make_path",
        "pipelines",
        "--make_program",
        "definitely-not-a-build-tool-xyz",
    ]);
    assert!(!out.status.success());
    assert!(!String::from_utf8_lossy(&out.stdout).contains("Started process"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("pool of 2"));
}

#[test]
fn missing_run_ids_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    let out = run_sampler(&[
        "--run_ids_file",
        missing.to_str().unwrap(),
        "--step_id",
        "s1",
        "--test_type",
        "run-local",
        "--make_path",
        "pipelines",
        "--dry_run",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("missing.csv"));
}

#[test]
fn dry_run_json_reports_selection_without_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_pool(dir.path(), &["a", "b", "c", "d", "e"]);
    let log = dir.path().join("log.txt");
    let out = run_sampler(&[
        "--run_ids_file",
        csv.to_str().unwrap(),
        "--num_run_ids",
        "0",
        "--extra_run_ids",
        "z,y,z",
        "--step_id",
        "s1,s2",
        "--test_type",
        "run-local",
        "--make_path",
        "pipelines",
        "--out_file",
        log.to_str().unwrap(),
        "--dry_run",
        "--json",
    ]);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["run_ids"], serde_json::json!(["z", "y"]));
    assert_eq!(report["step_ids"], serde_json::json!(["s1", "s2"]));
    assert_eq!(report["dry_run"], true);
    assert!(report["pid"].is_null());
    let command = report["command"].as_str().unwrap();
    assert!(command.starts_with("FIXED_RUN_IDS=z,y ONLY_STEPS=s1,s2 make -C pipelines run-local"));
    assert!(command.ends_with(&format!("| tee {}", log.display())));
    assert!(!log.exists());
}

#[test]
fn same_seed_selects_same_run_ids() {
    let dir = tempfile::tempdir().unwrap();
    let ids: Vec<String> = (0..50).map(|i| format!("run-{i}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let csv = write_pool(dir.path(), &refs);
    let select = |seed: &str| {
        let out = run_sampler(&[
            "--run_ids_file",
            csv.to_str().unwrap(),
            "--num_run_ids",
            "10",
            "--random_seed",
            seed,
            "--step_id",
            "s1",
            "--test_type",
            "run-local",
            "--make_path",
            "pipelines",
            "--dry_run",
            "--json",
        ]);
        assert!(out.status.success());
        let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        report["run_ids"].clone()
    };
    let first = select("42");
    assert_eq!(first, select("42"));
    assert_eq!(first.as_array().unwrap().len(), 10);
}

#[cfg(unix)]
#[test]
fn cloud_run_ignores_out_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_pool(dir.path(), &["a"]);
    let log = dir.path().join("log.txt");
    let out = run_sampler(&[
        "--run_ids_file",
        csv.to_str().unwrap(),
        "--num_run_ids",
        "1",
        "--step_id",
        "s1",
        "--test_type",
        "deploy-test-in-cloud",
        "--make_path",
        dir.path().to_str().unwrap(),
        "--make_program",
        "true",
        "--out_file",
        log.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    assert!(!String::from_utf8_lossy(&out.stdout).contains("tee"));
    assert!(!log.exists());
}
