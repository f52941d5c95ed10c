//! Tests for the `create_decompensation` binary.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write_partition(root: &Path, partition: &str) {
    let dir = root.join(partition).join("10");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("stays.csv"),
        "SUBJECT_ID,HADM_ID,ICUSTAY_ID,INTIME,OUTTIME,DEATHTIME\n\
         10,1,100,2150-01-01 00:00:00,,\n",
    )
    .unwrap();
    fs::write(
        dir.join("episode1_timeseries.csv"),
        "Hours,Heart Rate\n0.5,88\n1.0,90\n",
    )
    .unwrap();
    fs::write(
        dir.join("episode1.csv"),
        "Icustay,Length of Stay,Mortality\n100,2.0,0\n",
    )
    .unwrap();
}

fn fixture() -> TempDir {
    let root = TempDir::new().unwrap();
    write_partition(root.path(), "test");
    write_partition(root.path(), "train");
    root
}

fn create_decompensation() -> Command {
    Command::new(env!("CARGO_BIN_EXE_create_decompensation"))
}

#[test]
fn test_builds_test_and_train() {
    let root = fixture();
    let out = TempDir::new().unwrap();
    let output_path = out.path().join("decompensation");

    let status = create_decompensation()
        .arg(root.path())
        .arg(&output_path)
        .status()
        .unwrap();

    assert!(status.success());
    for partition in ["test", "train"] {
        assert_eq!(
            fs::read_to_string(output_path.join(partition).join("listfile.csv")).unwrap(),
            "stay,period_length,y_true\n10_episode1_timeseries.csv,24.000000,0\n"
        );
    }
}

#[test]
fn test_extra_arguments_are_ignored() {
    let root = fixture();
    let out = TempDir::new().unwrap();
    let config = out.path().join("c.toml");
    fs::write(&config, "partitions = [\"val\"]\n").unwrap();

    let status = create_decompensation()
        .arg(root.path())
        .arg(out.path())
        .arg("--config")
        .arg(&config)
        .arg("--threads=4")
        .status()
        .unwrap();

    assert!(status.success());
    assert!(out.path().join("test").join("listfile.csv").exists());
    assert!(out.path().join("train").join("listfile.csv").exists());
    assert!(!out.path().join("val").exists());
}

#[test]
fn test_missing_output_path_fails() {
    let root = fixture();
    let status = create_decompensation().arg(root.path()).status().unwrap();
    assert!(!status.success());
}

#[test]
fn test_missing_partition_fails() {
    let root = TempDir::new().unwrap();
    write_partition(root.path(), "test");
    let out = TempDir::new().unwrap();

    let status = create_decompensation()
        .arg(root.path())
        .arg(out.path())
        .status()
        .unwrap();

    assert!(!status.success());
    assert!(out.path().join("test").join("listfile.csv").exists());
}
