//! Command-line tests against a small parent/child alignment.
//!
//! Child top segments (5 bases each): 0 -> parent 0, 1 -> parent 2,
//! 2 unaligned, 3 -> parent 3. Parent segment 1 is deleted in the child.

use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use tempfile::TempDir;

use hal_column::AlignmentBuilder;

fn indel_json() -> String {
    let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
    builder.unlink_top("parent", "child", 1).unwrap();
    builder.unlink_top("parent", "child", 2).unwrap();
    builder.link("parent", 2, "child", 1, false).unwrap();
    builder.build().unwrap().to_json().unwrap()
}

fn write_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("alignment.json");
    std::fs::write(&path, indel_json()).unwrap();
    path
}

fn hal_column() -> Command {
    Command::cargo_bin("hal-column").unwrap()
}

fn columns(path: &Path) -> Command {
    let mut cmd = hal_column();
    cmd.arg("columns")
        .arg(path)
        .args(["--genome", "child", "--sequence", "Sequence_0"]);
    cmd
}

#[test]
fn test_columns_text_single_base() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    columns(&path)
        .args(["--start", "5", "--length", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("child.Sequence_0:5\t"))
        .stdout(predicate::str::contains("child.Sequence_0:5+"))
        .stdout(predicate::str::contains("parent.Sequence_0:10+"));
}

#[test]
fn test_columns_walk_deletion() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    let output = columns(&path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 25);
    let deleted: Vec<&str> = stdout.lines().filter(|l| l.contains(" *\t")).collect();
    assert_eq!(deleted.len(), 5);
    assert!(deleted[0].ends_with("\tparent.Sequence_0:5+"));

    let output = columns(&path).args(["--max-insertion", "0"]).output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 20);
    assert!(!stdout.contains(" *"));
}

#[test]
fn test_columns_json() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    let output = columns(&path)
        .args(["--format", "json", "--start", "10", "--length", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let columns = json.as_array().unwrap();
    assert_eq!(columns.len(), 5);
    // inserted child bases have no homologs
    for (i, column) in columns.iter().enumerate() {
        assert_eq!(column["reference"], "child.Sequence_0");
        assert_eq!(column["position"], 10 + i as u64);
        assert_eq!(column["depth"], 1);
        assert_eq!(column["bases"].as_array().unwrap().len(), 1);
    }
}

#[test]
fn test_columns_tsv() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    columns(&path)
        .args(["--format", "tsv", "--length", "2", "--targets", "parent"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "reference\treference_position\tdepth\tsequence\tposition\tstrand\n",
        ))
        .stdout(predicate::str::contains("child.Sequence_0\t0\t1\tparent.Sequence_0\t0\t+"))
        .stdout(predicate::str::contains("child.Sequence_0\t1\t1\tchild.Sequence_0\t1\t+"));

    columns(&path)
        .args(["--format", "tsv", "--length", "2", "--no-ancestors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parent.Sequence_0").not());
}

#[test]
fn test_columns_reverse_strand() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    let output = columns(&path)
        .args(["--reverse-strand", "--max-insertion", "0"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let first = stdout.lines().next().unwrap();
    assert!(first.starts_with("child.Sequence_0:19\t"));
    assert!(first.contains("parent.Sequence_0:19-"));
}

#[test]
fn test_columns_rejects_bad_ranges() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    columns(&path)
        .args(["--start", "18", "--length", "5"])
        .assert()
        .failure();
    columns(&path)
        .args(["--length", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--length"));
    columns(&path)
        .args(["--start", "2", "--length", "18446744073709551615"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overflows"));
}

#[test]
fn test_blocks_absorb_small_indels() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    hal_column()
        .args(["blocks"])
        .arg(&path)
        .args(["--genome", "child", "--gap-threshold", "5"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("segments 0-3\tchild.Sequence_0:0 len=20\t"))
        .stdout(predicate::str::contains("-> parent.Sequence_0:0"));

    let output = hal_column()
        .args(["blocks"])
        .arg(&path)
        .args(["--genome", "child", "--atomic"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 4);
}

#[test]
fn test_blocks_root_has_no_top_segments() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    hal_column()
        .args(["blocks"])
        .arg(&path)
        .args(["--genome", "parent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no top segments"));
}

#[test]
fn test_map_to_parent() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    hal_column()
        .args(["map"])
        .arg(&path)
        .args(["--genome", "child", "--start", "5", "--length", "5", "--target", "parent"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "child.Sequence_0:5-child.Sequence_0:9 (+)\t-> parent.Sequence_0:10-parent.Sequence_0:14 (+)",
        ));

    hal_column()
        .args(["map"])
        .arg(&path)
        .args(["--genome", "child", "--start", "10", "--length", "5", "--target", "parent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No aligned bases"));
}

#[test]
fn test_map_json_reverse() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    let output = hal_column()
        .args(["--format", "json", "map"])
        .arg(&path)
        .args(["--genome", "child", "--start", "0", "--length", "5", "--target", "parent"])
        .arg("--reverse")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let pieces = json.as_array().unwrap();
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0]["source"]["strand"], "-");
    assert_eq!(pieces[0]["target"]["genome"], "parent");
    assert_eq!(pieces[0]["target"]["start"], 0);
    assert_eq!(pieces[0]["target"]["end"], 4);
    assert_eq!(pieces[0]["target"]["strand"], "-");
}

#[test]
fn test_map_rejects_overflowing_interval() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    hal_column()
        .args(["map"])
        .arg(&path)
        .args(["--genome", "child", "--start", "1", "--target", "parent"])
        .args(["--length", "18446744073709551615", "--reverse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overflows"));
}

#[test]
fn test_map_coalescence_limit_options() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    // climbing to the parent and back finds only the interval itself
    for extra in [&["--coalescence-limit", "parent"][..], &["--no-dupes"][..]] {
        hal_column()
            .args(["map"])
            .arg(&path)
            .args(["--genome", "child", "--start", "5", "--length", "5", "--target", "child"])
            .args(extra)
            .assert()
            .success()
            .stdout(predicate::str::diff(
                "child.Sequence_0:5-child.Sequence_0:9 (+)\t-> child.Sequence_0:5-child.Sequence_0:9 (+)\n",
            ));
    }

    hal_column()
        .args(["map"])
        .arg(&path)
        .args(["--genome", "parent", "--start", "0", "--length", "5", "--target", "child"])
        .args(["--coalescence-limit", "child"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not an ancestor of"));
}

#[test]
fn test_unknown_genome() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    hal_column()
        .args(["map"])
        .arg(&path)
        .args(["--genome", "dog", "--start", "0", "--length", "5", "--target", "parent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Genome 'dog' not found"));
}

#[test]
fn test_gzipped_alignment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("alignment.json.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(indel_json().as_bytes()).unwrap();
    encoder.finish().unwrap();

    columns(&path)
        .args(["--start", "0", "--length", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parent.Sequence_0:2+"));
}

#[test]
fn test_missing_file() {
    hal_column()
        .args(["columns", "/nonexistent/alignment.json", "-g", "child", "-s", "Sequence_0"])
        .assert()
        .failure();
}
