use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::tempdir;

const MAP_A: &str = "\
Linker script and memory map

.bss            0x10000000      0x100
                0x20004000                __bss_end__
                0x20008000                __StackTop
";

const MAP_B: &str = "\
Linker script and memory map

.bss            0x10000000      0x200
                0x20004800                __bss_end__
                0x20008000                __StackTop
";

fn write_map(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write map fixture");
    path
}

/// With no arguments the tool prints usage and exits with status 1.
#[test]
fn no_arguments_prints_help_and_fails() {
    assert_cmd::cargo::cargo_bin_cmd!("linkmap-analyzer")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Usage"));
}

/// A missing map file is fatal: message on stderr, exit status 1.
#[test]
fn missing_map_file_fails_with_context() {
    assert_cmd::cargo::cargo_bin_cmd!("linkmap-analyzer")
        .arg("does-not-exist.map")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read map file"));
}

#[test]
fn analyze_single_map_reports_heap_space() {
    let dir = tempdir().expect("tempdir");
    let map = write_map(&dir, "fw.map", MAP_A);

    assert_cmd::cargo::cargo_bin_cmd!("linkmap-analyzer")
        .arg(&map)
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Analysis of"))
        .stdout(predicate::str::contains(
            "Estimated Available Heap Space: 16384 bytes (16.00 KB)",
        ));
}

#[test]
fn compare_flags_heap_regression() {
    let dir = tempdir().expect("tempdir");
    let map_a = write_map(&dir, "a.map", MAP_A);
    let map_b = write_map(&dir, "b.map", MAP_B);

    assert_cmd::cargo::cargo_bin_cmd!("linkmap-analyzer")
        .arg("--compare")
        .arg(&map_a)
        .arg(&map_b)
        .assert()
        .success()
        .stdout(predicate::str::contains("=== COMPARISON RESULTS ==="))
        .stdout(predicate::str::contains(
            "[WARN: Higher end of BSS reduces heap space]",
        ))
        .stdout(predicate::str::contains(
            "[WARNING] Available heap space decreased in Build B!",
        ));
}

#[test]
fn json_mode_emits_machine_readable_analysis() {
    let dir = tempdir().expect("tempdir");
    let map = write_map(&dir, "fw.map", MAP_A);

    let output = assert_cmd::cargo::cargo_bin_cmd!("linkmap-analyzer")
        .arg(&map)
        .arg("--json")
        .output()
        .expect("run analyzer");
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let analysis = &doc["analysis"];
    assert_eq!(analysis["sections"][".bss"]["size"], 0x100);
    assert_eq!(analysis["symbols"]["__bss_end__"], "0x20004000");
    assert_eq!(analysis["heap_space"], 16384);
}

#[test]
fn json_compare_includes_delta_document() {
    let dir = tempdir().expect("tempdir");
    let map_a = write_map(&dir, "a.map", MAP_A);
    let map_b = write_map(&dir, "b.map", MAP_B);

    let output = assert_cmd::cargo::cargo_bin_cmd!("linkmap-analyzer")
        .arg("--json")
        .arg("--compare")
        .arg(&map_a)
        .arg(&map_b)
        .output()
        .expect("run analyzer");
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(doc["comparison"]["heap"]["diff"], -0x800);
    assert_eq!(doc["comparison"]["heap"]["shrank"], true);
}
