//! Integration tests for the YMERGE CLI tool.
//!
//! These tests verify the complete end-to-end behavior of the CLI,
//! including argument validation, document loading, merging and output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a Command for the ymerge binary
fn ymerge() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("ymerge"))
}

/// Runs ymerge with `args`, writing JSON to a temporary file, and returns it.
fn merge_to_json(args: &[&str]) -> String {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.json");
    ymerge()
        .args(args)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .code(0);
    fs::read_to_string(out).unwrap()
}

#[test]
fn test_hash_deep_merge_to_stdout() {
    ymerge()
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/hash_rhs.yaml")
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::starts_with("---\n"))
        .stdout(predicate::str::contains("merge_target: new"))
        .stdout(predicate::str::contains("b: 2"))
        .stdout(predicate::str::contains("orig").not());
}

#[test]
fn test_hash_deep_merge_key_order() {
    let output = merge_to_json(&["tests/fixtures/hash_lhs.yaml", "tests/fixtures/hash_rhs.yaml"]);
    assert_eq!(output, "{\"hash\": {\"a\": 1, \"merge_target\": \"new\", \"b\": 2}}\n");
}

#[test]
fn test_arrays_default_to_all() {
    let output = merge_to_json(&["tests/fixtures/array_lhs.yaml", "tests/fixtures/array_rhs.yaml"]);
    assert_eq!(output, "{\"array\": [\"one\", \"two\", \"two\", \"three\"]}\n");
}

#[test]
fn test_arrays_unique_flag() {
    let output = merge_to_json(&[
        "--arrays",
        "unique",
        "tests/fixtures/array_lhs.yaml",
        "tests/fixtures/array_rhs.yaml",
    ]);
    assert_eq!(output, "{\"array\": [\"one\", \"two\", \"three\"]}\n");
}

#[test]
fn test_aoh_deep_merge_from_config_file() {
    let output = merge_to_json(&[
        "--config",
        "tests/fixtures/merge_config.toml",
        "tests/fixtures/aoh_lhs.yaml",
        "tests/fixtures/aoh_rhs.yaml",
    ]);
    assert_eq!(
        output,
        "{\"records\": [{\"id\": 1, \"name\": \"first\"}, \
         {\"id\": 2, \"name\": \"updated\", \"color\": \"red\"}, \
         {\"id\": 3, \"name\": \"third\"}]}\n"
    );
}

#[test]
fn test_aoh_missing_identity_key_exit_4() {
    ymerge()
        .arg("--aoh")
        .arg("deep")
        .arg("tests/fixtures/aoh_lhs.yaml")
        .arg("tests/fixtures/aoh_no_key.yaml")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Mandatory identity key, id, not present"));
}

#[test]
fn test_every_document_of_a_stream_is_merged() {
    let output = merge_to_json(&["tests/fixtures/multi_doc.yaml"]);
    assert_eq!(output, "{\"a\": 3, \"b\": 2}\n");
}

#[test]
fn test_stdin_document() {
    ymerge()
        .arg("tests/fixtures/settings.json")
        .arg("-")
        .write_stdin("{\"extra\": true}")
        .assert()
        .success()
        .stdout("{\"name\": \"json\", \"tags\": [\"x\"], \"extra\": true}\n");
}

#[test]
fn test_output_format_follows_first_document() {
    ymerge()
        .arg("tests/fixtures/settings.json")
        .arg("tests/fixtures/hash_rhs.yaml")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{\"name\": \"json\""));
}

#[test]
fn test_forced_document_format() {
    ymerge()
        .arg("--document-format")
        .arg("yaml")
        .arg("tests/fixtures/settings.json")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\nname: json\n"));
}

#[test]
fn test_document_format_sets_output_only() {
    ymerge()
        .arg("-D")
        .arg("json")
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/hash_rhs.yaml")
        .assert()
        .success()
        .stdout("{\"hash\": {\"a\": 1, \"merge_target\": \"new\", \"b\": 2}}\n");
}

#[test]
fn test_implicit_stdin_is_merged_last() {
    ymerge()
        .arg("tests/fixtures/settings.json")
        .write_stdin("extra: true\n")
        .assert()
        .success()
        .stdout("{\"name\": \"json\", \"tags\": [\"x\"], \"extra\": true}\n");
}

#[test]
fn test_nostdin_ignores_piped_input() {
    ymerge()
        .arg("--nostdin")
        .arg("tests/fixtures/settings.json")
        .write_stdin("extra: true\n")
        .assert()
        .success()
        .stdout("{\"name\": \"json\", \"tags\": [\"x\"]}\n");
}

#[test]
fn test_implicit_stdin_alone_is_a_document() {
    ymerge()
        .write_stdin("only: stdin\n")
        .assert()
        .success()
        .stdout("---\nonly: stdin\n");
}

#[test]
fn test_anchors_are_written_back() {
    ymerge()
        .arg("tests/fixtures/anchors_lhs.yaml")
        .assert()
        .success()
        .stdout("---\nshared: &shared lhs value\nuses:\n  first: *shared\n");
}

#[test]
fn test_anchor_conflict_stops_by_default() {
    ymerge()
        .arg("tests/fixtures/anchors_lhs.yaml")
        .arg("tests/fixtures/anchors_rhs.yaml")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Aborting due to anchor conflict with, shared"));
}

#[test]
fn test_anchor_conflict_rename() {
    ymerge()
        .arg("--anchors")
        .arg("rename")
        .arg("tests/fixtures/anchors_lhs.yaml")
        .arg("tests/fixtures/anchors_rhs.yaml")
        .assert()
        .success()
        .stdout(
            "---\nshared: &shared lhs value\nuses:\n  first: *shared\n  \
             second: &shared_1 rhs value\nother: *shared_1\n",
        );
}

#[test]
fn test_anchor_conflict_left_and_right() {
    ymerge()
        .arg("-a")
        .arg("left")
        .arg("tests/fixtures/anchors_lhs.yaml")
        .arg("tests/fixtures/anchors_rhs.yaml")
        .assert()
        .success()
        .stdout(
            "---\nshared: &shared lhs value\nuses:\n  first: *shared\n  \
             second: *shared\nother: *shared\n",
        );

    ymerge()
        .arg("-a")
        .arg("right")
        .arg("tests/fixtures/anchors_lhs.yaml")
        .arg("tests/fixtures/anchors_rhs.yaml")
        .assert()
        .success()
        .stdout(
            "---\nshared: &shared rhs value\nuses:\n  first: *shared\n  \
             second: *shared\nother: *shared\n",
        );
}

#[test]
fn test_merge_keys_are_applied() {
    ymerge()
        .arg("-D")
        .arg("json")
        .arg("tests/fixtures/merge_keys.yaml")
        .assert()
        .success()
        .stdout(
            "{\"defaults\": {\"adapter\": \"postgres\", \"host\": \"localhost\"}, \
             \"development\": {\"adapter\": \"postgres\", \"host\": \"localhost\", \
             \"database\": \"dev\"}}\n",
        );
}

#[test]
fn test_hash_policy_keeps_rhs_only_root_keys() {
    let output = merge_to_json(&[
        "--hashes",
        "left",
        "tests/fixtures/hash_lhs.yaml",
        "tests/fixtures/settings.json",
    ]);
    assert_eq!(
        output,
        "{\"hash\": {\"a\": 1, \"merge_target\": \"orig\"}, \"name\": \"json\", \"tags\": [\"x\"]}\n"
    );
}

#[test]
fn test_mergeat_creates_target() {
    let output = merge_to_json(&[
        "--mergeat",
        "/hash/sub",
        "tests/fixtures/hash_lhs.yaml",
        "tests/fixtures/array_lhs.yaml",
    ]);
    assert_eq!(
        output,
        "{\"hash\": {\"a\": 1, \"merge_target\": \"orig\", \"sub\": {\"array\": [\"one\", \"two\"]}}}\n"
    );
}

#[test]
fn test_scalar_into_hash_exit_4() {
    ymerge()
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/scalar.yaml")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Impossible to add Scalar value, replacement,"));
}

#[test]
fn test_scalar_to_leaf_target() {
    let output = merge_to_json(&[
        "-m",
        "/hash/merge_target",
        "tests/fixtures/hash_lhs.yaml",
        "tests/fixtures/scalar.yaml",
    ]);
    assert_eq!(output, "{\"hash\": {\"a\": 1, \"merge_target\": \"replacement\"}}\n");
}

#[test]
fn test_nested_hash_into_array_exit_4() {
    ymerge()
        .arg("tests/fixtures/array_lhs.yaml")
        .arg("tests/fixtures/nested_hash.yaml")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains(
            "Impossible to add Hash data to non-Hash destination at /array",
        ));
}

#[test]
fn test_hash_appended_to_array_target() {
    let output = merge_to_json(&[
        "-m",
        "/array",
        "tests/fixtures/array_lhs.yaml",
        "tests/fixtures/settings.json",
    ]);
    assert_eq!(
        output,
        "{\"array\": [\"one\", \"two\", {\"name\": \"json\", \"tags\": [\"x\"]}]}\n"
    );
}

#[test]
fn test_unmatched_mergeat_exit_4() {
    ymerge()
        .arg("-m")
        .arg("/hash[a=99]")
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/hash_rhs.yaml")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("merge was not performed"));
}

#[test]
fn test_malformed_mergeat_exit_5() {
    ymerge()
        .arg("-m")
        .arg("/hash[bogus()]")
        .arg("tests/fixtures/hash_lhs.yaml")
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_file_not_found_exit_2() {
    ymerge()
        .arg("tests/fixtures/nonexistent.yaml")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_invalid_yaml_exit_3() {
    ymerge()
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/invalid.yaml")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("YAML syntax error"));
}

#[test]
fn test_invalid_json_exit_3() {
    ymerge()
        .arg("tests/fixtures/invalid.json")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("JSON syntax error"));
}

#[test]
fn test_no_documents_exit_1() {
    ymerge()
        .arg("--nostdin")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("There must be at least one DOCUMENT"));
}

#[test]
fn test_two_stdin_documents_exit_1() {
    ymerge()
        .arg("-")
        .arg("-")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Only one DOCUMENT may be the - pseudo-file"));
}

#[test]
fn test_conflicting_verbosity_exit_1() {
    ymerge()
        .arg("--verbose")
        .arg("--quiet")
        .arg("tests/fixtures/hash_lhs.yaml")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_backup_requires_overwrite() {
    ymerge()
        .arg("--backup")
        .arg("tests/fixtures/hash_lhs.yaml")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_invalid_config_option_exit_1() {
    ymerge()
        .arg("--config")
        .arg("tests/fixtures/bad_option.toml")
        .arg("tests/fixtures/hash_lhs.yaml")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("sideways"));
}

#[test]
fn test_output_file_must_not_exist() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.yaml");
    fs::write(&out, "keep: me\n").unwrap();

    ymerge()
        .arg("-o")
        .arg(&out)
        .arg("tests/fixtures/hash_lhs.yaml")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&out).unwrap(), "keep: me\n");
}

#[test]
fn test_overwrite_with_backup() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.yaml");
    fs::write(&out, "keep: me\n").unwrap();

    ymerge()
        .arg("--overwrite")
        .arg(&out)
        .arg("--backup")
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/hash_rhs.yaml")
        .assert()
        .success();

    let backup = dir.path().join("out.yaml.bak");
    assert_eq!(fs::read_to_string(backup).unwrap(), "keep: me\n");
    let merged = fs::read_to_string(&out).unwrap();
    assert!(merged.starts_with("---\n"));
    assert!(merged.contains("merge_target: new"));
}

#[test]
fn test_nothing_written_on_failure() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.yaml");

    ymerge()
        .arg("-o")
        .arg(&out)
        .arg("tests/fixtures/hash_lhs.yaml")
        .arg("tests/fixtures/scalar.yaml")
        .assert()
        .failure()
        .code(4);

    assert!(!out.exists());
}

#[test]
fn test_quiet_mode_still_reports_errors() {
    ymerge()
        .arg("--quiet")
        .arg("tests/fixtures/nonexistent.yaml")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_help_flag() {
    ymerge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Merge YAML and JSON documents"))
        .stdout(predicate::str::contains("--mergeat"));
}
