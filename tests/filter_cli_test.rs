use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn listops_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("listops"))
}

const FIXTURE: &str = r#"- comment: This file is machine generated but can be manually edited.
- command: domain_admin_delete_lists
- begin_data: null
- - project: old
  - parent: null
  - lists:
      - name: dev
        created_at: "2020-01-01T00:00:00Z"
        archive: empty
- - project: new
  - parent: null
  - lists:
      - name: dev
        created_at: "2022-01-01T00:00:00Z"
        archive: empty
"#;

fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("lists.yaml");
    fs::write(&path, FIXTURE).expect("write fixture");
    path
}

#[test]
fn age_before_keeps_only_the_older_project() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_fixture(&dir);

    listops_cmd()
        .arg("filter")
        .arg("--input")
        .arg(&input)
        .arg("age-before")
        .arg("2021-01-01")
        .assert()
        .success()
        .stdout(predicate::str::contains("project: old"))
        .stdout(predicate::str::contains("project: new").not());
}

#[test]
fn filter_preserves_the_header_and_appends_provenance() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_fixture(&dir);

    listops_cmd()
        .arg("filter")
        .arg("--input")
        .arg(&input)
        .arg("name-not")
        .arg("no-such-list")
        .assert()
        .success()
        .stdout(predicate::str::contains("command: domain_admin_delete_lists"))
        .stdout(predicate::str::contains("Filter applied: name-not name=no-such-list"))
        .stdout(predicate::str::contains("project: old"))
        .stdout(predicate::str::contains("project: new"));
}

#[test]
fn filter_output_written_to_a_file_can_be_filtered_again() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_fixture(&dir);
    let intermediate = dir.path().join("pass1.yaml");

    listops_cmd()
        .arg("filter")
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&intermediate)
        .arg("age-before")
        .arg("2021-01-01")
        .assert()
        .success();

    listops_cmd()
        .arg("filter")
        .arg("--input")
        .arg(&intermediate)
        .arg("missing")
        .assert()
        .success()
        .stdout(predicate::str::contains("project: old").not());
}

#[test]
fn filter_rejects_a_file_without_the_begin_data_marker() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "- comment: header only\n").expect("write fixture");

    listops_cmd()
        .arg("filter")
        .arg("--input")
        .arg(&path)
        .arg("missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed document"));
}
