use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("margen")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("factors"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("margen")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn projects_add_requires_name() {
    Command::cargo_bin("margen")
        .unwrap()
        .args(["projects", "add", "25-046-00", "--internal", "PR100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name"));
}

#[test]
fn import_hours_requires_file() {
    Command::cargo_bin("margen")
        .unwrap()
        .args(["import", "hours"])
        .assert()
        .failure();
}

#[test]
fn factors_set_rejects_non_numeric_value() {
    Command::cargo_bin("margen")
        .unwrap()
        .args(["factors", "set", "manufacturing", "not-a-number"])
        .assert()
        .failure();
}
