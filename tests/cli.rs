//! Smoke tests through the real binary. HOME is pinned to a tempdir so the
//! settings file and database never touch the developer's machine.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn daybook(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("daybook").unwrap();
    cmd.env("HOME", home);
    cmd
}

fn init(home: &Path) {
    let data_dir = home.join("data");
    daybook(home)
        .args(["init", "--data-dir", data_dir.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));
}

#[test]
fn test_add_then_report_shows_the_amount() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    daybook(home.path())
        .args([
            "add",
            "--type",
            "Expense",
            "--category",
            "food",
            "--amount",
            "100",
            "--date",
            "2024-03-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("id:"));

    daybook(home.path())
        .args(["report", "--from", "2024-03-01", "--to", "2024-03-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100.00 THB"));
}

#[test]
fn test_add_rejects_unknown_category() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    daybook(home.path())
        .args([
            "add",
            "--type",
            "Income",
            "--category",
            "food",
            "--amount",
            "100",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
fn test_add_rejects_malformed_date() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    daybook(home.path())
        .args([
            "add",
            "--type",
            "Expense",
            "--category",
            "food",
            "--amount",
            "10",
            "--date",
            "03/01/2024",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_purge_reports_count_and_list_goes_empty() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    daybook(home.path())
        .args([
            "add",
            "--type",
            "Expense",
            "--category",
            "shopping",
            "--amount",
            "55.25",
            "--date",
            "2024-03-02",
        ])
        .assert()
        .success();

    // One transaction plus its day document.
    daybook(home.path())
        .args(["purge", "--from", "2024-03-01", "--to", "2024-03-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Purged 2 records"));

    daybook(home.path())
        .args(["list", "--from", "2024-03-01", "--to", "2024-03-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions"));
}

#[test]
fn test_demo_then_status_reports_counts() {
    let home = tempfile::tempdir().unwrap();
    init(home.path());

    daybook(home.path()).arg("demo").assert().success().stdout(
        predicate::str::contains("sample transactions"),
    );

    daybook(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transactions:"))
        .stdout(predicate::str::contains("Days summarized:"));
}
