//! Integration tests for the sql-diagnose binary.

use std::io::Write;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn cmd() -> Command {
    cargo_bin_cmd!("sql-diagnose")
}

fn schema_file(ddl: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{ddl}").unwrap();
    file
}

fn query_file(sql: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{sql}").unwrap();
    file
}

#[test]
fn diagnose_scores_a_simple_indexed_lookup() {
    let schema = schema_file("CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255));");
    let query = query_file("SELECT id FROM users WHERE id = 1;");

    cmd()
        .args([
            "diagnose",
            "--schema",
            schema.path().to_str().unwrap(),
            "--query",
            query.path().to_str().unwrap(),
            "--permissive",
            "--no-color"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("grade"));
}

#[test]
fn analyze_runs_the_fast_pass_without_baseline_lookup() {
    let schema = schema_file("CREATE TABLE users (id INT PRIMARY KEY);");
    let query = query_file("SELECT id FROM users WHERE id = 1;");

    cmd()
        .args([
            "analyze",
            "--schema",
            schema.path().to_str().unwrap(),
            "--query",
            query.path().to_str().unwrap(),
            "--permissive",
            "--output-format",
            "json"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_report"));
}

#[test]
fn diagnose_rejects_a_write_statement() {
    let schema = schema_file("CREATE TABLE users (id INT PRIMARY KEY);");
    let query = query_file("DELETE FROM users;");

    cmd()
        .args([
            "diagnose",
            "--schema",
            schema.path().to_str().unwrap(),
            "--query",
            query.path().to_str().unwrap(),
            "--permissive"
        ])
        .assert()
        .failure();
}

#[test]
fn diagnose_reports_a_table_scan_as_a_finding() {
    let schema = schema_file("CREATE TABLE users (id INT PRIMARY KEY, status VARCHAR(32));");
    let query = query_file("SELECT * FROM users WHERE status = 'active';");
    let mut plan = NamedTempFile::new().unwrap();
    writeln!(
        plan,
        "-> Table scan on users  (cost=120.0 rows=5000) (actual time=0.5..40.0 rows=500 loops=1)"
    )
    .unwrap();

    cmd()
        .args([
            "diagnose",
            "--schema",
            schema.path().to_str().unwrap(),
            "--query",
            query.path().to_str().unwrap(),
            "--plan",
            plan.path().to_str().unwrap(),
            "--permissive",
            "--verbose",
            "--no-color"
        ])
        .assert()
        .stdout(predicate::str::contains("full_table_scan").or(predicate::str::contains("no_index")));
}

#[test]
fn baseline_on_an_unknown_hash_reports_empty_history() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .args([
            "baseline",
            "--baseline-dir",
            dir.path().to_str().unwrap(),
            "nonexistent-hash"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("no history yet"));
}
