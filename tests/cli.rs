//! E2E tests for the calculate, batch, states, share and schema commands

use std::process::{Command, Output};

fn qsbs(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .args(["--today", "2026-10-19"])
        .output()
        .expect("Failed to execute command")
}

fn stdout_of(output: &Output) -> String {
    assert!(output.status.success(), "Command failed: {:?}", output);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// ISO exercised in California: full federal exclusion, CA taxes the whole gain
#[test]
fn calculate_iso_in_california() {
    let stdout = stdout_of(&qsbs(&[
        "calculate",
        "-f",
        "tests/data/iso_california.json",
    ]));

    assert!(stdout.contains("QSBS ESTIMATE"));
    assert!(stdout.contains("Incentive stock option (ISO)"));
    assert!(stdout.contains("June 2, 2024"));
    assert!(stdout.contains("$2,000,000.00"));
    assert!(stdout.contains("$476,000.00"));
    assert!(stdout.contains("California"));
    assert!(stdout.contains("$266,000.00"));
    assert!(!stdout.contains("warning(s)"));
}

/// The same scenario described with flags gives the same answer
#[test]
fn calculate_from_flags() {
    let stdout = stdout_of(&qsbs(&[
        "calculate",
        "-t",
        "iso",
        "-m",
        "exercised",
        "--exercise-date",
        "2019-06-01",
        "--sale-date",
        "2025-01-01",
        "-b",
        "10000",
        "-v",
        "2010000",
        "-s",
        "ca",
    ]));

    assert!(stdout.contains("$476,000.00"));
    assert!(stdout.contains("$266,000.00"));
}

/// JSON output carries the nested report
#[test]
fn calculate_json_output() {
    let stdout = stdout_of(&qsbs(&[
        "calculate",
        "-f",
        "tests/data/iso_california.json",
        "--json",
    ]));

    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(report["holding_period"]["status"], "qualified");
    assert_eq!(report["holding_period"]["qualification_date"], "2024-06-02");
    assert_eq!(report["holding_period"]["is_qualified"], true);
    assert_eq!(report["exclusion"]["tier"], "full");
    assert_eq!(report["federal_tax"]["savings"].as_f64(), Some(476000.0));
    assert!(report["total_savings"].is_number());
    assert_eq!(report["state_tax"]["status"], "computed");
    assert_eq!(report["state_tax"]["conformity"], "none");
    assert!(report["warnings"].as_array().unwrap().is_empty());
}

/// Missing flags are reported rather than guessed
#[test]
fn calculate_requires_a_scenario() {
    let output = qsbs(&["calculate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--stock-type"));
}

/// A restricted stock grant with an unknown 83(b) election is indeterminate
#[test]
fn calculate_unknown_election_warns() {
    let stdout = stdout_of(&qsbs(&[
        "calculate",
        "-t",
        "rsa",
        "--grant-date",
        "2016-02-01",
        "--vesting-date",
        "2020-02-01",
        "-v",
        "100000",
        "-s",
        "WA",
    ]));

    assert!(stdout.contains("Cannot be determined"));
    assert!(stdout.contains("83(b) election:        unknown"));
    assert!(stdout.contains("warning(s)"));
}

/// Batch CSV output has one row per scenario
#[test]
fn batch_csv_rows() {
    let stdout = stdout_of(&qsbs(&["batch", "tests/data/scenarios.csv"]));
    let mut lines = stdout.lines();

    let header = lines.next().expect("header row");
    assert!(header.starts_with("id,stock_type,state_code,holding_status"));

    let rows: Vec<_> = lines.collect();
    assert_eq!(rows.len(), 5);
    assert!(rows[0].starts_with("founder,restricted-stock,NY,qualified"));
    assert!(rows[1].contains("476000.00"));
    assert!(rows[2].starts_with("angel,converted-safe-or-note,TX,counting"));
    assert!(rows[3].starts_with("unknown-rsa,restricted-stock,WA,indeterminate"));
    assert!(rows[4].starts_with("estate,inheritance,ZZ,immediately-qualified"));
    assert!(rows[4].contains("unknown-state"));
}

/// Batch JSON output wraps the reports with the evaluation date
#[test]
fn batch_json_output() {
    let stdout = stdout_of(&qsbs(&["batch", "tests/data/scenarios.csv", "--json"]));

    let output: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(output["as_of"], "2026-10-19");
    let reports = output["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 5);
    assert_eq!(reports[0]["id"], "founder");
    assert_eq!(reports[4]["state_tax"]["status"], "unknown-state");
}

/// The conformity table lists every state
#[test]
fn states_table() {
    let stdout = stdout_of(&qsbs(&["states"]));

    assert!(stdout.contains("STATE QSBS CONFORMITY"));
    assert!(stdout.contains("California"));
    assert!(stdout.contains("District of Columbia"));
    assert!(stdout.contains("Wyoming"));
}

/// Filtering by conformity keeps only matching states
#[test]
fn states_non_conforming() {
    let stdout = stdout_of(&qsbs(&["states", "-c", "none"]));

    for name in ["Alabama", "California", "Mississippi", "Pennsylvania"] {
        assert!(stdout.contains(name), "missing {}", name);
    }
    assert!(!stdout.contains("New York"));
}

/// An unknown state code is an error
#[test]
fn states_unknown_code() {
    let output = qsbs(&["states", "ZZ"]);
    assert!(!output.status.success());
}

/// Encoding then decoding a file reproduces the scenario
#[test]
fn share_token_round_trip() {
    let token = stdout_of(&qsbs(&[
        "share",
        "encode",
        "tests/data/iso_california.json",
    ]));
    let token = token.trim();
    assert!(token.starts_with("v=1&"));

    let decoded = stdout_of(&qsbs(&["share", "decode", token]));
    let scenario: serde_json::Value = serde_json::from_str(&decoded).expect("valid JSON");
    assert_eq!(scenario["stock_type"], "incentive-stock-option");
    assert_eq!(scenario["exercise_date"], "2019-06-01");
    assert_eq!(scenario["state_code"], "CA");
}

/// A tampered token is rejected
#[test]
fn share_decode_rejects_tampering() {
    let token = stdout_of(&qsbs(&[
        "share",
        "encode",
        "tests/data/iso_california.json",
    ]));
    let tampered = token.trim().replace("st=CA", "st=TX");

    let output = qsbs(&["share", "decode", &tampered]);
    assert!(!output.status.success());
}

/// The CSV header printed by schema matches the fixture
#[test]
fn schema_csv_header() {
    let stdout = stdout_of(&qsbs(&["schema", "csv-header"]));
    let fixture = std::fs::read_to_string("tests/data/scenarios.csv").unwrap();

    assert_eq!(stdout.trim(), fixture.lines().next().unwrap());
}
