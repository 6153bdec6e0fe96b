use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn padron_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("padron");
    path
}

const HEADER: &str = "ZONE,DOCUMENT_NUMBER,FULL_NAME,CANTON_NAME,PROVINCE_NAME,ROLE,BIRTH_DATE";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Create config
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/padron.sqlite"

[server]
bind = "127.0.0.1:7654"
"#,
        root.display()
    );

    let config_path = config_dir.join("padron.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn write_roster(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn run_padron(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = padron_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run padron binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Runs `query` and parses its stdout as a JSON array of records.
fn query_json(config_path: &Path, args: &[&str]) -> Vec<serde_json::Value> {
    let mut full_args = vec!["query"];
    full_args.extend_from_slice(args);
    let (stdout, stderr, success) = run_padron(config_path, &full_args);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad query output ({}): {}", e, stdout))
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_padron(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_padron(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_padron(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_reports_row_count() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let roster = write_roster(
        tmp.path(),
        "roster.csv",
        &[
            "Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980",
            "Z6,0912345678,MUÑOZ PEÑA JOSÉ,GUAYAQUIL,GUAYAS,RECTOR,17/09/1975",
        ],
    );

    let (stdout, stderr, success) =
        run_padron(&config_path, &["ingest", roster.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rows ingested: 2"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_idempotent() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let roster = write_roster(
        tmp.path(),
        "roster.csv",
        &[
            "Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980",
            "Z6,0912345678,MUÑOZ PEÑA JOSÉ,GUAYAQUIL,GUAYAS,RECTOR,17/09/1975",
        ],
    );

    run_padron(&config_path, &["ingest", roster.to_str().unwrap()]);
    let mut first = query_json(&config_path, &[]);

    run_padron(&config_path, &["ingest", roster.to_str().unwrap()]);
    let mut second = query_json(&config_path, &[]);

    // Same queryable dataset both times, independent of row order.
    let key = |v: &serde_json::Value| v["numero_documento"].as_str().unwrap().to_string();
    first.sort_by_key(&key);
    second.sort_by_key(&key);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_leading_zeros_round_trip() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let roster = write_roster(
        tmp.path(),
        "roster.csv",
        &["Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980"],
    );
    run_padron(&config_path, &["ingest", roster.to_str().unwrap()]);

    let matches = query_json(&config_path, &["0102030405"]);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["numero_documento"], "0102030405");

    // The numerically-equal id without the leading zero is a different key.
    let (_, stderr, success) = run_padron(&config_path, &["query", "102030405"]);
    assert!(!success);
    assert!(stderr.contains("no records found"));
}

#[test]
fn test_non_ascii_round_trip() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let roster = write_roster(
        tmp.path(),
        "roster.csv",
        &["Z6,0912345678,MUÑOZ PEÑA JOSÉ,GUAYAQUIL,GUAYAS,RECTOR,17/09/1975"],
    );
    run_padron(&config_path, &["ingest", roster.to_str().unwrap()]);

    let matches = query_json(&config_path, &["0912345678"]);
    assert_eq!(
        matches[0]["apellidos_nombres"].as_str().unwrap(),
        "MUÑOZ PEÑA JOSÉ"
    );
}

#[test]
fn test_reingest_replaces_dataset() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let first = write_roster(
        tmp.path(),
        "first.csv",
        &[
            "Z1,1111111111,UNO,C,P,DOCENTE,1990",
            "Z1,2222222222,DOS,C,P,DOCENTE,1991",
            "Z1,3333333333,TRES,C,P,DOCENTE,1992",
        ],
    );
    run_padron(&config_path, &["ingest", first.to_str().unwrap()]);

    let second = write_roster(
        tmp.path(),
        "second.csv",
        &[
            "Z2,4444444444,CUATRO,C,P,RECTOR,1993",
            "Z2,5555555555,CINCO,C,P,RECTOR,1994",
        ],
    );
    run_padron(&config_path, &["ingest", second.to_str().unwrap()]);

    let all = query_json(&config_path, &[]);
    assert_eq!(all.len(), 2);

    // Old rows are gone, not merged.
    let (_, stderr, success) = run_padron(&config_path, &["query", "1111111111"]);
    assert!(!success);
    assert!(stderr.contains("no records found"));
}

#[test]
fn test_failed_ingest_leaves_dataset_unchanged() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let good = write_roster(
        tmp.path(),
        "good.csv",
        &["Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980"],
    );
    run_padron(&config_path, &["ingest", good.to_str().unwrap()]);

    // Missing required columns: the whole upload is rejected.
    let bad = tmp.path().join("bad.csv");
    fs::write(&bad, "ZONE,DOCUMENT_NUMBER\nZ1,7\n").unwrap();
    let (_, stderr, success) = run_padron(&config_path, &["ingest", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("missing-column"), "stderr: {}", stderr);

    let all = query_json(&config_path, &[]);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["numero_documento"], "0102030405");
}

#[test]
fn test_wrong_extension_rejected_before_decode() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let good = write_roster(
        tmp.path(),
        "good.csv",
        &["Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980"],
    );
    run_padron(&config_path, &["ingest", good.to_str().unwrap()]);

    let wrong = write_roster(
        tmp.path(),
        "roster.xlsx",
        &["Z1,9999999999,OTRO,C,P,DOCENTE,1990"],
    );
    let (_, stderr, success) = run_padron(&config_path, &["ingest", wrong.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("unsupported-format"), "stderr: {}", stderr);

    // Dataset untouched.
    let all = query_json(&config_path, &[]);
    assert_eq!(all.len(), 1);
}

#[test]
fn test_empty_file_wipes_dataset() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let good = write_roster(
        tmp.path(),
        "good.csv",
        &["Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980"],
    );
    run_padron(&config_path, &["ingest", good.to_str().unwrap()]);

    let empty = write_roster(tmp.path(), "empty.csv", &[]);
    let (stdout, _, success) = run_padron(&config_path, &["ingest", empty.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("rows ingested: 0"));

    let all = query_json(&config_path, &[]);
    assert!(all.is_empty());
}

#[test]
fn test_stats_reports_last_ingestion() {
    let (tmp, config_path) = setup_test_env();
    run_padron(&config_path, &["init"]);

    let roster = write_roster(
        tmp.path(),
        "roster.csv",
        &["Z6,0102030405,PÉREZ NUÑEZ MARÍA,CUENCA,AZUAY,DOCENTE,01/02/1980"],
    );
    run_padron(&config_path, &["ingest", roster.to_str().unwrap()]);

    let (stdout, stderr, success) = run_padron(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Records:"));
    assert!(stdout.contains("Last ingestion:"));
    assert!(stdout.contains("roster.csv"));
}
