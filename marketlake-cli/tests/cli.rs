//! End-to-end runs of the `marketlake` binary against a temporary database.
//! Nothing here touches the network: oil is loaded from a local CSV.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn marketlake(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_marketlake"))
        .args(args)
        .current_dir(dir)
        .env_remove("MARKETLAKE_DB")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn wti_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("marketlake-collect")
        .join("tests")
        .join("fixtures")
        .join("wti_daily.csv")
}

#[test]
fn init_creates_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let out = marketlake(dir.path(), &["init", "--db", "data/market.db"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(dir.path().join("data").join("market.db").is_file());
}

#[test]
fn oil_from_csv_then_config_show_reports_the_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv = wti_fixture();
    let csv = csv.to_str().unwrap();

    let out = marketlake(
        dir.path(),
        &["collect", "oil", "--db", "m.db", "--csv-file", csv],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("oil: 1/1 items ok, 5 rows written, 1 skipped"));

    let out = marketlake(dir.path(), &["config", "show", "--db", "m.db"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("[coingecko]"));
    let oil = text
        .lines()
        .find(|line| line.starts_with("oil_price"))
        .unwrap();
    let fields: Vec<&str> = oil.split_whitespace().collect();
    assert_eq!(fields, ["oil_price", "5", "2020-01-02", "2020-01-09"]);
}

#[test]
fn query_run_prints_the_row_count() {
    let dir = tempfile::tempdir().unwrap();
    assert!(marketlake(dir.path(), &["init", "--db", "m.db"]).status.success());

    let out = marketlake(dir.path(), &["query", "run", "1", "--db", "m.db"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = stdout(&out);
    assert!(text.contains("Top 3 cryptocurrencies by market cap"));
    assert!(text.trim_end().ends_with("0 rows"));
}

#[test]
fn unknown_query_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = marketlake(dir.path(), &["query", "run", "999", "--db", "m.db"]);
    assert!(!out.status.success());
}

#[test]
fn csv_file_is_rejected_for_stocks() {
    let dir = tempfile::tempdir().unwrap();
    let out = marketlake(
        dir.path(),
        &["collect", "stocks", "--db", "m.db", "--csv-file", "x.csv"],
    );
    assert!(!out.status.success());
    assert!(!dir.path().join("m.db").exists());
}
