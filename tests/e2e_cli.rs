//! CLI smoke tests through the compiled binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn etfolio(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("etfolio").expect("binary builds");
    cmd.arg("--db").arg(db);
    cmd
}

fn init_db(db: &Path) {
    etfolio(db).arg("init").assert().success();
}

#[test]
fn test_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");

    etfolio(&db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized"));
    assert!(db.exists());
}

#[test]
fn test_add_and_list_transactions() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args([
            "tx", "add", "--date", "2024-01-15", "--isin", "IE00B4L5Y983", "--type", "BUY",
            "--units", "10", "--price", "100.00", "--fee", "1.50",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("IE00B4L5Y983"));

    etfolio(&db)
        .args(["tx", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IE00B4L5Y983"))
        .stdout(predicate::str::contains("1 of 1"));
}

#[test]
fn test_invalid_isin_is_rejected() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args([
            "tx", "add", "--date", "2024-01-15", "--isin", "NOPE", "--type", "BUY", "--units",
            "1", "--price", "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid ISIN"));
}

#[test]
fn test_portfolio_summary_output() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args([
            "tx", "add", "--date", "2024-01-15", "--isin", "IE00B4L5Y983", "--type", "BUY",
            "--units", "10", "--price", "100.00", "--fee", "2.00",
        ])
        .assert()
        .success();
    etfolio(&db)
        .args(["value", "set", "IE00B4L5Y983", "1100.00"])
        .assert()
        .success();

    etfolio(&db)
        .arg("portfolio")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invested:   1000.00"))
        .stdout(predicate::str::contains("Holdings"));
}

#[test]
fn test_instrument_names_appear_in_listings() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args([
            "instrument", "set", "IE00B4L5Y983", "--name", "Vanguard FTSE All-World", "--kind",
            "STOCK",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vanguard FTSE All-World"));

    // Same ISIN a second time via `add` is a conflict
    etfolio(&db)
        .args([
            "instrument", "add", "IE00B4L5Y983", "--name", "Duplicate", "--kind", "BOND",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict"));

    etfolio(&db)
        .args([
            "tx", "add", "--date", "2024-01-15", "--isin", "IE00B4L5Y983", "--type", "BUY",
            "--units", "10", "--price", "100.00",
        ])
        .assert()
        .success();

    etfolio(&db)
        .args(["tx", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vanguard FTSE All-World"));

    etfolio(&db)
        .arg("portfolio")
        .assert()
        .success()
        .stdout(predicate::str::contains("Vanguard FTSE All-World"));
}

#[test]
fn test_rate_roundtrip() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args(["rate", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25.00 CZK/EUR"));

    etfolio(&db).args(["rate", "set", "24.5"]).assert().success();
    etfolio(&db)
        .args(["rate", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("24.5 CZK/EUR"));
}

#[test]
fn test_snapshot_create_and_summary() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args([
            "asset", "set", "--type", "cash_czk", "--detail", "CSOB", "--currency", "CZK",
            "--value", "2500.00",
        ])
        .assert()
        .success();

    etfolio(&db)
        .args(["snapshot", "create", "--date", "2024-06-01T12:00:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Captured 2 assets"))
        .stdout(predicate::str::contains("100.00 EUR"));

    etfolio(&db)
        .args(["snapshot", "summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Avg monthly increment"));
}

#[test]
fn test_snapshot_delete_all_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    etfolio(&db)
        .args(["snapshot", "delete-all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    etfolio(&db)
        .args(["snapshot", "delete-all", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 0 snapshot rows"));
}

#[test]
fn test_degiro_import_via_cli() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data.db");
    init_db(&db);

    let csv = dir.path().join("degiro.csv");
    std::fs::write(
        &csv,
        "Date,Time,Product,ISIN,Quantity,Price,Transaction and/or third party fees EUR\n\
         15-01-2024,09:00,VANGUARD FTSE AW,IE00B4L5Y983,10,\"100,00\",\"-1,50\"\n",
    )
    .unwrap();

    etfolio(&db)
        .args(["import", "degiro"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 rows"));

    etfolio(&db)
        .args(["tx", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IE00B4L5Y983"));
}
