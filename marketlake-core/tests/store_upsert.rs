//! Integration tests for keyed upserts against file-backed and in-memory stores.

use std::path::PathBuf;

use chrono::NaiveDate;
use marketlake_core::store::{Cell, MarketStore, StoreError, Table};
use marketlake_core::{CoinDailyPrice, CoinSnapshot, OilDailyPrice, StockDailyBar};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_snapshot_fixture() -> Vec<CoinSnapshot> {
    let text = std::fs::read_to_string(fixture_dir().join("snapshot_3.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn memory_store() -> MarketStore {
    let store = MarketStore::open_in_memory().unwrap();
    store.ensure_schema().unwrap();
    store
}

#[test]
fn identical_upsert_twice_leaves_one_row() {
    let store = memory_store();
    let bar = StockDailyBar {
        ticker: "^GSPC".into(),
        date: date(2025, 1, 2),
        open: 5903.26,
        high: 5949.34,
        low: 5832.3,
        close: 5868.55,
        volume: 3_621_680_000,
    };
    store.upsert_stock_bar(&bar).unwrap();
    store.upsert_stock_bar(&bar).unwrap();
    assert_eq!(store.count_rows(Table::StockPrice).unwrap(), 1);

    let result = store
        .run_query("SELECT ticker, close, volume FROM stock_price")
        .unwrap();
    assert_eq!(result.rows[0][0], Cell::Text("^GSPC".into()));
    assert_eq!(result.rows[0][1], Cell::Real(5868.55));
    assert_eq!(result.rows[0][2], Cell::Integer(3_621_680_000));
}

#[test]
fn reloading_snapshot_fixture_keeps_three_rows() {
    let store = memory_store();
    let snapshot = load_snapshot_fixture();
    assert_eq!(snapshot.len(), 3);

    let first = store.upsert_batch(&snapshot);
    assert_eq!(first.written, 3);
    assert!(first.is_clean());

    let second = store.upsert_batch(&snapshot);
    assert_eq!(second.written, 3);
    assert_eq!(store.count_rows(Table::Cryptocurrencies).unwrap(), 3);

    let ts = store
        .run_query("SELECT last_updated FROM Cryptocurrencies WHERE id = 'bitcoin'")
        .unwrap();
    assert_eq!(ts.scalar(), Some(&Cell::Text("2025-01-02T10:15:00Z".into())));
}

#[test]
fn refreshed_snapshot_overwrites_fields() {
    let store = memory_store();
    let mut snapshot = load_snapshot_fixture();
    store.upsert_batch(&snapshot);

    snapshot[0].current_price = Some(99_000.0);
    snapshot[0].market_cap_rank = Some(1);
    store.upsert_coin_snapshot(&snapshot[0]).unwrap();

    let price = store
        .run_query("SELECT current_price FROM Cryptocurrencies WHERE id = 'bitcoin'")
        .unwrap();
    assert_eq!(price.scalar(), Some(&Cell::Real(99_000.0)));
    assert_eq!(store.count_rows(Table::Cryptocurrencies).unwrap(), 3);
}

#[test]
fn failure_partway_through_batch_keeps_earlier_rows() {
    let store = memory_store();
    let prices = vec![
        CoinDailyPrice {
            coin_id: "bitcoin".into(),
            date: date(2025, 1, 1),
            price_usd: 94_419.76,
        },
        CoinDailyPrice {
            coin_id: "bitcoin".into(),
            date: date(2025, 1, 2),
            price_usd: 96_886.88,
        },
        CoinDailyPrice {
            coin_id: "   ".into(),
            date: date(2025, 1, 3),
            price_usd: 98_107.43,
        },
        CoinDailyPrice {
            coin_id: "bitcoin".into(),
            date: date(2025, 1, 4),
            price_usd: 98_236.23,
        },
    ];

    let outcome = store.upsert_batch(&prices);
    assert_eq!(outcome.written, 3);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].index, 2);
    assert!(outcome.rejected[0].reason.contains("coin_id"));
    assert_eq!(store.count_rows(Table::CryptoPrices).unwrap(), 3);
}

#[test]
fn negative_price_is_refused_by_the_table() {
    let store = memory_store();
    let err = store
        .upsert_oil_price(&OilDailyPrice {
            date: date(2020, 4, 20),
            price_usd: -37.63,
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));
    assert_eq!(store.count_rows(Table::OilPrice).unwrap(), 0);
}

#[test]
fn file_backed_store_persists_and_reopens_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("market_data.db");

    {
        let store = MarketStore::open(&path).unwrap();
        store.ensure_schema().unwrap();
        store
            .upsert_oil_price(&OilDailyPrice {
                date: date(2025, 1, 2),
                price_usd: 73.13,
            })
            .unwrap();
    }

    let reader = MarketStore::open_read_only(&path).unwrap();
    assert_eq!(reader.path(), Some(path.as_path()));
    assert_eq!(reader.count_rows(Table::OilPrice).unwrap(), 1);
    assert!(reader
        .upsert_oil_price(&OilDailyPrice {
            date: date(2025, 1, 3),
            price_usd: 74.0,
        })
        .is_err());
}

#[test]
fn read_only_open_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(MarketStore::open_read_only(&dir.path().join("absent.db")).is_err());
}
