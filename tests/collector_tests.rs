// Collection cycle tests against a local stub pool API

use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, TimeZone, Utc};
use minerhist::collector::{build_readings, collect_coin, rollup_due};
use minerhist::history_repo::HistoryRepo;
use minerhist::models::WorkerStatus;
use minerhist::pool_repo::{PoolRepo, WorkerEntry};
use std::collections::BTreeMap;
use tempfile::TempDir;

async fn new_repo(dir: &TempDir) -> HistoryRepo {
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 2, 90)
        .await
        .unwrap();
    repo.init().await.unwrap();
    repo
}

/// Serves `body` on an ephemeral port and returns the endpoint URL.
async fn spawn_pool_stub(body: serde_json::Value) -> String {
    let app = Router::new().route(
        "/workers",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/workers")
}

fn endpoints(coin: &str, url: String) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert(coin.to_string(), url);
    map
}

#[tokio::test]
async fn collect_coin_stores_classified_batch() {
    let body = serde_json::json!({
        "currency": "BTC",
        "details": [
            {
                "worker": "CH_01",
                "hashrate": 100.0,
                "hashrate1h": 90.0,
                "hashrate24h": 80.0,
                "reject": 0.5,
                "new_status": "active"
            },
            // Missing numeric fields decode as zero; status case is ignored.
            {"worker": "ZZ_top", "new_status": "ACTIVE"},
            // No worker name: dropped, counted as skipped.
            {"hashrate": 5.0, "new_status": "active"}
        ]
    });
    let url = spawn_pool_stub(body).await;
    let pool_repo = PoolRepo::new(&endpoints("btc", url)).unwrap();

    let dir = TempDir::new().unwrap();
    let history_repo = new_repo(&dir).await;

    let outcome = collect_coin(&pool_repo, &history_repo, "btc").await.unwrap();
    assert_eq!(outcome.stored, 2);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.fallback_racks, 1);

    let rows = history_repo
        .get_readings_by_time_range(0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let by_name = |n: &str| rows.iter().find(|r| r.worker_name == n).unwrap();

    let ch = by_name("CH_01");
    assert_eq!(ch.rack, "CH");
    assert_eq!(ch.hashrate, 100.0);
    assert_eq!(ch.hashrate_1h, 90.0);
    assert_eq!(ch.hashrate_24h, 80.0);
    assert_eq!(ch.reject_rate, 0.5);
    assert_eq!(ch.status, WorkerStatus::Active);
    assert_eq!(ch.coin_type, "btc");

    let zz = by_name("ZZ_top");
    assert_eq!(zz.rack, "others");
    assert_eq!(zz.hashrate, 0.0);
    assert_eq!(zz.status, WorkerStatus::Active);
}

#[tokio::test]
async fn collect_coin_rejects_body_without_details() {
    let url = spawn_pool_stub(serde_json::json!({"workers": []})).await;
    let pool_repo = PoolRepo::new(&endpoints("btc", url)).unwrap();

    let dir = TempDir::new().unwrap();
    let history_repo = new_repo(&dir).await;

    let err = collect_coin(&pool_repo, &history_repo, "btc")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("malformed pool response"));

    let rows = history_repo
        .get_readings_by_time_range(0, i64::MAX)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn collect_coin_propagates_upstream_failure() {
    let app = Router::new().route(
        "/workers",
        get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let pool_repo = PoolRepo::new(&endpoints("btc", format!("http://{addr}/workers"))).unwrap();

    let dir = TempDir::new().unwrap();
    let history_repo = new_repo(&dir).await;

    assert!(collect_coin(&pool_repo, &history_repo, "btc").await.is_err());
}

#[tokio::test]
async fn unconfigured_coin_is_an_error() {
    let pool_repo = PoolRepo::new(&endpoints("btc", "http://127.0.0.1:9/x".to_string())).unwrap();
    let dir = TempDir::new().unwrap();
    let history_repo = new_repo(&dir).await;

    let err = collect_coin(&pool_repo, &history_repo, "kas")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no endpoint configured"));
}

#[test]
fn pool_repo_rejects_invalid_endpoint_url() {
    assert!(PoolRepo::new(&endpoints("btc", "not a url".to_string())).is_err());
}

#[test]
fn build_readings_classifies_and_skips_unnamed() {
    let entries = vec![
        WorkerEntry {
            worker: "B_01".to_string(),
            hashrate: 7.0,
            hashrate_1h: 6.0,
            hashrate_24h: 5.0,
            reject_rate: 0.1,
            status: "active".to_string(),
        },
        WorkerEntry {
            worker: String::new(),
            hashrate: 1.0,
            hashrate_1h: 1.0,
            hashrate_24h: 1.0,
            reject_rate: 0.0,
            status: "active".to_string(),
        },
        WorkerEntry {
            worker: "K_02_a".to_string(),
            hashrate: 0.0,
            hashrate_1h: 0.0,
            hashrate_24h: 0.0,
            reject_rate: 0.0,
            status: "offline?".to_string(),
        },
    ];

    let (readings, skipped) = build_readings(1_705_312_800, "kas", &entries);
    assert_eq!(skipped, 1);
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].worker_name, "B_01");
    assert_eq!(readings[0].rack, "B");
    assert_eq!(readings[0].timestamp, 1_705_312_800);
    assert_eq!(readings[0].coin_type, "kas");
    assert_eq!(readings[1].rack, "K_02");
    // Unrecognized pool status normalizes to unknown.
    assert_eq!(readings[1].status, WorkerStatus::Unknown);
}

#[test]
fn rollup_runs_only_at_its_hour() {
    let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap();
    assert_eq!(rollup_due(at(0, 59), 1, None), None);
    assert_eq!(rollup_due(at(2, 0), 1, None), None);

    // Due: aggregates the previous UTC day (leap day here).
    let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(rollup_due(at(1, 0), 1, None), Some(day));
    assert_eq!(rollup_due(at(1, 45), 1, None), Some(day));
}

#[test]
fn rollup_does_not_repeat_within_a_day() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 1, 30, 0).unwrap();
    let today = now.date_naive();
    let yesterday = today.pred_opt().unwrap();

    assert_eq!(rollup_due(now, 1, Some(today)), None);
    // A run recorded on an earlier day does not block today's.
    assert_eq!(rollup_due(now, 1, Some(yesterday)), Some(yesterday));
}

#[test]
fn rollup_crosses_year_boundary() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
    let expected = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    assert_eq!(rollup_due(now, 0, None), Some(expected));
}
