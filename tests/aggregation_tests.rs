// Daily rollup math: per-worker and per-rack aggregation over one day

use minerhist::history_repo::aggregation::{compute_rack_stats, compute_worker_stats};
use minerhist::models::WorkerStatus;

mod common;
use common::reading;

#[test]
fn empty_day_yields_no_rows() {
    assert!(compute_worker_stats("2024-01-15", &[], 15.0).is_empty());
    assert!(compute_rack_stats("2024-01-15", &[]).is_empty());
}

#[test]
fn worker_avg_max_and_positive_min() {
    let readings = vec![
        reading(1, "B_01", 0.0, WorkerStatus::Active),
        reading(2, "B_01", 0.0, WorkerStatus::Active),
        reading(3, "B_01", 50.0, WorkerStatus::Active),
        reading(4, "B_01", 30.0, WorkerStatus::Active),
    ];
    let stats = compute_worker_stats("2024-01-15", &readings, 15.0);
    assert_eq!(stats.len(), 1);
    let s = &stats[0];
    assert_eq!(s.date, "2024-01-15");
    assert_eq!(s.worker_name, "B_01");
    assert_eq!(s.avg_hashrate, 20.0);
    assert_eq!(s.max_hashrate, 50.0);
    // Zero samples are dropped from the minimum.
    assert_eq!(s.min_hashrate, Some(30.0));
}

#[test]
fn min_is_none_when_worker_never_hashed() {
    let readings = vec![
        reading(1, "B_01", 0.0, WorkerStatus::Inactive),
        reading(2, "B_01", 0.0, WorkerStatus::Inactive),
    ];
    let stats = compute_worker_stats("2024-01-15", &readings, 15.0);
    assert_eq!(stats[0].min_hashrate, None);
    assert_eq!(stats[0].max_hashrate, 0.0);
}

#[test]
fn uptime_and_downtime_follow_status_counts() {
    let mut readings = Vec::new();
    for i in 0..8 {
        readings.push(reading(i, "CH_01", 100.0, WorkerStatus::Active));
    }
    readings.push(reading(8, "CH_01", 0.0, WorkerStatus::Inactive));
    readings.push(reading(9, "CH_01", 0.0, WorkerStatus::Unknown));

    let stats = compute_worker_stats("2024-01-15", &readings, 15.0);
    let s = &stats[0];
    assert_eq!(s.uptime_percentage, 80.0);
    // Two non-active samples, one period each.
    assert_eq!(s.total_downtime_minutes, 30.0);
}

#[test]
fn reject_rate_is_averaged() {
    let mut a = reading(1, "B_01", 100.0, WorkerStatus::Active);
    a.reject_rate = 1.0;
    let mut b = reading(2, "B_01", 100.0, WorkerStatus::Active);
    b.reject_rate = 3.0;
    let stats = compute_worker_stats("2024-01-15", &[a, b], 15.0);
    assert_eq!(stats[0].avg_reject_rate, 2.0);
}

#[test]
fn workers_split_by_coin_and_sorted() {
    let mut kas = reading(1, "B_01", 5.0, WorkerStatus::Active);
    kas.coin_type = "kas".to_string();
    let readings = vec![
        reading(1, "CH_02", 1.0, WorkerStatus::Active),
        reading(1, "B_01", 2.0, WorkerStatus::Active),
        kas,
    ];
    let stats = compute_worker_stats("2024-01-15", &readings, 15.0);
    let keys: Vec<(&str, &str)> = stats
        .iter()
        .map(|s| (s.coin_type.as_str(), s.worker_name.as_str()))
        .collect();
    // Same worker name under two coins stays two rows.
    assert_eq!(keys, vec![("btc", "B_01"), ("btc", "CH_02"), ("kas", "B_01")]);
}

#[test]
fn rack_counts_are_distinct_workers() {
    // B_01 reports twice, must count once.
    let readings = vec![
        reading(1, "B_01", 10.0, WorkerStatus::Active),
        reading(2, "B_01", 20.0, WorkerStatus::Active),
        reading(1, "B_02", 30.0, WorkerStatus::Inactive),
    ];
    let stats = compute_rack_stats("2024-01-15", &readings);
    assert_eq!(stats.len(), 1);
    let s = &stats[0];
    assert_eq!(s.rack, "B");
    assert_eq!(s.worker_count, 2);
    assert_eq!(s.active_worker_count, 1);
    assert_eq!(s.efficiency_percentage, 50.0);
    assert_eq!(s.avg_hashrate, 20.0);
}

#[test]
fn worker_with_any_active_reading_counts_as_active() {
    let readings = vec![
        reading(1, "D_01", 0.0, WorkerStatus::Inactive),
        reading(2, "D_01", 90.0, WorkerStatus::Active),
    ];
    let stats = compute_rack_stats("2024-01-15", &readings);
    assert_eq!(stats[0].worker_count, 1);
    assert_eq!(stats[0].active_worker_count, 1);
    assert_eq!(stats[0].efficiency_percentage, 100.0);
}

#[test]
fn racks_split_by_coin() {
    let mut kas = reading(1, "B_09", 5.0, WorkerStatus::Active);
    kas.coin_type = "kas".to_string();
    let readings = vec![reading(1, "B_01", 1.0, WorkerStatus::Active), kas];
    let stats = compute_rack_stats("2024-01-15", &readings);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].coin_type, "btc");
    assert_eq!(stats[1].coin_type, "kas");
}

#[test]
fn fallback_rack_is_aggregated_like_any_other() {
    let readings = vec![
        reading(1, "ZZ_top", 7.0, WorkerStatus::Active),
        reading(1, "weird", 9.0, WorkerStatus::Active),
    ];
    let stats = compute_rack_stats("2024-01-15", &readings);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].rack, "others");
    assert_eq!(stats[0].worker_count, 2);
}
