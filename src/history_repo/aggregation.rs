// Daily rollups: schema for the rollup tables + pure aggregation logic.
// DB access (readings by range, save, prune) stays in history_repo::mod.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DailyRackStat, DailyWorkerStat, Reading};
use sqlx::SqlitePool;

/// Creates the daily rollup tables if not present.
pub async fn init_rollup_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_worker_stats (
            date TEXT NOT NULL,
            worker_name TEXT NOT NULL,
            avg_hashrate REAL NOT NULL,
            max_hashrate REAL NOT NULL,
            min_hashrate REAL,
            uptime_percentage REAL NOT NULL,
            total_downtime_minutes REAL NOT NULL,
            avg_reject_rate REAL NOT NULL,
            coin_type TEXT NOT NULL,
            PRIMARY KEY (date, worker_name, coin_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_rack_stats (
            date TEXT NOT NULL,
            rack TEXT NOT NULL,
            avg_hashrate REAL NOT NULL,
            worker_count INTEGER NOT NULL,
            active_worker_count INTEGER NOT NULL,
            efficiency_percentage REAL NOT NULL,
            coin_type TEXT NOT NULL,
            PRIMARY KEY (date, rack, coin_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Rolls one day of readings into per-worker stats, grouped by
/// (coin_type, worker_name). Output is sorted by that key.
///
/// `period_minutes` is the sampling period; every non-active reading is
/// charged one period of downtime.
pub fn compute_worker_stats(
    date: &str,
    readings: &[Reading],
    period_minutes: f64,
) -> Vec<DailyWorkerStat> {
    let mut by_worker: BTreeMap<(&str, &str), Vec<&Reading>> = BTreeMap::new();
    for r in readings {
        by_worker
            .entry((r.coin_type.as_str(), r.worker_name.as_str()))
            .or_default()
            .push(r);
    }

    let mut out = Vec::with_capacity(by_worker.len());
    for ((coin_type, worker_name), group) in by_worker {
        let hashrates: Vec<f64> = group.iter().map(|r| r.hashrate).collect();
        let total = group.len() as i64;
        let active = group.iter().filter(|r| r.status.is_active()).count() as i64;

        out.push(DailyWorkerStat {
            date: date.to_string(),
            worker_name: worker_name.to_string(),
            avg_hashrate: mean_f64(&hashrates),
            max_hashrate: hashrates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_hashrate: positive_min(&hashrates),
            uptime_percentage: active as f64 * 100.0 / total as f64,
            total_downtime_minutes: (total - active) as f64 * period_minutes,
            avg_reject_rate: mean_f64(&group.iter().map(|r| r.reject_rate).collect::<Vec<_>>()),
            coin_type: coin_type.to_string(),
        });
    }
    out
}

/// Rolls one day of readings into per-rack stats, grouped by
/// (coin_type, rack). Worker counts are distinct names; a worker counts as
/// active when at least one of its readings that day is active.
pub fn compute_rack_stats(date: &str, readings: &[Reading]) -> Vec<DailyRackStat> {
    let mut by_rack: BTreeMap<(&str, &str), Vec<&Reading>> = BTreeMap::new();
    for r in readings {
        by_rack
            .entry((r.coin_type.as_str(), r.rack.as_str()))
            .or_default()
            .push(r);
    }

    let mut out = Vec::with_capacity(by_rack.len());
    for ((coin_type, rack), group) in by_rack {
        let workers: BTreeSet<&str> = group.iter().map(|r| r.worker_name.as_str()).collect();
        let active_workers: BTreeSet<&str> = group
            .iter()
            .filter(|r| r.status.is_active())
            .map(|r| r.worker_name.as_str())
            .collect();
        let worker_count = workers.len() as i64;
        let active_worker_count = active_workers.len() as i64;

        out.push(DailyRackStat {
            date: date.to_string(),
            rack: rack.to_string(),
            avg_hashrate: mean_f64(&group.iter().map(|r| r.hashrate).collect::<Vec<_>>()),
            worker_count,
            active_worker_count,
            efficiency_percentage: active_worker_count as f64 * 100.0 / worker_count as f64,
            coin_type: coin_type.to_string(),
        });
    }
    out
}

/// Minimum over strictly-positive samples; `None` when no sample is positive.
fn positive_min(values: &[f64]) -> Option<f64> {
    let min = values
        .iter()
        .copied()
        .filter(|v| *v > 0.0)
        .fold(f64::INFINITY, f64::min);
    min.is_finite().then_some(min)
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
