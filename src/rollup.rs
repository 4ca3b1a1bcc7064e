// Daily rollup pass: aggregate one day of readings, upsert, then prune.

use crate::history_repo::{HistoryRepo, aggregation};
use chrono::{NaiveDate, NaiveTime};
use tracing::info;

/// What one rollup pass produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupOutcome {
    pub worker_rows: usize,
    pub rack_rows: usize,
    pub pruned_readings: u64,
}

/// Aggregates one UTC day of readings into the rollup tables, then prunes
/// readings past the retention horizon. The prune runs only after the
/// rollup upserts commit, so detail rows are never dropped before their
/// summary exists. Re-running for the same day replaces the prior rollups.
pub async fn run_daily_rollup(
    repo: &HistoryRepo,
    day: NaiveDate,
    collect_interval_secs: u64,
) -> anyhow::Result<RollupOutcome> {
    let date = day.format("%Y-%m-%d").to_string();
    let day_start = day.and_time(NaiveTime::MIN).and_utc().timestamp();
    let day_end = day_start + 24 * 60 * 60;

    let readings = repo.get_readings_by_time_range(day_start, day_end).await?;
    let period_minutes = collect_interval_secs as f64 / 60.0;
    let worker_stats = aggregation::compute_worker_stats(&date, &readings, period_minutes);
    let rack_stats = aggregation::compute_rack_stats(&date, &readings);
    repo.save_daily_stats(&worker_stats, &rack_stats).await?;

    let pruned_readings = repo.prune_old_readings().await?;

    info!(
        date = %date,
        readings = readings.len(),
        worker_rows = worker_stats.len(),
        rack_rows = rack_stats.len(),
        pruned_readings,
        "daily rollup complete"
    );

    Ok(RollupOutcome {
        worker_rows: worker_stats.len(),
        rack_rows: rack_stats.len(),
        pruned_readings,
    })
}
