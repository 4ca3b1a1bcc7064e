// Collection scheduler: polls the pool API per coin on a fixed period,
// runs the daily rollup at the configured UTC hour, and triggers VACUUM
// on an optional cron schedule.

use crate::history_repo::HistoryRepo;
use crate::models::{Reading, WorkerStatus};
use crate::pool_repo::{PoolRepo, WorkerEntry};
use crate::rack;
use crate::rollup;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Repos and shutdown for the collection loop.
pub struct CollectorDeps {
    pub pool_repo: Arc<PoolRepo>,
    pub history_repo: Arc<HistoryRepo>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Timing config for the collection loop.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub collect_interval_secs: u64,
    /// UTC hour (0-23) at which the daily rollup runs.
    pub rollup_hour: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily).
    /// Uses local time; unset disables VACUUM.
    pub vacuum_schedule: Option<String>,
}

/// Per-coin collection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOutcome {
    pub stored: usize,
    pub skipped: usize,
    pub fallback_racks: usize,
}

/// Spawns the collection loop. The first collection runs immediately;
/// later cycles fire every `collect_interval_secs`, skipping missed ticks.
pub fn spawn(deps: CollectorDeps, config: ScheduleConfig) -> tokio::task::JoinHandle<()> {
    let CollectorDeps {
        pool_repo,
        history_repo,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(config.collect_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
        tokio::spawn(vacuum_scheduler(config.vacuum_schedule.clone(), vacuum_tx));

        let mut last_rollup: Option<NaiveDate> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    for coin in pool_repo.coins() {
                        match collect_coin(&pool_repo, &history_repo, &coin).await {
                            Ok(outcome) => {
                                info!(
                                    coin = %coin,
                                    stored = outcome.stored,
                                    skipped = outcome.skipped,
                                    fallback_racks = outcome.fallback_racks,
                                    "collection cycle complete"
                                );
                            }
                            Err(e) => {
                                warn!(coin = %coin, error = %e, "collection cycle failed");
                            }
                        }
                    }

                    let now = Utc::now();
                    if let Some(day) = rollup_due(now, config.rollup_hour, last_rollup) {
                        match rollup::run_daily_rollup(
                            &history_repo,
                            day,
                            config.collect_interval_secs,
                        )
                        .await
                        {
                            Ok(_) => {
                                last_rollup = Some(now.date_naive());
                            }
                            Err(e) => {
                                warn!(error = %e, "daily rollup failed");
                            }
                        }
                    }
                }
                _ = vacuum_rx.recv() => {
                    if let Err(e) = history_repo.vacuum().await {
                        warn!(error = %e, "vacuum failed");
                    } else {
                        info!("vacuum complete");
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Collector shutting down");
                    break;
                }
            }
        }
    })
}

/// Fetches one coin's worker list and writes the batch in one transaction.
/// On any error nothing is written and the cycle is reported failed.
pub async fn collect_coin(
    pool_repo: &PoolRepo,
    history_repo: &HistoryRepo,
    coin: &str,
) -> anyhow::Result<CollectOutcome> {
    let entries = pool_repo.fetch_workers(coin).await?;
    let timestamp = Utc::now().timestamp();
    let (readings, skipped) = build_readings(timestamp, coin, &entries);
    let fallback_racks = readings
        .iter()
        .filter(|r| r.rack == rack::FALLBACK_RACK)
        .count();
    history_repo.save_readings(&readings).await?;
    Ok(CollectOutcome {
        stored: readings.len(),
        skipped,
        fallback_racks,
    })
}

/// Stages readings out of fetched entries: classifies racks and normalizes
/// status. Entries without a worker name are dropped; the count of drops is
/// returned alongside.
pub fn build_readings(
    timestamp: i64,
    coin: &str,
    entries: &[WorkerEntry],
) -> (Vec<Reading>, usize) {
    let mut readings = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for e in entries {
        if e.worker.is_empty() {
            skipped += 1;
            continue;
        }
        readings.push(Reading {
            timestamp,
            worker_name: e.worker.clone(),
            hashrate: e.hashrate,
            hashrate_1h: e.hashrate_1h,
            hashrate_24h: e.hashrate_24h,
            reject_rate: e.reject_rate,
            status: WorkerStatus::parse(&e.status),
            coin_type: coin.to_string(),
            rack: rack::classify(&e.worker),
        });
    }
    (readings, skipped)
}

/// Decides whether the daily rollup should run now. Returns the day to
/// aggregate (the previous UTC day) when the current UTC hour matches
/// `rollup_hour` and `last_run` has not recorded today. A day whose trigger
/// hour passed without a successful run is not caught up later.
pub fn rollup_due(
    now: DateTime<Utc>,
    rollup_hour: u32,
    last_run: Option<NaiveDate>,
) -> Option<NaiveDate> {
    let today = now.date_naive();
    if now.hour() != rollup_hour || last_run == Some(today) {
        return None;
    }
    today.pred_opt()
}

/// Sends on `tx` at each VACUUM time (cron expression, local time).
async fn vacuum_scheduler(schedule: Option<String>, tx: tokio::sync::mpsc::Sender<()>) {
    let Some(cron_str) = schedule else {
        return;
    };
    let Ok(schedule) = cron::Schedule::from_str(&cron_str) else {
        warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
        return;
    };
    loop {
        let now = chrono::Local::now();
        let Some(next) = schedule.after(&now).next() else {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            continue;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        tokio::time::sleep(delay).await;
        if tx.send(()).await.is_err() {
            break;
        }
    }
}
