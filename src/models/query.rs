// Read-path aggregate rows computed by SQL queries

use serde::{Deserialize, Serialize};

/// One time bucket of averaged hashrate history.
///
/// `time_period` is `YYYY-MM-DD HH:00` for hourly buckets and
/// `YYYY-MM-DD` for daily ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashrateBucket {
    pub time_period: String,
    pub avg_hashrate: f64,
    pub avg_hashrate_1h: f64,
    pub avg_hashrate_24h: f64,
    pub uptime_percentage: f64,
}

/// Per-worker aggregates over an arbitrary query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPeriodStat {
    pub worker_name: String,
    pub avg_hashrate: f64,
    pub max_hashrate: f64,
    pub min_hashrate: Option<f64>,
    pub total_readings: i64,
    pub active_readings: i64,
    pub avg_reject_rate: f64,
}

impl WorkerPeriodStat {
    pub fn uptime_percentage(&self) -> f64 {
        if self.total_readings == 0 {
            return 0.0;
        }
        self.active_readings as f64 * 100.0 / self.total_readings as f64
    }

    /// Downtime implied by inactive readings, given the sampling period.
    pub fn downtime_minutes(&self, period_minutes: f64) -> f64 {
        (self.total_readings - self.active_readings) as f64 * period_minutes
    }
}

/// Per-rack aggregates over an arbitrary query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackPeriodStat {
    pub rack: String,
    pub avg_hashrate: f64,
    pub worker_count: i64,
    pub active_worker_count: i64,
    pub efficiency_percentage: f64,
}
