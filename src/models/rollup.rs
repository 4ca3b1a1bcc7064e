// Daily rollup rows

use serde::{Deserialize, Serialize};

/// One worker's aggregated stats for one UTC day.
///
/// `min_hashrate` only considers positive samples; it is `None` when the
/// worker never reported a positive hashrate that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWorkerStat {
    pub date: String,
    pub worker_name: String,
    pub avg_hashrate: f64,
    pub max_hashrate: f64,
    pub min_hashrate: Option<f64>,
    pub uptime_percentage: f64,
    pub total_downtime_minutes: f64,
    pub avg_reject_rate: f64,
    pub coin_type: String,
}

/// One rack's aggregated stats for one UTC day.
///
/// Worker counts are distinct worker names, not reading counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRackStat {
    pub date: String,
    pub rack: String,
    pub avg_hashrate: f64,
    pub worker_count: i64,
    pub active_worker_count: i64,
    pub efficiency_percentage: f64,
    pub coin_type: String,
}
