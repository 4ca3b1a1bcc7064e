// Per-worker telemetry reading as sampled from the pool API

use serde::{Deserialize, Serialize};

/// Worker liveness as reported by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Active,
    Inactive,
    Unknown,
}

impl WorkerStatus {
    /// Parses a pool-reported status string, case-insensitively.
    /// Anything unrecognized maps to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "active" => WorkerStatus::Active,
            "inactive" => WorkerStatus::Inactive,
            _ => WorkerStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Active => "active",
            WorkerStatus::Inactive => "inactive",
            WorkerStatus::Unknown => "unknown",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, WorkerStatus::Active)
    }
}

/// One sampled reading for a single worker on a single coin.
///
/// `timestamp` is Unix seconds (UTC). `rack` is assigned at collection
/// time from the worker name and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: i64,
    pub worker_name: String,
    pub hashrate: f64,
    pub hashrate_1h: f64,
    pub hashrate_24h: f64,
    pub reject_rate: f64,
    pub status: WorkerStatus,
    pub coin_type: String,
    pub rack: String,
}
