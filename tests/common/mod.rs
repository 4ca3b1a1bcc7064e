// Shared test helpers

use minerhist::models::{Reading, WorkerStatus};
use minerhist::rack;

/// Builds a reading with the rack derived from the worker name, the way
/// the collector does it. Tests that need a different coin or reject
/// rate mutate the returned value.
pub fn reading(timestamp: i64, worker: &str, hashrate: f64, status: WorkerStatus) -> Reading {
    Reading {
        timestamp,
        worker_name: worker.to_string(),
        hashrate,
        hashrate_1h: hashrate,
        hashrate_24h: hashrate,
        reject_rate: 0.0,
        status,
        coin_type: "btc".to_string(),
        rack: rack::classify(worker),
    }
}
