// Wire format of the pool workers endpoint

use super::FetchError;
use serde_json::Value;

/// One worker entry as decoded from the pool response.
///
/// Missing or non-numeric fields decode as zero; a missing status
/// decodes as an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerEntry {
    pub worker: String,
    pub hashrate: f64,
    pub hashrate_1h: f64,
    pub hashrate_24h: f64,
    pub reject_rate: f64,
    pub status: String,
}

/// Decodes the worker list out of a pool response body.
///
/// The pool wraps the list in a `details` field; everything else in the
/// body is ignored.
pub fn parse_workers_body(body: &Value) -> Result<Vec<WorkerEntry>, FetchError> {
    let details = body
        .get("details")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed("missing or non-list `details` field".to_string()))?;
    Ok(details.iter().map(entry_from_value).collect())
}

fn entry_from_value(v: &Value) -> WorkerEntry {
    WorkerEntry {
        worker: v["worker"].as_str().unwrap_or_default().to_string(),
        hashrate: v["hashrate"].as_f64().unwrap_or(0.0),
        hashrate_1h: v["hashrate1h"].as_f64().unwrap_or(0.0),
        hashrate_24h: v["hashrate24h"].as_f64().unwrap_or(0.0),
        reject_rate: v["reject"].as_f64().unwrap_or(0.0),
        status: v["new_status"].as_str().unwrap_or_default().to_string(),
    }
}
