// GET handlers: version, workers/racks, hashrate history, period stats,
// daily rollups. Hashrates are stored raw and scaled here only.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::history_repo::HistoryInterval;

const DEFAULT_COIN: &str = "btc";

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(msg: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
}

fn internal_error(e: anyhow::Error) -> ApiError {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
}

/// Presentation scale: TH/s for btc, GH/s otherwise.
fn hashrate_divisor(coin: &str) -> f64 {
    if coin == "btc" { 1e12 } else { 1e9 }
}

/// "all" and absent both mean no filter.
fn filter_param(value: Option<&str>) -> Option<&str> {
    value.filter(|v| *v != "all")
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| bad_request("dates must be YYYY-MM-DD"))
}

/// Parses "YYYY-MM-DD" as UTC midnight.
fn parse_date_start(raw: &str) -> Result<i64, ApiError> {
    Ok(parse_date(raw)?.and_time(NaiveTime::MIN).and_utc().timestamp())
}

fn period_secs(period: Option<&str>) -> i64 {
    match period {
        Some("day") => 24 * 60 * 60,
        Some("week") => 7 * 24 * 60 * 60,
        _ => 30 * 24 * 60 * 60,
    }
}

/// Validated "YYYY-MM-DD" range for rollup queries; defaults to the last
/// 30 days ending today (UTC).
fn rollup_date_range(start: Option<&str>, end: Option<&str>) -> Result<(String, String), ApiError> {
    let today = Utc::now().date_naive();
    let from = match start {
        Some(raw) => parse_date(raw)?,
        None => today - Days::new(30),
    };
    let to = match end {
        Some(raw) => parse_date(raw)?,
        None => today,
    };
    Ok((
        from.format("%Y-%m-%d").to_string(),
        to.format("%Y-%m-%d").to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct CoinQuery {
    coin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    coin: Option<String>,
    worker: Option<String>,
    rack: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PeriodQuery {
    coin: Option<String>,
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RollupQuery {
    coin: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(super) async fn workers_handler(
    State(state): State<AppState>,
    Query(q): Query<CoinQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let coin = q.coin.as_deref().unwrap_or(DEFAULT_COIN);
    let workers = state
        .history_repo
        .distinct_workers(coin)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "workers": workers })))
}

pub(super) async fn racks_handler(
    State(state): State<AppState>,
    Query(q): Query<CoinQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let coin = q.coin.as_deref().unwrap_or(DEFAULT_COIN);
    let racks = state
        .history_repo
        .distinct_racks(coin)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "racks": racks })))
}

/// GET /api/history/hashrate — time-bucketed hashrate averages, grouped
/// hourly or daily, optionally filtered to one worker or rack (worker wins).
/// Defaults to the last 7 days.
pub(super) async fn hashrate_history_handler(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(coin) = q.coin.as_deref() else {
        return Err(bad_request("coin parameter is required"));
    };

    let now = Utc::now().timestamp();
    let from_ts = match q.start_date.as_deref() {
        Some(raw) => parse_date_start(raw)?,
        None => now - 7 * 24 * 60 * 60,
    };
    let to_ts = match q.end_date.as_deref() {
        Some(raw) => parse_date_start(raw)?,
        None => now,
    };
    let interval = q
        .interval
        .as_deref()
        .and_then(HistoryInterval::parse)
        .unwrap_or(HistoryInterval::Day);

    let buckets = state
        .history_repo
        .hashrate_history(
            coin,
            filter_param(q.worker.as_deref()),
            filter_param(q.rack.as_deref()),
            from_ts,
            to_ts,
            interval,
        )
        .await
        .map_err(internal_error)?;

    let divisor = hashrate_divisor(coin);
    let data: Vec<_> = buckets
        .into_iter()
        .map(|b| {
            json!({
                "time_period": b.time_period,
                "avg_hashrate": b.avg_hashrate / divisor,
                "avg_hashrate_1h": b.avg_hashrate_1h / divisor,
                "avg_hashrate_24h": b.avg_hashrate_24h / divisor,
                "uptime_percentage": b.uptime_percentage,
            })
        })
        .collect();
    Ok(Json(json!({ "data": data })))
}

/// Per-worker summary over the trailing period (day | week | month,
/// default month), sorted by average hashrate.
pub(super) async fn stats_miners_handler(
    State(state): State<AppState>,
    Query(q): Query<PeriodQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(coin) = q.coin.as_deref() else {
        return Err(bad_request("coin parameter is required"));
    };
    let to_ts = Utc::now().timestamp();
    let from_ts = to_ts - period_secs(q.period.as_deref());

    let stats = state
        .history_repo
        .worker_period_stats(coin, from_ts, to_ts)
        .await
        .map_err(internal_error)?;

    let divisor = hashrate_divisor(coin);
    let period_minutes = state.config.collector.collect_interval_secs as f64 / 60.0;
    let data: Vec<_> = stats
        .into_iter()
        .map(|s| {
            json!({
                "name": s.worker_name,
                "avg_hashrate": s.avg_hashrate / divisor,
                "max_hashrate": s.max_hashrate / divisor,
                "min_hashrate": s.min_hashrate.map_or(0.0, |m| m / divisor),
                "uptime_percentage": s.uptime_percentage(),
                "downtime_hours": s.downtime_minutes(period_minutes) / 60.0,
                "reject_rate": s.avg_reject_rate,
            })
        })
        .collect();
    Ok(Json(json!({ "data": data })))
}

/// Per-rack summary; hashrate is presented as the rack total (average
/// times worker count).
pub(super) async fn stats_racks_handler(
    State(state): State<AppState>,
    Query(q): Query<PeriodQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(coin) = q.coin.as_deref() else {
        return Err(bad_request("coin parameter is required"));
    };
    let to_ts = Utc::now().timestamp();
    let from_ts = to_ts - period_secs(q.period.as_deref());

    let stats = state
        .history_repo
        .rack_period_stats(coin, from_ts, to_ts)
        .await
        .map_err(internal_error)?;

    let divisor = hashrate_divisor(coin);
    let data: Vec<_> = stats
        .into_iter()
        .map(|s| {
            json!({
                "name": s.rack,
                "avg_hashrate": s.avg_hashrate * s.worker_count as f64 / divisor,
                "worker_count": s.worker_count,
                "active_worker_count": s.active_worker_count,
                "efficiency_percentage": s.efficiency_percentage,
            })
        })
        .collect();
    Ok(Json(json!({ "data": data })))
}

pub(super) async fn rollups_workers_handler(
    State(state): State<AppState>,
    Query(q): Query<RollupQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(coin) = q.coin.as_deref() else {
        return Err(bad_request("coin parameter is required"));
    };
    let (from_date, to_date) = rollup_date_range(q.start_date.as_deref(), q.end_date.as_deref())?;

    let rows = state
        .history_repo
        .daily_worker_stats(coin, &from_date, &to_date)
        .await
        .map_err(internal_error)?;

    let divisor = hashrate_divisor(coin);
    let data: Vec<_> = rows
        .into_iter()
        .map(|r| {
            json!({
                "date": r.date,
                "name": r.worker_name,
                "avg_hashrate": r.avg_hashrate / divisor,
                "max_hashrate": r.max_hashrate / divisor,
                "min_hashrate": r.min_hashrate.map_or(0.0, |m| m / divisor),
                "uptime_percentage": r.uptime_percentage,
                "total_downtime_minutes": r.total_downtime_minutes,
                "avg_reject_rate": r.avg_reject_rate,
            })
        })
        .collect();
    Ok(Json(json!({ "data": data })))
}

pub(super) async fn rollups_racks_handler(
    State(state): State<AppState>,
    Query(q): Query<RollupQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(coin) = q.coin.as_deref() else {
        return Err(bad_request("coin parameter is required"));
    };
    let (from_date, to_date) = rollup_date_range(q.start_date.as_deref(), q.end_date.as_deref())?;

    let rows = state
        .history_repo
        .daily_rack_stats(coin, &from_date, &to_date)
        .await
        .map_err(internal_error)?;

    let divisor = hashrate_divisor(coin);
    let data: Vec<_> = rows
        .into_iter()
        .map(|r| {
            json!({
                "date": r.date,
                "name": r.rack,
                "avg_hashrate": r.avg_hashrate / divisor,
                "worker_count": r.worker_count,
                "active_worker_count": r.active_worker_count,
                "efficiency_percentage": r.efficiency_percentage,
            })
        })
        .collect();
    Ok(Json(json!({ "data": data })))
}
