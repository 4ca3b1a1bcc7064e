// HTTP routes for the read API

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::history_repo::HistoryRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) history_repo: Arc<HistoryRepo>,
    pub(crate) config: AppConfig,
}

pub fn app(history_repo: Arc<HistoryRepo>, config: AppConfig) -> Router {
    let state = AppState {
        history_repo,
        config,
    };
    Router::new()
        .route("/", get(|| async { "minerhist: mining history API" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/workers", get(http::workers_handler)) // GET /api/workers
        .route("/api/racks", get(http::racks_handler)) // GET /api/racks
        .route("/api/history/hashrate", get(http::hashrate_history_handler)) // GET /api/history/hashrate
        .route("/api/stats/miners", get(http::stats_miners_handler)) // GET /api/stats/miners
        .route("/api/stats/racks", get(http::stats_racks_handler)) // GET /api/stats/racks
        .route("/api/rollups/workers", get(http::rollups_workers_handler)) // GET /api/rollups/workers
        .route("/api/rollups/racks", get(http::rollups_racks_handler)) // GET /api/rollups/racks
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
