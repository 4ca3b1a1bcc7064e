// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod history_repo;
pub mod models;
pub mod pool_repo;
pub mod rack;
pub mod rollup;
pub mod routes;
