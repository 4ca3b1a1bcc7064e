// Upstream pool API client

mod wire;

pub use wire::WorkerEntry;

use anyhow::Context;
use reqwest::Url;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no endpoint configured for coin `{0}`")]
    UnknownCoin(String),
    #[error("pool request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed pool response: {0}")]
    Malformed(String),
}

pub struct PoolRepo {
    client: reqwest::Client,
    endpoints: BTreeMap<String, Url>,
}

impl PoolRepo {
    pub fn new(endpoints: &BTreeMap<String, String>) -> anyhow::Result<Self> {
        let mut parsed = BTreeMap::new();
        for (coin, raw) in endpoints {
            let url = Url::parse(raw)
                .with_context(|| format!("invalid endpoint URL for coin `{coin}`: {raw}"))?;
            parsed.insert(coin.clone(), url);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoints: parsed,
        })
    }

    /// Coins with a configured endpoint, in stable order.
    pub fn coins(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    /// Fetches the current worker list for one coin.
    #[instrument(skip(self), fields(repo = "pool", operation = "fetch_workers"))]
    pub async fn fetch_workers(&self, coin: &str) -> Result<Vec<WorkerEntry>, FetchError> {
        let url = self
            .endpoints
            .get(coin)
            .ok_or_else(|| FetchError::UnknownCoin(coin.to_string()))?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.json::<serde_json::Value>().await?;
        wire::parse_workers_body(&body)
    }
}
