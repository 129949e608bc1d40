//! DeFiLlama client.

use reqwest::Client;
use serde::Deserialize;

use crate::utils::error::{Error, Result};

/// One daily point of a chain's TVL history.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TvlPoint {
    pub date: i64,
    pub tvl: f64,
}

#[derive(Debug, Clone)]
pub struct DefiLlamaClient {
    client: Client,
    base_url: String,
}

impl DefiLlamaClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// Daily TVL history of `chain`, oldest first.
    pub async fn chain_tvl_history(&self, chain: &str) -> Result<Vec<TvlPoint>> {
        let url = format!("{}/v2/historicalChainTvl/{}", self.base_url, chain);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::DataError(format!("DeFiLlama HTTP {} for {}", resp.status(), chain)));
        }
        let points = resp.json::<Vec<TvlPoint>>().await?;
        if points.is_empty() {
            return Err(Error::DataError(format!("DeFiLlama returned no TVL history for {chain}")));
        }
        Ok(points)
    }

    /// Latest TVL of `chain`.
    pub async fn current_tvl(&self, chain: &str) -> Result<f64> {
        let points = self.chain_tvl_history(chain).await?;
        points
            .last()
            .map(|p| p.tvl)
            .ok_or_else(|| Error::DataError(format!("no TVL for {chain}")))
    }
}

/// Latest TVL and its percentage change against the previous point.
///
/// Needs at least two points; the change is 0 when the previous value is not
/// positive.
pub fn tvl_change(points: &[TvlPoint]) -> Option<(f64, f64)> {
    let [.., prev, last] = points else {
        return None;
    };
    let change = if prev.tvl > 0.0 { (last.tvl - prev.tvl) / prev.tvl * 100.0 } else { 0.0 };
    Some((last.tvl, change))
}
