//! Polymarket gamma API client.
//!
//! Outcome token prices are the market's probabilities. The gamma API reports
//! them either as `tokens: [{outcome, price}]` or as the parallel
//! `outcomes` / `outcomePrices` lists, the latter often JSON-encoded strings.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::fusion::{EventOdds, SourceTag};
use crate::utils::error::{Error, Result};

/// Short listing entry returned by market search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub id: String,
    pub slug: String,
    pub question: String,
    pub volume: f64,
    pub yes_probability: f64,
}

#[derive(Debug, Clone)]
pub struct PolymarketClient {
    client: Client,
    base_url: String,
}

impl PolymarketClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let resp = self.client.get(url).query(query).send().await?;
        if !resp.status().is_success() {
            return Err(Error::DataError(format!("Polymarket HTTP {} for {}", resp.status(), url)));
        }
        Ok(resp.json::<Value>().await?)
    }

    /// Odds of one market, addressed by numeric id or slug.
    pub async fn market_odds(&self, market_id: &str) -> Result<EventOdds> {
        let market = if market_id.chars().all(|c| c.is_ascii_digit()) {
            self.get_json(&format!("{}/markets/{}", self.base_url, market_id), &[]).await?
        } else {
            let list = self.get_json(&format!("{}/markets", self.base_url), &[("slug", market_id)]).await?;
            list.as_array()
                .and_then(|l| l.first().cloned())
                .ok_or_else(|| Error::DataError(format!("no Polymarket market with slug {market_id}")))?
        };
        parse_market(market_id, &market)
    }

    /// Active markets matching a free-text query.
    pub async fn search_markets(&self, query: &str, limit: usize) -> Result<Vec<MarketSummary>> {
        let limit = limit.to_string();
        let body = self
            .get_json(
                &format!("{}/markets", self.base_url),
                &[("active", "true"), ("closed", "false"), ("limit", limit.as_str()), ("order", "volume"), ("ascending", "false")],
            )
            .await?;
        let needle = query.to_lowercase();
        let markets = body.as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(markets
            .iter()
            .filter_map(summarize)
            .filter(|m| needle.is_empty() || m.question.to_lowercase().contains(&needle) || m.slug.contains(&needle))
            .collect())
    }
}

fn lenient_f64(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Lists that may arrive JSON-encoded inside a string.
fn string_list(v: Option<&Value>) -> Vec<String> {
    let decoded;
    let arr = match v {
        Some(Value::Array(a)) => a,
        Some(Value::String(s)) => {
            decoded = serde_json::from_str::<Vec<Value>>(s).unwrap_or_default();
            &decoded
        }
        _ => return Vec::new(),
    };
    arr.iter()
        .map(|x| match x {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

/// (outcome label, price) pairs from either response shape.
fn outcome_prices(market: &Value) -> Vec<(String, f64)> {
    if let Some(tokens) = market.get("tokens").and_then(Value::as_array) {
        if !tokens.is_empty() {
            return tokens
                .iter()
                .filter_map(|t| {
                    let outcome = t.get("outcome")?.as_str()?.to_string();
                    Some((outcome, lenient_f64(t.get("price"))?))
                })
                .collect();
        }
    }
    let outcomes = string_list(market.get("outcomes"));
    let prices = string_list(market.get("outcomePrices"));
    outcomes
        .into_iter()
        .zip(prices)
        .filter_map(|(o, p)| Some((o, p.parse().ok()?)))
        .collect()
}

fn side_price(prices: &[(String, f64)], label: &str) -> Option<f64> {
    prices
        .iter()
        .find(|(outcome, _)| outcome.to_lowercase().contains(label))
        .map(|(_, p)| *p)
        .filter(|p| (0.0..=1.0).contains(p))
}

/// A market without a usable YES price is a malformed response.
fn parse_market(market_id: &str, market: &Value) -> Result<EventOdds> {
    let prices = outcome_prices(market);
    let yes = side_price(&prices, "yes")
        .ok_or_else(|| Error::DataError(format!("Polymarket market {market_id} has no YES price")))?;
    let text = |key: &str| market.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(EventOdds {
        source: SourceTag::Polymarket,
        market_id: market_id.to_string(),
        title: text("question"),
        description: text("description"),
        yes_probability: yes,
        no_probability: side_price(&prices, "no").unwrap_or(1.0 - yes),
        volume: lenient_f64(market.get("volume")).unwrap_or(0.0),
        liquidity: lenient_f64(market.get("liquidity")).unwrap_or(0.0),
        close_time: market.get("endDate").and_then(Value::as_str).map(str::to_string),
        active: market.get("active").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn summarize(market: &Value) -> Option<MarketSummary> {
    let text = |key: &str| market.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let id = match market.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    Some(MarketSummary {
        id,
        slug: text("slug"),
        question: text("question"),
        volume: lenient_f64(market.get("volume")).unwrap_or(0.0),
        yes_probability: side_price(&outcome_prices(market), "yes")?,
    })
}
