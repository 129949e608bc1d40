//! Binance spot REST client (24h ticker and klines).

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::base_asset;
use crate::fusion::MarketSnapshot;
use crate::utils::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    price_change_percent: String,
    volume: String,
    high_price: String,
    low_price: String,
}

#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

/// `BTC`, `BTC-USD` and `BTCUSDT` all trade as `BTCUSDT`.
pub fn pair_for(symbol: &str) -> String {
    format!("{}USDT", base_asset(symbol))
}

fn parse_num(field: &str, raw: &str) -> Result<f64> {
    raw.parse().map_err(|_| Error::DataError(format!("Binance {field} is not a number: {raw:?}")))
}

impl BinanceClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;
        if !resp.status().is_success() {
            return Err(Error::DataError(format!("Binance HTTP {} for {}", resp.status(), url)));
        }
        Ok(resp)
    }

    /// 24h rolling statistics as a market snapshot.
    pub async fn ticker_24h(&self, symbol: &str) -> Result<MarketSnapshot> {
        let pair = pair_for(symbol);
        let ticker: Ticker24h = self.get("/api/v3/ticker/24hr", &[("symbol", pair.as_str())]).await?.json().await?;
        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            price: parse_num("lastPrice", &ticker.last_price)?,
            volume: parse_num("volume", &ticker.volume)?,
            price_change_pct: parse_num("priceChangePercent", &ticker.price_change_percent)?,
            high_24h: ticker.high_price.parse().ok(),
            low_24h: ticker.low_price.parse().ok(),
            history: Vec::new(),
        })
    }

    /// Close prices of the last `limit` klines, oldest first.
    pub async fn closes(&self, symbol: &str, interval: &str, limit: u16) -> Result<Vec<f64>> {
        let pair = pair_for(symbol);
        let limit = limit.to_string();
        let rows: Vec<Vec<Value>> = self
            .get("/api/v3/klines", &[("symbol", pair.as_str()), ("interval", interval), ("limit", limit.as_str())])
            .await?
            .json()
            .await?;
        Ok(parse_kline_closes(&rows))
    }
}

// kline row: [open_time, open, high, low, close, volume, ...]
fn parse_kline_closes(rows: &[Vec<Value>]) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(4)?.as_str()?.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pairs_quote_in_usdt() {
        assert_eq!(pair_for("btc"), "BTCUSDT");
        assert_eq!(pair_for("ETH-USD"), "ETHUSDT");
        assert_eq!(pair_for("SOLUSDT"), "SOLUSDT");
    }

    #[test]
    fn kline_close_is_fifth_column() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            [1, "1.0", "2.0", "0.5", "1.5", "10"],
            [2, "1.5", "2.5", "1.0", "2.25", "12"],
            [3]
        ]))
        .unwrap();
        assert_eq!(parse_kline_closes(&rows), vec![1.5, 2.25]);
    }

    #[test]
    fn ticker_shape_deserializes() {
        let t: Ticker24h = serde_json::from_value(json!({
            "symbol": "BTCUSDT", "lastPrice": "65000.1", "priceChangePercent": "-2.5",
            "volume": "1234.5", "highPrice": "66000", "lowPrice": "64000"
        }))
        .unwrap();
        assert_eq!(parse_num("lastPrice", &t.last_price).unwrap(), 65000.1);
    }
}
