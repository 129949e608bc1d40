//! Yahoo Finance client (quoteSummary and chart endpoints).

use reqwest::Client;
use serde_json::Value;

use crate::utils::error::{Error, Result};

const SUMMARY_MODULES: &str = "defaultKeyStatistics,financialData,balanceSheetHistory,summaryDetail";

/// Raw fields of a quoteSummary response that the fundamentals feed needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSummary {
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_to_book: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub profit_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub total_current_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

/// Current quote from the chart endpoint metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartQuote {
    pub price: f64,
    pub previous_close: Option<f64>,
    pub volume: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let resp = self.client.get(url).query(query).send().await?;
        if !resp.status().is_success() {
            return Err(Error::DataError(format!("Yahoo Finance HTTP {} for {}", resp.status(), url)));
        }
        Ok(resp.json::<Value>().await?)
    }

    pub async fn quote_summary(&self, symbol: &str) -> Result<QuoteSummary> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let body = self.get_json(&url, &[("modules", SUMMARY_MODULES)]).await?;
        parse_quote_summary(&body)
            .ok_or_else(|| Error::DataError(format!("empty quoteSummary for {symbol}")))
    }

    /// Closing prices over `range` at `interval`, nulls skipped.
    pub async fn closes(&self, symbol: &str, range: &str, interval: &str) -> Result<Vec<f64>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let body = self.get_json(&url, &[("range", range), ("interval", interval)]).await?;
        Ok(parse_chart_closes(&body))
    }

    pub async fn quote(&self, symbol: &str) -> Result<ChartQuote> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let body = self.get_json(&url, &[("range", "1d"), ("interval", "1d")]).await?;
        parse_chart_quote(&body).ok_or_else(|| Error::DataError(format!("no chart meta for {symbol}")))
    }
}

/// Yahoo wraps numbers as `{"raw": 1.2, "fmt": "1.20"}`; plain numbers pass through.
pub(crate) fn raw_value(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    match v {
        Value::Object(map) => map.get("raw").and_then(Value::as_f64),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_quote_summary(body: &Value) -> Option<QuoteSummary> {
    let result = body.pointer("/quoteSummary/result/0")?;
    let stats = result.get("defaultKeyStatistics");
    let fin = result.get("financialData");
    let detail = result.get("summaryDetail");
    let sheet = result.pointer("/balanceSheetHistory/balanceSheetStatements/0");

    let field = |section: Option<&Value>, key: &str| raw_value(section.and_then(|s| s.get(key)));

    Some(QuoteSummary {
        price: field(fin, "currentPrice"),
        market_cap: field(stats, "marketCap").or_else(|| field(detail, "marketCap")),
        price_to_book: field(stats, "priceToBook"),
        trailing_pe: field(stats, "trailingPE").or_else(|| field(detail, "trailingPE")),
        forward_pe: field(stats, "forwardPE"),
        debt_to_equity: field(fin, "debtToEquity"),
        current_ratio: field(fin, "currentRatio"),
        profit_margin: field(fin, "profitMargins"),
        return_on_equity: field(fin, "returnOnEquity"),
        free_cash_flow: field(fin, "freeCashflow"),
        dividend_yield: field(detail, "dividendYield").or_else(|| field(stats, "dividendYield")),
        total_current_assets: field(sheet, "totalCurrentAssets"),
        total_liabilities: field(sheet, "totalLiab"),
        shares_outstanding: field(stats, "sharesOutstanding"),
    })
}

fn parse_chart_closes(body: &Value) -> Vec<f64> {
    body.pointer("/chart/result/0/indicators/quote/0/close")
        .and_then(Value::as_array)
        .map(|closes| closes.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

fn parse_chart_quote(body: &Value) -> Option<ChartQuote> {
    let meta = body.pointer("/chart/result/0/meta")?;
    let num = |key: &str| meta.get(key).and_then(Value::as_f64);
    Some(ChartQuote {
        price: num("regularMarketPrice")?,
        previous_close: num("chartPreviousClose").or_else(|| num("previousClose")),
        volume: num("regularMarketVolume").unwrap_or(0.0),
        high: num("regularMarketDayHigh"),
        low: num("regularMarketDayLow"),
    })
}
