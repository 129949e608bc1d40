//! Smoke tests against the real providers. Run with
//! `--features online-tests -- --ignored`.
#![cfg(feature = "online-tests")]

use signalops::config::Config;
use signalops::fusion::MultiSourceDataFeed;
use signalops::sources::{http_client, DefiLlamaClient, PolymarketClient, SourceSet};

#[tokio::test]
#[ignore]
async fn defillama_reports_ethereum_tvl() {
    let config = Config::default();
    let client = DefiLlamaClient::new(http_client(&config.sources).unwrap(), &config.sources.defillama_url);
    let history = client.chain_tvl_history("Ethereum").await.unwrap();
    assert!(history.len() > 2);
    assert!(client.current_tvl("Ethereum").await.unwrap() > 0.0);
}

#[tokio::test]
#[ignore]
async fn polymarket_search_returns_probabilities() {
    let config = Config::default();
    let client = PolymarketClient::new(http_client(&config.sources).unwrap(), &config.sources.polymarket_url);
    for market in client.search_markets("fed", 5).await.unwrap() {
        assert!((0.0..=1.0).contains(&market.yes_probability));
    }
}

#[tokio::test]
#[ignore]
async fn live_fusion_for_btc() {
    let config = Config::default();
    let sources = SourceSet::from_config(&config).unwrap();
    let market = sources.prices.snapshot("BTC").await.unwrap();
    assert!(market.price > 0.0);

    let feed = MultiSourceDataFeed::with_sources(&sources, &config);
    let record = feed.get_unified_data("BTC", market, &config.fusion.events).await;
    assert!((0.0..=1.0).contains(&record.consensus.confidence));
}
