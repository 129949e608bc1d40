//! Agents and the arena driven by fused records and TOML configuration.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serial_test::serial;

use signalops::config::{Config, ENV_BINANCE_URL, ENV_DEFILLAMA_URL, ENV_FUSION_TIMEOUT_SECS, ENV_POLYMARKET_URL, ENV_YAHOO_URL};
use signalops::engine::Arena;
use signalops::fusion::{EventOdds, Fundamentals, MarketSnapshot, OnChain, UnifiedMarketRecord};
use signalops::persistence::{DecisionLog, DecisionStore, ExecutionStatus, InMemoryDecisionStore};
use signalops::strategies::{Agent, AgentConfig, AgentFactory, PerformanceTracker};
use signalops::trading::{Action, Signal};
use signalops::{Error, Result};

use common::*;

async fn fused(fundamentals: Fundamentals, events: BTreeMap<String, EventOdds>, onchain: OnChain, closes: Vec<f64>, symbol: &str) -> UnifiedMarketRecord {
    let names: Vec<String> = events.keys().cloned().collect();
    let config = Config::default();
    let feed = feed(fundamentals, events, CountingOnChain::new(onchain), Arc::new(StaticHistory(closes)), &config);
    let event_config = names.iter().map(|n| (n.clone(), format!("{n}-id"))).collect();
    feed.get_unified_data(symbol, MarketSnapshot::new(symbol, 25.0), &event_config).await
}

#[tokio::test]
async fn defensive_value_buys_cheap_oversold_stock() {
    let record = fused(equity(1.2, 10.0, 0.3, 80.0), BTreeMap::new(), OnChain::Empty, falling(30), "XYZ").await;
    let mut agent = AgentFactory::create_agent(&AgentConfig::new("defensive_value")).unwrap();

    let signal = agent.evaluate(&record).await.unwrap().unwrap();
    assert_eq!(signal.action, Action::Buy);
    assert!(signal.confidence >= 0.6);
    // 3/3 checks plus consensus bonus, capped
    assert!((signal.confidence - 0.95).abs() < 1e-9);
    assert!((signal.size - 200.0).abs() < 1e-9);
    assert!(signal.reason.starts_with("BUY (3/3 checks)"));
}

#[tokio::test]
async fn defensive_value_holds_when_blocked() {
    let events = BTreeMap::from([("recession_2025".to_string(), odds("US recession in 2025?", 0.8))]);
    let record = fused(equity(1.2, 10.0, 0.3, 80.0), events, OnChain::Empty, falling(30), "XYZ").await;
    let mut agent = AgentFactory::create_agent(&AgentConfig::new("defensive_value")).unwrap();

    let signal = agent.evaluate(&record).await.unwrap().unwrap();
    assert_eq!(signal.action, Action::Hold);
    assert!(signal.confidence.abs() < 1e-9);
    assert!(signal.reason.starts_with("BLOCKED:"));
}

#[tokio::test]
async fn defensive_value_abstains_when_every_source_failed() {
    let record = fused(Fundamentals::Unavailable, BTreeMap::new(), OnChain::Empty, Vec::new(), "XYZ").await;
    assert!(record.conflicts.is_empty());
    let mut agent = AgentFactory::create_agent(&AgentConfig::new("defensive_value")).unwrap();
    assert!(agent.evaluate(&record).await.unwrap().is_none());
}

#[tokio::test]
async fn crisis_detector_sells_on_bank_stress_and_outflows() {
    let events = BTreeMap::from([("bank_failures".to_string(), odds("Another US bank fails?", 0.8))]);
    let record = fused(Fundamentals::Unavailable, events, health(-10.0), falling(5), "BTC").await;
    let mut agent = AgentFactory::create_agent(&AgentConfig::new("crisis_detector")).unwrap();

    let signal = agent.evaluate(&record).await.unwrap().unwrap();
    assert_eq!(signal.action, Action::Sell);
    assert!((signal.confidence - 0.9).abs() < 1e-9);
}

#[test]
fn unknown_agent_is_a_config_error() {
    assert_matches!(AgentFactory::create_agent(&AgentConfig::new("astrology")).err(), Some(Error::ConfigError(_)));
}

#[test]
fn default_config_builds_every_agent() {
    let agents = AgentFactory::create_enabled(&Config::default()).unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name()).collect();
    assert_eq!(
        names,
        ["defensive_value", "crisis_detector", "event_driven", "fed_hike", "trend_following", "mean_reversion", "onchain_flow"]
    );
}

struct Flaky {
    performance: PerformanceTracker,
}

#[async_trait]
impl Agent for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn evaluate(&mut self, _record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        Err(Error::DataError("feed went away".into()))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}

#[tokio::test]
async fn failing_agent_does_not_stop_the_round() {
    let record = fused(equity(1.2, 10.0, 0.3, 80.0), BTreeMap::new(), OnChain::Empty, falling(30), "XYZ").await;
    let mut arena = Arena::new(
        vec![
            Box::new(Flaky { performance: PerformanceTracker::new() }),
            AgentFactory::create_agent(&AgentConfig::new("defensive_value")).unwrap(),
        ],
        0.0,
    );

    let round = arena.run_round(&record).await.unwrap();
    assert_eq!(round.errors.len(), 1);
    assert_eq!(round.errors[0].0, "flaky");
    let winner = round.winner.unwrap();
    assert_eq!(winner.agent_name, "defensive_value");
    assert!(round.explanation.starts_with("defensive_value selected (95% confidence)"));
}

const RULE_CONFIG: &str = r#"
version = "0.1.0"

[arena]
epsilon = 0.0
capital = 50000.0

[[agents]]
name = "rule_set"

[agents.params]
require_confirmations = 2

[[agents.params.rules]]
id = "cheap"
source = "fundamental"
conditions = [{ metric = "price_to_book", operator = "<", threshold = 1.5 }]

[[agents.params.rules]]
id = "oversold"
source = "technical"
conditions = [{ metric = "rsi_14", operator = "<", threshold = 30.0 }]
"#;

#[tokio::test]
#[serial]
async fn rule_set_from_toml_wins_and_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, RULE_CONFIG).unwrap();
    let config = Config::from_file(&path).unwrap();
    config.validate().unwrap();

    let store = Arc::new(InMemoryDecisionStore::new());
    let mut arena = Arena::from_config(&config).unwrap().with_store(store.clone());
    assert_eq!(arena.agent_names(), ["rule_set"]);

    let record = fused(equity(0.8, 10.0, 0.3, 80.0), BTreeMap::new(), OnChain::Empty, falling(30), "XYZ").await;
    let round = arena.run_round(&record).await.unwrap();

    let winner = round.winner.unwrap();
    assert_eq!(winner.action, Action::Buy);
    assert!((winner.confidence - 1.0).abs() < 1e-9);
    assert!((winner.size - 1_000.0).abs() < 1e-9);
    assert_eq!(winner.reason, "2/2 rules passed: cheap, oversold");

    let id = round.decision_log_id.unwrap();
    assert!(store.update_status(&id, ExecutionStatus::Executed).await.unwrap());
    let logged = store.get_decision(&id).await.unwrap().unwrap();
    assert_eq!(logged.strategy_name, "rule_set");
    assert_eq!(logged.execution_status, ExecutionStatus::Executed);
}

#[tokio::test]
async fn meta_bandit_from_config_relabels_the_pick() {
    let cfg = AgentConfig::new("meta_bandit").with_params(serde_json::json!({
        "agents": ["defensive_value", { "name": "onchain_flow", "params": { "confidence": 0.55 } }]
    }));
    let mut meta = AgentFactory::create_agent(&cfg).unwrap();
    let record = fused(equity(1.2, 10.0, 0.3, 80.0), BTreeMap::new(), OnChain::Empty, falling(30), "XYZ").await;

    let signal = meta.evaluate(&record).await.unwrap().unwrap();
    assert_eq!(signal.agent_name, "meta_bandit");
    assert!(signal.reason.starts_with("[META] Selected defensive_value"));

    meta.record_outcome(120.0);
    assert_eq!(meta.stats().total_trades, 1);
}

#[test]
#[serial]
fn default_config_survives_a_file_round_trip() {
    temp_env::with_vars_unset(
        [ENV_YAHOO_URL, ENV_POLYMARKET_URL, ENV_DEFILLAMA_URL, ENV_BINANCE_URL, ENV_FUSION_TIMEOUT_SECS],
        || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("config.toml");
            let mut config = Config::default();
            config.fusion.events.insert("fed_hike".into(), "fed-decision-in-march".into());
            config.save(&path).unwrap();
            assert_eq!(Config::from_file(&path).unwrap(), config);
        },
    );
}

#[test]
fn decisions_can_be_listed_per_strategy() {
    let store = InMemoryDecisionStore::new();
    tokio_test::block_on(async {
        for (agent, action) in [("a", Action::Buy), ("b", Action::Sell), ("a", Action::Hold)] {
            let signal = Signal::new(agent, "XYZ", action, 0.6, 100.0, 25.0, "test");
            store.log_decision(&DecisionLog::from_signal(&signal, Vec::new())).await.unwrap();
        }
        let recent = store.recent_decisions(Some("a"), 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].decision, Action::Hold);
        assert_eq!(recent[0].position_size, None);
    });
}
