//! Pure analytics through the public API: indicators, valuation, voting, caching.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rstest::rstest;

use signalops::cache::TtlCache;
use signalops::fusion::consensus::{macro_veto, tally};
use signalops::fusion::{EventOdds, SourceTag};
use signalops::indicators::{rsi, TechnicalReading, RSI_PERIOD};
use signalops::rules::{Condition, DataSource, Operator, Rule, TriggerStatus};
use signalops::sources::fundamentals::{graham_check, NET_NET_FACTOR};
use signalops::sources::{value_score, NcavAnalysis};
use signalops::trading::Action;
use signalops::utils::ManualClock;

fn odds(yes: f64) -> EventOdds {
    EventOdds {
        source: SourceTag::Polymarket,
        market_id: "42".into(),
        title: "Will it happen?".into(),
        description: String::new(),
        yes_probability: yes,
        no_probability: 1.0 - yes,
        volume: 0.0,
        liquidity: 0.0,
        close_time: None,
        active: true,
    }
}

#[rstest]
#[case(15)]
#[case(30)]
#[case(200)]
fn monotone_series_pin_rsi(#[case] n: usize) {
    let up: Vec<f64> = (0..n).map(|i| 10.0 + i as f64 * 0.5).collect();
    let down: Vec<f64> = up.iter().rev().copied().collect();
    assert!((rsi(&up, RSI_PERIOD) - 100.0).abs() < 1e-9);
    assert!(rsi(&down, RSI_PERIOD).abs() < 1e-9);
    assert_eq!(TechnicalReading::from_closes(&down).signal, Action::Buy);
    assert_eq!(TechnicalReading::from_closes(&up).signal, Action::Sell);
}

#[test]
fn short_history_is_neutral() {
    let closes: Vec<f64> = (0..RSI_PERIOD).map(|i| i as f64).collect();
    assert!((rsi(&closes, RSI_PERIOD) - 50.0).abs() < 1e-9);
    let reading = TechnicalReading::from_closes(&closes);
    assert_eq!(reading.signal, Action::Hold);
    assert!(reading.confidence.abs() < 1e-9);
}

#[rstest]
#[case(6.0, true)]
#[case(7.0, false)]
fn net_net_flag(#[case] price: f64, #[case] expected: bool) {
    let ncav = NcavAnalysis::compute(150.0, 50.0, 10.0, price).unwrap();
    assert!((ncav.ncav_per_share - 10.0).abs() < 1e-9);
    assert!((ncav.graham_threshold - 10.0 * NET_NET_FACTOR).abs() < 1e-9);
    assert_eq!(ncav.is_net_net, expected);
}

#[test]
fn negative_ncav_has_no_ratio() {
    let ncav = NcavAnalysis::compute(50.0, 150.0, 10.0, 5.0).unwrap();
    assert_eq!(ncav.ncav_ratio, None);
    assert!(!ncav.is_net_net);
    assert!(NcavAnalysis::compute(1.0, 0.0, 0.0, 1.0).is_none());
}

#[test]
fn value_score_is_bounded() {
    let best = value_score(Some(0.5), Some(5.0), Some(0.4), Some(0.1));
    let worst = value_score(Some(10.0), Some(80.0), None, Some(5.0));
    assert!((0.0..=100.0).contains(&best));
    assert!((0.0..=100.0).contains(&worst));
    assert!(best > 70.0 && worst < 30.0);
    assert!((value_score(None, None, None, None) - 50.0).abs() < 1e-9);
}

#[test]
fn graham_lenient_needs_two_criteria() {
    let mut m = signalops::fusion::FundamentalMetrics::new(SourceTag::YahooFinance, "XYZ");
    m.price_to_book = Some(1.2);
    m.debt_to_equity = Some(0.3);
    assert!(graham_check(&m, false).is_value);
    assert!(!graham_check(&m, true).is_value);
}

#[rstest]
#[case(vec![])]
#[case(vec![(Action::Buy, 1.0)])]
#[case(vec![(Action::Buy, 0.9), (Action::Buy, 1.0), (Action::Sell, 0.1)])]
#[case(vec![(Action::Sell, 0.6), (Action::Sell, 0.6), (Action::Buy, 0.7), (Action::Buy, 0.7)])]
#[case(vec![(Action::Hold, 0.0), (Action::Hold, 0.5), (Action::Hold, 1.0)])]
fn consensus_confidence_in_unit_range(#[case] votes: Vec<(Action, f64)>) {
    for vetoed in [false, true] {
        let c = tally(votes.clone(), vetoed);
        assert!((0.0..=1.0).contains(&c.confidence), "{c:?}");
        assert_eq!(c.sources_count, votes.len());
    }
}

#[rstest]
#[case("market_crash", 0.71, true)]
#[case("credit_crisis", 0.95, true)]
#[case("us_recession", 0.70, false)]
#[case("fed_hike", 0.99, false)]
fn veto_keywords_and_threshold(#[case] name: &str, #[case] yes: f64, #[case] vetoes: bool) {
    let events = BTreeMap::from([(name.to_string(), odds(yes))]);
    assert_eq!(macro_veto(&events), vetoes);
    let c = tally(vec![(Action::Buy, 0.7), (Action::Buy, 0.6)], macro_veto(&events));
    assert_eq!(c.action == Action::Buy, !vetoes);
}

#[test]
fn tied_buy_and_sell_hold() {
    let c = tally(vec![(Action::Buy, 0.7), (Action::Buy, 0.7), (Action::Sell, 0.6), (Action::Sell, 0.6)], false);
    assert_eq!(c.action, Action::Hold);
    assert!((c.confidence - 0.5).abs() < 1e-9);
}

#[test]
fn ttl_cache_expires_on_the_injected_clock() {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    let cache: TtlCache<String, f64> = TtlCache::with_clock("test", Duration::from_secs(300), clock.clone());

    cache.insert("BTC".into(), 1.0);
    clock.advance(chrono::Duration::seconds(299));
    assert_eq!(cache.get(&"BTC".to_string()), Some(1.0));

    clock.advance(chrono::Duration::seconds(1));
    assert_eq!(cache.get(&"BTC".to_string()), None);
    // stale entries stay until overwritten
    assert_eq!(cache.len(), 1);

    cache.insert("BTC".into(), 2.0);
    assert_eq!(cache.get(&"BTC".to_string()), Some(2.0));
}

#[test]
fn rule_reports_missing_metrics() {
    let rule = Rule {
        id: "cheap_and_calm".into(),
        source: DataSource::Fundamental,
        conditions: vec![
            Condition::new("price_to_book", Operator::Lt, 1.5),
            Condition::new("debt_to_equity", Operator::Lte, 0.5),
        ],
    };
    let metrics = BTreeMap::from([("price_to_book".to_string(), 1.1)]);

    let (passed, triggers) = rule.evaluate(&metrics);
    assert!(!passed);
    assert_eq!(triggers[0].status, TriggerStatus::Pass);
    assert_eq!(triggers[1].status, TriggerStatus::NotAvailable);
}
