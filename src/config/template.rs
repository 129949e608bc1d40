//! Configuration template generation

use crate::config::Config;
use crate::utils::error::{Error, Result};
use std::fs;
use std::path::Path;

const COMMENTED_TEMPLATE: &str = r#"# SignalOps Configuration
# Every section is optional; omitted keys fall back to the built-in defaults.

version = "0.1.0"

[sources]
# Base URLs of the data providers (override with SIGNALOPS_*_URL env vars)
yahoo_url = "https://query2.finance.yahoo.com"
polymarket_url = "https://gamma-api.polymarket.com"
defillama_url = "https://api.llama.fi"
binance_url = "https://api.binance.com"

# Per-request HTTP timeout in seconds
request_timeout_secs = 10

user_agent = "Mozilla/5.0 (compatible; signalops)"

# Symbols treated as crypto. Symbols ending in USD, -USD or USDT always are.
crypto_symbols = ["BTC", "ETH", "SOL", "AVAX", "MATIC", "ARB", "OP"]

[fusion]
# Maximum concurrent source fetches
max_workers = 5

# Deadline for one fusion request in seconds (SIGNALOPS_FUSION_TIMEOUT_SECS)
timeout_secs = 10

# Prediction markets to track: event name = Polymarket market id or slug.
# Event names drive the risk rules: names containing recession, crash,
# crisis or war count as macro risk; fed_hike feeds the rate agents.
[fusion.events]
# recession_2025 = "us-recession-in-2025"
# fed_hike = "fed-increases-interest-rates"

[cache]
fundamentals_ttl_secs = 3600
events_ttl_secs = 300
onchain_ttl_secs = 300

[arena]
# Exploration rate of the winner selection (0-1)
epsilon = 0.15

# Notional capital used for position sizing
capital = 10000.0

# Agents are built by name; `params` are agent specific.
[[agents]]
name = "defensive_value"
enabled = true

[[agents]]
name = "crisis_detector"
enabled = true

[[agents]]
name = "event_driven"
enabled = true

[agents.params]
fed_threshold = 0.70
shift_threshold = 0.15

[[agents]]
name = "fed_hike"
enabled = true

[agents.params]
threshold = 0.65

[[agents]]
name = "trend_following"
enabled = true

[agents.params]
fast = 5
slow = 15

[[agents]]
name = "mean_reversion"
enabled = true

[agents.params]
period = 20
std_dev = 2.0

[[agents]]
name = "onchain_flow"
enabled = true

# A declarative rule set: BUY when `require_confirmations` rules pass.
# [[agents]]
# name = "rule_set"
# enabled = true
#
# [agents.params]
# require_confirmations = 1
# position_size = 0.02
#
# [[agents.params.rules]]
# id = "cheap_book"
# source = "fundamental"
# conditions = [{ metric = "price_to_book", operator = "<", threshold = 1.5 }]
"#;

/// Generate a default configuration file at the specified path
pub fn generate_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    Config::default().save(path)
}

/// Generate a configuration file with comments explaining each field
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path.as_ref(), COMMENTED_TEMPLATE)
        .map_err(|e| Error::ConfigError(format!("Failed to write template {:?}: {}", path.as_ref(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_commented_template_parses() {
        let cfg: Config = toml::from_str(COMMENTED_TEMPLATE).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.agents.len(), 7);
        assert_eq!(cfg.agents[2].params["fed_threshold"], 0.70);
    }

    #[test]
    fn test_generate_config_template_with_nonexistent_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config").join("config.toml");

        generate_commented_config_template(&config_path).unwrap();
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("SignalOps Configuration"));
    }

    #[test]
    fn test_generate_default_template() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        generate_config_template(&config_path).unwrap();
        assert!(config_path.exists());
    }
}
