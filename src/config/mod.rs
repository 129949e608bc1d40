//! Configuration for the fusion engine, its data sources and agents

mod template;

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategies::AgentConfig;
use crate::utils::error::{Error, Result};

pub use template::{generate_commented_config_template, generate_config_template};

pub const ENV_YAHOO_URL: &str = "SIGNALOPS_YAHOO_URL";
pub const ENV_POLYMARKET_URL: &str = "SIGNALOPS_POLYMARKET_URL";
pub const ENV_DEFILLAMA_URL: &str = "SIGNALOPS_DEFILLAMA_URL";
pub const ENV_BINANCE_URL: &str = "SIGNALOPS_BINANCE_URL";
pub const ENV_FUSION_TIMEOUT_SECS: &str = "SIGNALOPS_FUSION_TIMEOUT_SECS";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// Third-party data providers
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Fan-out, deadline and tracked events
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Cache freshness windows
    #[serde(default)]
    pub cache: CacheConfig,

    /// Agent arena
    #[serde(default)]
    pub arena: ArenaConfig,

    /// Agents built by the registry
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// HTTP endpoints and asset classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub yahoo_url: String,
    pub polymarket_url: String,
    pub defillama_url: String,
    pub binance_url: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Symbols treated as crypto in addition to USD/-USD/USDT suffixes
    pub crypto_symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Concurrent source fetches across all requests
    pub max_workers: usize,
    /// Global deadline for one fusion request
    pub timeout_secs: u64,
    /// Event name -> prediction market id or slug
    pub events: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub fundamentals_ttl_secs: u64,
    pub events_ttl_secs: u64,
    pub onchain_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Probability of picking a random candidate instead of the best score
    pub epsilon: f64,
    /// Notional capital used for position sizing
    pub capital: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            sources: SourcesConfig::default(),
            fusion: FusionConfig::default(),
            cache: CacheConfig::default(),
            arena: ArenaConfig::default(),
            agents: default_agents(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            yahoo_url: "https://query2.finance.yahoo.com".to_string(),
            polymarket_url: "https://gamma-api.polymarket.com".to_string(),
            defillama_url: "https://api.llama.fi".to_string(),
            binance_url: "https://api.binance.com".to_string(),
            request_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (compatible; signalops)".to_string(),
            crypto_symbols: ["BTC", "ETH", "SOL", "AVAX", "MATIC", "ARB", "OP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { max_workers: 5, timeout_secs: 10, events: BTreeMap::new() }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fundamentals_ttl_secs: 3_600, // fundamentals move slowly
            events_ttl_secs: 300,
            onchain_ttl_secs: 300,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self { epsilon: 0.15, capital: 10_000.0 }
    }
}

fn default_agents() -> Vec<AgentConfig> {
    [
        "defensive_value",
        "crisis_detector",
        "event_driven",
        "fed_hike",
        "trend_following",
        "mean_reversion",
        "onchain_flow",
    ]
    .into_iter()
    .map(AgentConfig::new)
    .collect()
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Listed symbol, or a USD / -USD / USDT quoted pair.
    pub fn is_crypto(&self, symbol: &str) -> bool {
        let upper = symbol.to_ascii_uppercase();
        self.crypto_symbols.iter().any(|s| s.eq_ignore_ascii_case(&upper))
            || upper.ends_with("USD")
            || upper.ends_with("USDT")
    }
}

impl FusionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn fundamentals_ttl(&self) -> Duration {
        Duration::from_secs(self.fundamentals_ttl_secs)
    }

    pub fn events_ttl(&self) -> Duration {
        Duration::from_secs(self.events_ttl_secs)
    }

    pub fn onchain_ttl(&self) -> Duration {
        Duration::from_secs(self.onchain_ttl_secs)
    }
}

impl Config {
    /// The built-in defaults rendered as TOML.
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {e}", path.display())))?;
        let mut cfg: Self = toml::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("invalid TOML in {}: {e}", path.display())))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Write as TOML, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let rendered = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::ConfigError(format!("cannot create {}: {e}", dir.display())))?;
        }
        std::fs::write(path, rendered)
            .map_err(|e| Error::ConfigError(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError("Config version must be set (e.g., '0.1.0')".to_string()));
        }

        let urls = [
            ("sources.yahoo_url", &self.sources.yahoo_url),
            ("sources.polymarket_url", &self.sources.polymarket_url),
            ("sources.defillama_url", &self.sources.defillama_url),
            ("sources.binance_url", &self.sources.binance_url),
        ];
        for (key, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::ConfigError(format!("{key} must be an http(s) URL, got {url:?}")));
            }
        }
        if self.sources.request_timeout_secs == 0 {
            return Err(Error::ConfigError("sources.request_timeout_secs must be > 0".to_string()));
        }

        if self.fusion.max_workers == 0 {
            return Err(Error::ConfigError("fusion.max_workers must be > 0".to_string()));
        }
        if self.fusion.timeout_secs == 0 {
            return Err(Error::ConfigError("fusion.timeout_secs must be > 0".to_string()));
        }
        if let Some((name, _)) = self.fusion.events.iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(Error::ConfigError(format!("fusion.events.{name} has an empty market id")));
        }

        if self.cache.fundamentals_ttl_secs == 0
            || self.cache.events_ttl_secs == 0
            || self.cache.onchain_ttl_secs == 0
        {
            return Err(Error::ConfigError("cache TTLs must be > 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.arena.epsilon) {
            return Err(Error::ConfigError("arena.epsilon must be within [0, 1]".to_string()));
        }
        if self.arena.capital <= 0.0 {
            return Err(Error::ConfigError("arena.capital must be > 0".to_string()));
        }

        if self.agents.iter().any(|a| a.name.trim().is_empty()) {
            return Err(Error::ConfigError("every [[agents]] entry needs a name".to_string()));
        }
        Ok(())
    }

    /// `./config.toml`, else `<config dir>/signalops/config.toml`, else defaults.
    pub fn load() -> Result<Self> {
        if let Ok(config) = Self::from_file("config.toml") {
            return Ok(config);
        }

        if let Some(mut path) = dirs::config_dir() {
            path.push("signalops");
            path.push("config.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Apply `SIGNALOPS_*` overrides.
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var(ENV_YAHOO_URL) {
            self.sources.yahoo_url = url;
        }
        if let Ok(url) = env::var(ENV_POLYMARKET_URL) {
            self.sources.polymarket_url = url;
        }
        if let Ok(url) = env::var(ENV_DEFILLAMA_URL) {
            self.sources.defillama_url = url;
        }
        if let Ok(url) = env::var(ENV_BINANCE_URL) {
            self.sources.binance_url = url;
        }
        if let Ok(raw) = env::var(ENV_FUSION_TIMEOUT_SECS) {
            self.fusion.timeout_secs = raw.trim().parse().map_err(|_| {
                Error::ConfigError(format!("{ENV_FUSION_TIMEOUT_SECS} must be an integer, got {raw:?}"))
            })?;
        }
        Ok(())
    }

    /// Enabled agent configurations, in file order.
    pub fn enabled_agents(&self) -> impl Iterator<Item = &AgentConfig> {
        self.agents.iter().filter(|a| a.enabled)
    }
}
