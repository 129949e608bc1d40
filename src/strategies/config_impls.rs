//! Conversions from `AgentConfig` to concrete agents. Missing params take the
//! agent's defaults; params of the wrong type are configuration errors.

use serde_json::{Map, Value};

use super::value::DefensiveValueParams;
use super::*;
use crate::rules::Rule;

/// Typed view over `AgentConfig::params`.
pub(crate) struct Params<'a> {
    agent: &'a str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Params<'a> {
    pub(crate) fn of(cfg: &'a AgentConfig) -> Result<Self> {
        let map = match &cfg.params {
            Value::Null => None,
            Value::Object(map) => Some(map),
            other => {
                return Err(Error::ConfigError(format!(
                    "{}: params must be a table, got {}",
                    cfg.name, other
                )))
            }
        };
        Ok(Self { agent: &cfg.name, map })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key))
    }

    fn invalid(&self, key: &str, expected: &str) -> Error {
        Error::ConfigError(format!("{}: param `{}` must be {}", self.agent, key, expected))
    }

    pub(crate) fn f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| self.invalid(key, "a number")),
        }
    }

    /// A probability-like threshold in [0, 1].
    pub(crate) fn unit(&self, key: &str, default: f64) -> Result<f64> {
        let v = self.f64(key, default)?;
        if (0.0..=1.0).contains(&v) {
            Ok(v)
        } else {
            Err(self.invalid(key, "within [0, 1]"))
        }
    }

    pub(crate) fn usize(&self, key: &str, default: usize) -> Result<usize> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_u64().map(|n| n as usize).ok_or_else(|| self.invalid(key, "a non-negative integer")),
        }
    }

    pub(crate) fn capital(&self) -> Result<f64> {
        let capital = self.f64("capital", DEFAULT_CAPITAL)?;
        if capital > 0.0 {
            Ok(capital)
        } else {
            Err(self.invalid("capital", "> 0"))
        }
    }

    pub(crate) fn rules(&self) -> Result<Vec<Rule>> {
        let raw = self.get("rules").ok_or_else(|| self.invalid("rules", "a non-empty list of rules"))?;
        let rules: Vec<Rule> = serde_json::from_value(raw.clone())
            .map_err(|e| Error::ConfigError(format!("{}: malformed rules: {}", self.agent, e)))?;
        if rules.is_empty() {
            return Err(self.invalid("rules", "a non-empty list of rules"));
        }
        Ok(rules)
    }

    /// Sub-agent definitions: bare names or full agent tables.
    pub(crate) fn sub_agents(&self) -> Result<Vec<AgentConfig>> {
        let list = self
            .get("agents")
            .and_then(Value::as_array)
            .ok_or_else(|| self.invalid("agents", "a list of agent names or tables"))?;
        list.iter()
            .map(|v| match v {
                Value::String(name) => Ok(AgentConfig::new(name.as_str())),
                Value::Object(_) => serde_json::from_value(v.clone())
                    .map_err(|e| Error::ConfigError(format!("{}: malformed sub-agent: {}", self.agent, e))),
                _ => Err(self.invalid("agents", "a list of agent names or tables")),
            })
            .collect()
    }
}

impl TryFrom<&AgentConfig> for DefensiveValueAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        let defaults = DefensiveValueParams::default();
        Ok(DefensiveValueAgent::new(
            &cfg.name,
            DefensiveValueParams {
                pb_threshold: p.f64("pb_threshold", defaults.pb_threshold)?,
                pe_threshold: p.f64("pe_threshold", defaults.pe_threshold)?,
                debt_threshold: p.f64("debt_threshold", defaults.debt_threshold)?,
                recession_threshold: p.unit("recession_threshold", defaults.recession_threshold)?,
                conflict_threshold: p.unit("conflict_threshold", defaults.conflict_threshold)?,
                rsi_threshold: p.f64("rsi_threshold", defaults.rsi_threshold)?,
                position_pct: p.unit("position_pct", defaults.position_pct)?,
                capital: p.capital()?,
            },
        ))
    }
}

impl TryFrom<&AgentConfig> for CrisisDetectorAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        Ok(CrisisDetectorAgent::new(&cfg.name, p.unit("crisis_threshold", 0.70)?, p.capital()?))
    }
}

impl TryFrom<&AgentConfig> for EventDrivenAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        Ok(EventDrivenAgent::new(&cfg.name, p.unit("fed_threshold", 0.70)?, p.unit("shift_threshold", 0.15)?))
    }
}

impl TryFrom<&AgentConfig> for FedHikeAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        Ok(FedHikeAgent::new(&cfg.name, p.unit("threshold", 0.65)?))
    }
}

impl TryFrom<&AgentConfig> for TrendFollowingAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        TrendFollowingAgent::new(&cfg.name, p.usize("fast", 5)?, p.usize("slow", 15)?)
    }
}

impl TryFrom<&AgentConfig> for MeanReversionAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        MeanReversionAgent::new(&cfg.name, p.usize("period", 20)?, p.f64("std_dev", 2.0)?)
    }
}

impl TryFrom<&AgentConfig> for OnChainFlowAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        Ok(OnChainFlowAgent::new(&cfg.name, p.unit("confidence", 0.6)?))
    }
}

impl TryFrom<&AgentConfig> for RuleSetAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        let rules = p.rules()?;
        let required = p.usize("require_confirmations", rules.len())?;
        if required == 0 || required > rules.len() {
            return Err(Error::ConfigError(format!(
                "{}: require_confirmations must be within 1..={}",
                cfg.name,
                rules.len()
            )));
        }
        Ok(RuleSetAgent::new(&cfg.name, rules, required, p.unit("position_size", 0.02)? * p.capital()?))
    }
}

impl TryFrom<&AgentConfig> for MetaBanditAgent {
    type Error = Error;
    fn try_from(cfg: &AgentConfig) -> Result<Self> {
        let p = Params::of(cfg)?;
        let subs = p
            .sub_agents()?
            .iter()
            .map(AgentFactory::create_agent)
            .collect::<Result<Vec<_>>>()?;
        if subs.is_empty() {
            return Err(Error::ConfigError(format!("{}: needs at least one sub-agent", cfg.name)));
        }
        Ok(MetaBanditAgent::new(&cfg.name, subs))
    }
}
