//! Engine configuration
//!
//! Every tunable the engine uses lives here so it can be overridden from a
//! TOML or JSON file without code changes. Missing keys fall back to the
//! defaults below.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default number of entries per domain read for trends and aggregation
pub const DEFAULT_WINDOW_SIZE: usize = 7;

/// Risk assumed for a domain with no data
pub const NEUTRAL_RISK: f64 = 50.0;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// History window per domain (entries)
    pub window_size: usize,
    pub trend: TrendConfig,
    pub thresholds: TierThresholds,
    pub tier_policy: TierPolicy,
    pub collaborator: CollaboratorPolicy,
    pub triggers: TriggerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            trend: TrendConfig::default(),
            thresholds: TierThresholds::default(),
            tier_policy: TierPolicy::default(),
            collaborator: CollaboratorPolicy::default(),
            triggers: TriggerConfig::default(),
        }
    }
}

/// Trend analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Length of the "recent" and "older" windows
    pub window: usize,
    /// Minimum difference between window averages to call a direction
    pub threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 3,
            threshold: 0.5,
        }
    }
}

/// Tier classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Overall wellness below this is high risk
    pub high_wellness_below: f64,
    /// Overall wellness below this is at least medium risk
    pub medium_wellness_below: f64,
    /// Any single domain risk at or above this is high risk
    pub high_domain_risk: f64,
    /// Any single domain risk at or above this is at least medium risk
    pub medium_domain_risk: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high_wellness_below: 40.0,
            medium_wellness_below: 70.0,
            high_domain_risk: 70.0,
            medium_domain_risk: 40.0,
        }
    }
}

impl TierThresholds {
    /// Thresholds made stickier by `margin`: wellness bounds move up and
    /// domain bounds move down, so a tier is harder to leave.
    pub fn widened(&self, margin: f64) -> Self {
        Self {
            high_wellness_below: self.high_wellness_below + margin,
            medium_wellness_below: self.medium_wellness_below + margin,
            high_domain_risk: self.high_domain_risk - margin,
            medium_domain_risk: self.medium_domain_risk - margin,
        }
    }
}

/// Smoothing applied between consecutive assessments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicy {
    /// Points a score must clear past a threshold before the tier drops.
    /// Zero recomputes the tier independently every time.
    pub hysteresis_margin: f64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            hysteresis_margin: 0.0,
        }
    }
}

/// How collaborator-provided estimates are mixed into rule-based scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorPolicy {
    /// Weight of the collaborator's per-domain risk (0 = ignore, 1 = replace)
    pub weight: f64,
    /// Whether a collaborator risk level above the rule tier raises the tier
    pub may_escalate: bool,
}

impl Default for CollaboratorPolicy {
    fn default() -> Self {
        Self {
            weight: 0.25,
            may_escalate: true,
        }
    }
}

/// One keyword rule for the trigger detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

impl KeywordRule {
    pub fn new(keyword: &str, label: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            label: label.to_string(),
        }
    }
}

/// Trigger detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Notes must be longer than this (in characters) to be scanned
    pub min_text_len: usize,
    pub keywords: Vec<KeywordRule>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_text_len: 10,
            keywords: vec![
                KeywordRule::new("work", "Work Stress"),
                KeywordRule::new("sleep", "Sleep Issues"),
                KeywordRule::new("social", "Social Anxiety"),
                KeywordRule::new("family", "Family Tension"),
            ],
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML config
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, choosing the format from its extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            Some("json") => Self::from_json_str(&contents)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Serialize to TOML (used by `wellness config`)
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid("config", e.to_string()))
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid(
                "window_size",
                "must be at least 1".to_string(),
            ));
        }
        if self.trend.window == 0 {
            return Err(ConfigError::Invalid(
                "trend.window",
                "must be at least 1".to_string(),
            ));
        }
        if !self.trend.threshold.is_finite() || self.trend.threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "trend.threshold",
                format!("{} is not a non-negative number", self.trend.threshold),
            ));
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("thresholds.high_wellness_below", t.high_wellness_below),
            ("thresholds.medium_wellness_below", t.medium_wellness_below),
            ("thresholds.high_domain_risk", t.high_domain_risk),
            ("thresholds.medium_domain_risk", t.medium_domain_risk),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(name, format!("{value} is outside 0-100")));
            }
        }
        if t.high_wellness_below > t.medium_wellness_below {
            return Err(ConfigError::Invalid(
                "thresholds.high_wellness_below",
                "must not exceed medium_wellness_below".to_string(),
            ));
        }
        if t.medium_domain_risk > t.high_domain_risk {
            return Err(ConfigError::Invalid(
                "thresholds.medium_domain_risk",
                "must not exceed high_domain_risk".to_string(),
            ));
        }

        let margin = self.tier_policy.hysteresis_margin;
        if !margin.is_finite() || margin < 0.0 {
            return Err(ConfigError::Invalid(
                "tier_policy.hysteresis_margin",
                format!("{margin} is not a non-negative number"),
            ));
        }

        let weight = self.collaborator.weight;
        if !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::Invalid(
                "collaborator.weight",
                format!("{weight} is outside 0-1"),
            ));
        }

        if self.triggers.keywords.iter().any(|rule| rule.keyword.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "triggers.keywords",
                "keywords must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
