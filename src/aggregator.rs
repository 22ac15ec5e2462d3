//! Risk aggregation
//!
//! Combines the three domain sub-scores into an overall wellness score and a
//! risk tier. A single severe domain is enough to raise the tier on its own,
//! so one acute signal is never averaged away by two calm ones.
//!
//! Aggregation is pure: the assessment time is supplied by the caller and no
//! state is kept between calls.

use crate::collaborator::CollaboratorAssessment;
use crate::config::{CollaboratorPolicy, EngineConfig, TierPolicy, TierThresholds, NEUTRAL_RISK};
use crate::types::{Domain, DomainRisks, RiskAssessment, RiskTier};
use chrono::{DateTime, Utc};

/// Fallback insight when nothing stands out
const STEADY_INSIGHT: &str = "Continue monitoring your mental health patterns.";

/// Rule-based domain risks; `None` marks a domain with no data
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskInputs {
    pub mood: Option<f64>,
    pub sleep: Option<f64>,
    pub activity: Option<f64>,
}

impl RiskInputs {
    pub fn new(mood: f64, sleep: f64, activity: f64) -> Self {
        Self {
            mood: Some(mood),
            sleep: Some(sleep),
            activity: Some(activity),
        }
    }

    pub fn get(&self, domain: Domain) -> Option<f64> {
        match domain {
            Domain::Mood => self.mood,
            Domain::Sleep => self.sleep,
            Domain::Activity => self.activity,
        }
    }

    pub fn set(&mut self, domain: Domain, value: Option<f64>) {
        match domain {
            Domain::Mood => self.mood = value,
            Domain::Sleep => self.sleep = value,
            Domain::Activity => self.activity = value,
        }
    }
}

/// Aggregator holding thresholds and blending policy
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    thresholds: TierThresholds,
    tier_policy: TierPolicy,
    collaborator: CollaboratorPolicy,
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl RiskAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            tier_policy: config.tier_policy,
            collaborator: config.collaborator,
        }
    }

    /// Aggregate rule-based domain risks. Missing domains count as neutral (50).
    pub fn aggregate(&self, inputs: RiskInputs, as_of: DateTime<Utc>) -> RiskAssessment {
        self.aggregate_with(inputs, None, None, as_of)
    }

    /// Aggregate with optional collaborator input and the previously assigned tier.
    ///
    /// - Collaborator domain risks are mixed in by `collaborator.weight` and
    ///   fill domains that have no rule-based score.
    /// - A collaborator risk level above the rule tier escalates it when
    ///   `collaborator.may_escalate` is set; it never lowers the tier.
    /// - With a previous tier and a non-zero hysteresis margin, a downgrade
    ///   only happens if it still holds under thresholds widened by the margin.
    pub fn aggregate_with(
        &self,
        inputs: RiskInputs,
        collaborator: Option<&CollaboratorAssessment>,
        previous_tier: Option<RiskTier>,
        as_of: DateTime<Utc>,
    ) -> RiskAssessment {
        let weight = self.collaborator.weight;
        let blend = |rule: Option<f64>, external: Option<f64>| -> Option<f64> {
            match (sanitize(rule), sanitize(external)) {
                (Some(r), Some(e)) => Some(r * (1.0 - weight) + e * weight),
                (Some(r), None) => Some(r),
                (None, Some(e)) => Some(e),
                (None, None) => None,
            }
        };

        let domain_risk = |domain: Domain| -> f64 {
            blend(inputs.get(domain), collaborator.and_then(|c| c.domain_risk(domain)))
                .unwrap_or(NEUTRAL_RISK)
        };
        let domain_risks = DomainRisks {
            mood: domain_risk(Domain::Mood),
            sleep: domain_risk(Domain::Sleep),
            activity: domain_risk(Domain::Activity),
        };

        let rule_wellness = (100.0 - domain_risks.mean()).clamp(0.0, 100.0);
        let overall_wellness = match collaborator.and_then(|c| sanitize(c.overall_wellness)) {
            Some(external) => rule_wellness * (1.0 - weight) + external * weight,
            None => rule_wellness,
        };

        let mut risk_tier = classify(&self.thresholds, overall_wellness, &domain_risks);

        if self.collaborator.may_escalate {
            if let Some(external) = collaborator.and_then(|c| c.risk_level) {
                if external > risk_tier {
                    tracing::debug!(rule = %risk_tier, external = %external, "collaborator escalated tier");
                    risk_tier = external;
                }
            }
        }

        if let Some(previous) = previous_tier {
            risk_tier = self.apply_hysteresis(risk_tier, previous, overall_wellness, &domain_risks);
        }

        let insights = collaborator
            .and_then(|c| c.insights.clone())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| self.rule_insights(risk_tier, &domain_risks));

        RiskAssessment {
            overall_wellness,
            risk_tier,
            domain_risks,
            insights,
            computed_at: as_of,
        }
    }

    fn apply_hysteresis(
        &self,
        tier: RiskTier,
        previous: RiskTier,
        overall_wellness: f64,
        domain_risks: &DomainRisks,
    ) -> RiskTier {
        let margin = self.tier_policy.hysteresis_margin;
        if margin <= 0.0 || tier >= previous {
            return tier;
        }

        let sticky = classify(&self.thresholds.widened(margin), overall_wellness, domain_risks);
        let held = tier.max(sticky.min(previous));
        if held != tier {
            tracing::debug!(previous = %previous, computed = %tier, held = %held, "tier held by hysteresis");
        }
        held
    }

    /// Short explanation naming the domains that drove the tier
    fn rule_insights(&self, tier: RiskTier, risks: &DomainRisks) -> String {
        let elevated: Vec<String> = Domain::ALL
            .iter()
            .filter(|d| risks.get(**d) >= self.thresholds.medium_domain_risk)
            .map(|d| format!("{} ({:.0}/100)", d, risks.get(*d)))
            .collect();

        if elevated.is_empty() {
            return match tier {
                RiskTier::Low => STEADY_INSIGHT.to_string(),
                _ => format!("Overall wellness is reduced across domains. {}", STEADY_INSIGHT),
            };
        }

        match tier {
            RiskTier::High => format!(
                "High risk in {}. Immediate support is recommended.",
                elevated.join(", ")
            ),
            _ => format!(
                "Elevated risk in {}. Proactive steps can help prevent escalation.",
                elevated.join(", ")
            ),
        }
    }
}

/// high: wellness below the high bound or any domain at the high bound;
/// medium: the same checks against the medium bounds; otherwise low.
fn classify(thresholds: &TierThresholds, overall_wellness: f64, risks: &DomainRisks) -> RiskTier {
    let worst = risks.max();
    if overall_wellness < thresholds.high_wellness_below || worst >= thresholds.high_domain_risk {
        RiskTier::High
    } else if overall_wellness < thresholds.medium_wellness_below
        || worst >= thresholds.medium_domain_risk
    {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Clamp to 0-100, treating non-finite values as missing
fn sanitize(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 100.0))
}
