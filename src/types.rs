//! Core types for the Synheart Wellness engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw daily entries, domain scores, trends, assessments and the
//! intervention catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Category of self-reported signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Mood,
    Sleep,
    Activity,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Mood, Domain::Sleep, Domain::Activity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Mood => "mood",
            Domain::Sleep => "sleep",
            Domain::Activity => "activity",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported mood check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    /// Mood on a 1-10 scale (10 = best)
    pub mood_value: i32,
    /// Free-text note, may be empty
    #[serde(default)]
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// Self-reported night of sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepEntry {
    /// Time of day the user went to bed ("HH:MM")
    pub bedtime: String,
    /// Time of day the user woke up ("HH:MM")
    pub wake_time: String,
    /// Sleep quality on a 1-10 scale (10 = best)
    pub quality_value: i32,
    /// Number of times sleep was interrupted
    #[serde(default)]
    pub interruption_count: i64,
    pub timestamp: DateTime<Utc>,
}

/// Self-reported daily physical and social activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub steps: i64,
    pub screen_time_hours: f64,
    pub social_interaction_count: i64,
    pub exercise_minutes: i64,
    #[serde(default)]
    pub outdoor_time_hours: f64,
    pub timestamp: DateTime<Utc>,
}

/// A raw daily entry, discriminated by domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum DailyMetricEntry {
    Mood(MoodEntry),
    Sleep(SleepEntry),
    Activity(ActivityEntry),
}

impl DailyMetricEntry {
    pub fn domain(&self) -> Domain {
        match self {
            DailyMetricEntry::Mood(_) => Domain::Mood,
            DailyMetricEntry::Sleep(_) => Domain::Sleep,
            DailyMetricEntry::Activity(_) => Domain::Activity,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DailyMetricEntry::Mood(e) => e.timestamp,
            DailyMetricEntry::Sleep(e) => e.timestamp,
            DailyMetricEntry::Activity(e) => e.timestamp,
        }
    }

    /// Free text the entry carries, if any
    pub fn note(&self) -> Option<&str> {
        match self {
            DailyMetricEntry::Mood(e) if !e.note.is_empty() => Some(e.note.as_str()),
            _ => None,
        }
    }
}

/// A single domain's risk sub-score (0-100, higher = worse)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: Domain,
    pub sub_score: f64,
    /// Timestamp of the entry the score was computed from
    pub computed_at: DateTime<Utc>,
}

/// An entry together with everything derived from it at ingestion time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub entry: DailyMetricEntry,
    pub score: DomainScore,
    /// Risk signals only: triggers (mood), risk factors (sleep) or
    /// collaborator alerts (activity)
    #[serde(default)]
    pub labels: Vec<String>,
    /// Positive observations, kept apart from the risk signals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    /// Composite activity band, set for activity entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_band: Option<ActivityLevel>,
    /// Risk estimate returned by the text-analysis collaborator (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborator_estimate: Option<f64>,
}

/// Directional change of a domain over a rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

/// Which way is "better" for the values fed to the trend analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDirection {
    /// Wellness-style values (mood, quality)
    HigherIsBetter,
    /// Risk-style values (domain sub-scores)
    LowerIsBetter,
}

/// Trend per domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTrends {
    pub mood: TrendLabel,
    pub sleep: TrendLabel,
    pub activity: TrendLabel,
}

impl Default for DomainTrends {
    fn default() -> Self {
        Self {
            mood: TrendLabel::InsufficientData,
            sleep: TrendLabel::InsufficientData,
            activity: TrendLabel::InsufficientData,
        }
    }
}

/// Discrete risk classification, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }

    /// Parse a tier label, ignoring case and surrounding whitespace
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskTier::Low),
            "medium" | "moderate" => Some(RiskTier::Medium),
            "high" => Some(RiskTier::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-domain risk values (0-100 each)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainRisks {
    pub mood: f64,
    pub sleep: f64,
    pub activity: f64,
}

impl DomainRisks {
    pub fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::Mood => self.mood,
            Domain::Sleep => self.sleep,
            Domain::Activity => self.activity,
        }
    }

    pub fn max(&self) -> f64 {
        self.mood.max(self.sleep).max(self.activity)
    }

    pub fn mean(&self) -> f64 {
        (self.mood + self.sleep + self.activity) / 3.0
    }
}

/// Result of one aggregation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Inverse aggregate of domain risks (0-100, higher = better)
    pub overall_wellness: f64,
    pub risk_tier: RiskTier,
    pub domain_risks: DomainRisks,
    pub insights: String,
    pub computed_at: DateTime<Utc>,
}

/// Banded composite activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Moderate,
    Low,
}

/// A suggested intervention from the static catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionStrategy {
    pub title: String,
    pub description: String,
    pub action_label: String,
    pub urgent: bool,
    pub requires_emergency_resources: bool,
}

/// A crisis support line surfaced alongside elevated-tier interventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub number: String,
    pub available: String,
}

/// Everything the presentation layer needs to render a tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionPlan {
    pub tier: RiskTier,
    pub headline: String,
    pub guidance: String,
    pub strategies: Vec<InterventionStrategy>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// A failure that was absorbed into a best-effort result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    TextAnalysisUnavailable { reason: String },
    HistoryUnavailable { domain: Option<Domain>, reason: String },
    PersistenceFailed { reason: String },
    /// A batch entry failed validation and was left out; `index` is its
    /// position in the submitted batch
    RejectedEntry { index: usize, reason: String },
}

/// Outcome of ingesting one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub scored: ScoredEntry,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

/// Outcome of one assessment run, as persisted and returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub assessment: RiskAssessment,
    pub trends: DomainTrends,
    pub plan: InterventionPlan,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_tagged_by_domain() {
        let json = r#"{"domain":"sleep","bedtime":"23:00","wake_time":"07:00",
                       "quality_value":7,"timestamp":"2024-01-15T07:00:00Z"}"#;
        let entry: DailyMetricEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.domain(), Domain::Sleep);
        assert_eq!(entry.note(), None);
        match entry {
            DailyMetricEntry::Sleep(sleep) => assert_eq!(sleep.interruption_count, 0),
            other => panic!("expected sleep entry, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let json = r#"{"domain":"diet","timestamp":"2024-01-15T07:00:00Z"}"#;
        assert!(serde_json::from_str::<DailyMetricEntry>(json).is_err());
    }

    #[test]
    fn test_mood_note() {
        let json = r#"{"domain":"mood","mood_value":4,"note":"rough day","timestamp":"2024-01-15T07:00:00Z"}"#;
        let entry: DailyMetricEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.note(), Some("rough day"));
    }

    #[test]
    fn test_risk_tier_order_and_parse() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert_eq!(RiskTier::parse(" Moderate "), Some(RiskTier::Medium));
        assert_eq!(RiskTier::parse("HIGH"), Some(RiskTier::High));
        assert_eq!(RiskTier::parse("critical"), None);
        assert_eq!(serde_json::to_string(&RiskTier::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_domain_risks_helpers() {
        let risks = DomainRisks {
            mood: 30.0,
            sleep: 60.0,
            activity: 0.0,
        };
        assert_eq!(risks.max(), 60.0);
        assert_eq!(risks.mean(), 30.0);
        assert_eq!(risks.get(Domain::Sleep), 60.0);
    }

    #[test]
    fn test_degradation_serialization() {
        let degradation = Degradation::HistoryUnavailable {
            domain: Some(Domain::Mood),
            reason: "record store timed out".to_string(),
        };
        let value = serde_json::to_value(&degradation).unwrap();
        assert_eq!(value["kind"], "history_unavailable");
        assert_eq!(value["domain"], "mood");
    }

    #[test]
    fn test_scored_entry_omits_empty_extras() {
        let json = r#"{
            "entry": {"domain":"mood","mood_value":6,"timestamp":"2024-01-15T07:00:00Z"},
            "score": {"domain":"mood","sub_score":40.0,"computed_at":"2024-01-15T07:00:00Z"}
        }"#;
        let scored: ScoredEntry = serde_json::from_str(json).unwrap();
        assert!(scored.highlights.is_empty());
        assert_eq!(scored.activity_band, None);

        let value = serde_json::to_value(&scored).unwrap();
        assert!(value.get("highlights").is_none());
        assert!(value.get("activity_band").is_none());
    }

    #[test]
    fn test_rejected_entry_serialization() {
        let degradation = Degradation::RejectedEntry {
            index: 2,
            reason: "Invalid value for steps: -5 is negative".to_string(),
        };
        let value = serde_json::to_value(&degradation).unwrap();
        assert_eq!(value["kind"], "rejected_entry");
        assert_eq!(value["index"], 2);
    }
}
