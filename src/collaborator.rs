//! External collaborators
//!
//! The engine talks to two things it does not own: a record store holding
//! scored entries and assessments, and a text-analysis service that labels
//! entries and may offer its own whole-history assessment. Both are traits so
//! callers can plug in real clients; `InMemoryRecordStore` backs the CLI and
//! the tests.
//!
//! Collaborator responses are untrusted. Model output is parsed into explicit
//! structured types here, with every number clamped before the engine sees it.

use crate::error::CollaboratorError;
use crate::types::{AssessmentReport, DailyMetricEntry, Domain, RiskTier, ScoredEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

const TEXT_ANALYZER: &str = "text analyzer";
const RECORD_STORE: &str = "record store";

/// Labels and an optional risk estimate for a single entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryAnalysis {
    #[serde(default)]
    pub labels: Vec<String>,
    /// Risk estimate on the 0-100 scale
    #[serde(default)]
    pub risk_estimate: Option<f64>,
}

/// A collaborator's own view of the recent history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorAssessment {
    #[serde(default)]
    pub insights: Option<String>,
    #[serde(default, alias = "riskLevel")]
    pub risk_level: Option<RiskTier>,
    #[serde(default, alias = "overallWellness")]
    pub overall_wellness: Option<f64>,
    #[serde(default, alias = "moodRisk")]
    pub mood_risk: Option<f64>,
    #[serde(default, alias = "sleepRisk")]
    pub sleep_risk: Option<f64>,
    #[serde(default, alias = "activityRisk")]
    pub activity_risk: Option<f64>,
}

/// Recent history handed to the text analyzer, most recent first per domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub mood: Vec<ScoredEntry>,
    pub sleep: Vec<ScoredEntry>,
    pub activity: Vec<ScoredEntry>,
}

impl HistorySnapshot {
    pub fn for_domain(&self, domain: Domain) -> &[ScoredEntry] {
        match domain {
            Domain::Mood => &self.mood,
            Domain::Sleep => &self.sleep,
            Domain::Activity => &self.activity,
        }
    }

    pub fn for_domain_mut(&mut self, domain: Domain) -> &mut Vec<ScoredEntry> {
        match domain {
            Domain::Mood => &mut self.mood,
            Domain::Sleep => &mut self.sleep,
            Domain::Activity => &mut self.activity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mood.is_empty() && self.sleep.is_empty() && self.activity.is_empty()
    }
}

/// Text-analysis collaborator (an LLM gateway in production)
pub trait TextAnalyzer: Send + Sync {
    /// Label a single entry (triggers, sleep risk factors, activity alerts)
    fn analyze_entry(&self, entry: &DailyMetricEntry) -> Result<EntryAnalysis, CollaboratorError>;

    /// Produce a whole-history assessment to blend with the rule-based one
    fn assess_history(
        &self,
        history: &HistorySnapshot,
    ) -> Result<CollaboratorAssessment, CollaboratorError>;
}

/// Record store collaborator
pub trait RecordStore: Send + Sync {
    fn insert_entry(&self, entry: &ScoredEntry) -> Result<(), CollaboratorError>;

    /// Up to `limit` entries of `domain`, most recent first
    fn recent_entries(
        &self,
        domain: Domain,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, CollaboratorError>;

    /// Up to `limit` entries of `domain` timestamped strictly before
    /// `before`, most recent first
    fn entries_before(
        &self,
        domain: Domain,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, CollaboratorError>;

    fn insert_assessment(&self, report: &AssessmentReport) -> Result<(), CollaboratorError>;

    fn latest_assessment(&self) -> Result<Option<AssessmentReport>, CollaboratorError>;
}

/// Record store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    entries: Mutex<Vec<ScoredEntry>>,
    assessments: Mutex<Vec<AssessmentReport>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored entries in insertion order
    pub fn entries(&self) -> Result<Vec<ScoredEntry>, CollaboratorError> {
        Ok(self.lock_entries()?.clone())
    }

    /// Snapshot of all stored assessments in insertion order
    pub fn assessments(&self) -> Result<Vec<AssessmentReport>, CollaboratorError> {
        self.assessments
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| CollaboratorError::Unreachable(RECORD_STORE.to_string()))
    }

    fn newest_first(
        &self,
        domain: Domain,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, CollaboratorError> {
        let mut matching: Vec<ScoredEntry> = self
            .lock_entries()?
            .iter()
            .filter(|e| e.entry.domain() == domain)
            .filter(|e| before.map_or(true, |cutoff| e.entry.timestamp() < cutoff))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps; reverse so
        // the later insert wins.
        matching.sort_by_key(|e| e.entry.timestamp());
        matching.reverse();
        matching.truncate(limit);
        Ok(matching)
    }

    fn lock_entries(&self) -> Result<std::sync::MutexGuard<'_, Vec<ScoredEntry>>, CollaboratorError> {
        self.entries
            .lock()
            .map_err(|_| CollaboratorError::Unreachable(RECORD_STORE.to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_entry(&self, entry: &ScoredEntry) -> Result<(), CollaboratorError> {
        self.lock_entries()?.push(entry.clone());
        Ok(())
    }

    fn recent_entries(
        &self,
        domain: Domain,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, CollaboratorError> {
        self.newest_first(domain, None, limit)
    }

    fn entries_before(
        &self,
        domain: Domain,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, CollaboratorError> {
        self.newest_first(domain, Some(before), limit)
    }

    fn insert_assessment(&self, report: &AssessmentReport) -> Result<(), CollaboratorError> {
        self.assessments
            .lock()
            .map_err(|_| CollaboratorError::Unreachable(RECORD_STORE.to_string()))?
            .push(report.clone());
        Ok(())
    }

    fn latest_assessment(&self) -> Result<Option<AssessmentReport>, CollaboratorError> {
        Ok(self.assessments()?.pop())
    }
}

impl EntryAnalysis {
    /// Parse free-form model output.
    ///
    /// Accepts either a JSON array of strings (`["Work Stress"]`) or an object
    /// carrying a label array and a risk score
    /// (`{"alerts": [...], "riskScore": 40}`), possibly wrapped in prose.
    pub fn from_model_output(content: &str) -> Result<Self, CollaboratorError> {
        let array_start = content.find('[');
        let object_start = content.find('{');

        let analysis = match (array_start, object_start) {
            (Some(a), o) if o.map_or(true, |o| a < o) => {
                let slice = json_slice(content, a, ']')?;
                let labels: Vec<String> = serde_json::from_str(slice).map_err(bad_response)?;
                EntryAnalysis {
                    labels,
                    risk_estimate: None,
                }
            }
            (_, Some(o)) => {
                let slice = json_slice(content, o, '}')?;
                let raw: RawEntryAnalysis = serde_json::from_str(slice).map_err(bad_response)?;
                EntryAnalysis {
                    labels: raw.labels,
                    risk_estimate: raw.risk_score,
                }
            }
            _ => {
                return Err(CollaboratorError::BadResponse(
                    TEXT_ANALYZER.to_string(),
                    "no JSON found".to_string(),
                ))
            }
        };

        Ok(analysis.sanitized())
    }

    /// Drop blank labels and clamp the estimate to 0-100
    pub fn sanitized(self) -> Self {
        EntryAnalysis {
            labels: self
                .labels
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            risk_estimate: self.risk_estimate.and_then(clamp_score),
        }
    }
}

impl CollaboratorAssessment {
    /// Parse free-form model output containing one JSON object
    pub fn from_model_output(content: &str) -> Result<Self, CollaboratorError> {
        let start = content.find('{').ok_or_else(|| {
            CollaboratorError::BadResponse(TEXT_ANALYZER.to_string(), "no JSON object found".to_string())
        })?;
        let slice = json_slice(content, start, '}')?;
        let raw: RawAssessment = serde_json::from_str(slice).map_err(bad_response)?;

        Ok(CollaboratorAssessment {
            insights: raw.insights,
            risk_level: raw.risk_level.as_deref().and_then(RiskTier::parse),
            overall_wellness: raw.overall_wellness,
            mood_risk: raw.mood_risk,
            sleep_risk: raw.sleep_risk,
            activity_risk: raw.activity_risk,
        }
        .sanitized())
    }

    /// Clamp every number to 0-100 and drop non-finite values and blank text
    pub fn sanitized(self) -> Self {
        CollaboratorAssessment {
            insights: self
                .insights
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            risk_level: self.risk_level,
            overall_wellness: self.overall_wellness.and_then(clamp_score),
            mood_risk: self.mood_risk.and_then(clamp_score),
            sleep_risk: self.sleep_risk.and_then(clamp_score),
            activity_risk: self.activity_risk.and_then(clamp_score),
        }
    }

    /// Per-domain risk offered by the collaborator, if any
    pub fn domain_risk(&self, domain: Domain) -> Option<f64> {
        match domain {
            Domain::Mood => self.mood_risk,
            Domain::Sleep => self.sleep_risk,
            Domain::Activity => self.activity_risk,
        }
    }
}

#[derive(Deserialize)]
struct RawEntryAnalysis {
    #[serde(
        default,
        alias = "alerts",
        alias = "triggers",
        alias = "risk_factors",
        alias = "riskFactors"
    )]
    labels: Vec<String>,
    #[serde(default, alias = "riskScore", alias = "risk_estimate")]
    risk_score: Option<f64>,
}

#[derive(Deserialize)]
struct RawAssessment {
    #[serde(default)]
    insights: Option<String>,
    #[serde(default, alias = "riskLevel")]
    risk_level: Option<String>,
    #[serde(default, alias = "overallWellness")]
    overall_wellness: Option<f64>,
    #[serde(default, alias = "moodRisk")]
    mood_risk: Option<f64>,
    #[serde(default, alias = "sleepRisk")]
    sleep_risk: Option<f64>,
    #[serde(default, alias = "activityRisk")]
    activity_risk: Option<f64>,
}

/// Slice from `start` through the last `close` delimiter
fn json_slice(content: &str, start: usize, close: char) -> Result<&str, CollaboratorError> {
    match content.rfind(close) {
        Some(end) if end > start => Ok(&content[start..=end]),
        _ => Err(CollaboratorError::BadResponse(
            TEXT_ANALYZER.to_string(),
            format!("unterminated JSON, expected '{close}'"),
        )),
    }
}

fn bad_response(e: serde_json::Error) -> CollaboratorError {
    CollaboratorError::BadResponse(TEXT_ANALYZER.to_string(), e.to_string())
}

fn clamp_score(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}
