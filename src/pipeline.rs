//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Wellness.
//! `WellnessEngine` runs the two operations the rest of the system calls:
//! ingesting a single daily entry and assessing the recent history.
//!
//! Collaborator failures never fail an assessment. They are recorded as
//! `Degradation` values on the result and logged, and the engine carries on
//! with whatever data it still has.

use crate::aggregator::{RiskAggregator, RiskInputs};
use crate::collaborator::{
    CollaboratorAssessment, EntryAnalysis, HistorySnapshot, InMemoryRecordStore, RecordStore,
    TextAnalyzer,
};
use crate::config::EngineConfig;
use crate::error::{CollaboratorError, EngineError};
use crate::interventions::InterventionSelector;
use crate::normalizer::Normalizer;
use crate::trend::TrendAnalyzer;
use crate::triggers::{merge_labels, KeywordTriggerDetector, TriggerSource};
use crate::types::{
    AssessmentReport, DailyMetricEntry, Degradation, Domain, DomainTrends, IngestOutcome,
    RiskTier, ScoredEntry, TrendLabel,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Scoring and assessment engine.
///
/// Holds configuration only; entries and assessments live in the
/// `RecordStore` passed to each call.
pub struct WellnessEngine {
    config: EngineConfig,
    trends: TrendAnalyzer,
    aggregator: RiskAggregator,
    rule_triggers: Box<dyn TriggerSource>,
}

impl Default for WellnessEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl WellnessEngine {
    /// Create an engine from an already validated config
    pub fn new(config: EngineConfig) -> Self {
        Self {
            trends: TrendAnalyzer::new(&config.trend),
            aggregator: RiskAggregator::new(&config),
            rule_triggers: Box::new(KeywordTriggerDetector::new(&config.triggers)),
            config,
        }
    }

    /// Validate `config` and create an engine
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Replace the keyword detector used on mood notes
    pub fn with_trigger_source(mut self, source: Box<dyn TriggerSource>) -> Self {
        self.rule_triggers = source;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rule-based scoring of one entry, without any collaborator.
    ///
    /// `history` holds earlier entries; only sleep scoring reads it. Risk
    /// signals go to `labels`; activity highlights and band are reported
    /// separately.
    pub fn score(
        &self,
        entry: &DailyMetricEntry,
        history: &[DailyMetricEntry],
    ) -> Result<ScoredEntry, EngineError> {
        let score = Normalizer::score(entry, history)?;
        let labels = self.rule_labels(entry, history)?;
        let (highlights, activity_band) = match entry {
            DailyMetricEntry::Activity(activity) => {
                let breakdown = Normalizer::score_activity(activity)?;
                (breakdown.highlights, Some(breakdown.band))
            }
            _ => (Vec::new(), None),
        };
        Ok(ScoredEntry {
            entry: entry.clone(),
            score,
            labels: labels.into_iter().collect(),
            highlights,
            activity_band,
            collaborator_estimate: None,
        })
    }

    /// Score an entry, label it, and persist it.
    ///
    /// Invalid input is rejected before anything is read or written. Failing
    /// to read prior history or to reach the analyzer degrades the result;
    /// failing to persist is an error.
    pub fn ingest(
        &self,
        entry: DailyMetricEntry,
        store: &dyn RecordStore,
        analyzer: Option<&dyn TextAnalyzer>,
    ) -> Result<IngestOutcome, EngineError> {
        let mut degradations = Vec::new();

        // Reject bad input before touching collaborators
        Normalizer::score(&entry, &[])?;

        let history = match entry.domain() {
            Domain::Sleep => match store.entries_before(
                Domain::Sleep,
                entry.timestamp(),
                self.config.window_size,
            ) {
                Ok(prior) => prior.into_iter().map(|e| e.entry).collect(),
                Err(e) => {
                    degrade(
                        &mut degradations,
                        Degradation::HistoryUnavailable {
                            domain: Some(Domain::Sleep),
                            reason: e.to_string(),
                        },
                    );
                    Vec::new()
                }
            },
            _ => Vec::new(),
        };

        let mut scored = self.score(&entry, &history)?;

        if let Some(analyzer) = analyzer {
            match analyzer.analyze_entry(&entry) {
                Ok(analysis) => {
                    let analysis: EntryAnalysis = analysis.sanitized();
                    let rule_labels: BTreeSet<String> = scored.labels.drain(..).collect();
                    scored.labels = merge_labels(rule_labels, analysis.labels)
                        .into_iter()
                        .collect();
                    scored.collaborator_estimate = analysis.risk_estimate;
                }
                Err(e) => degrade(
                    &mut degradations,
                    Degradation::TextAnalysisUnavailable {
                        reason: e.to_string(),
                    },
                ),
            }
        }

        store.insert_entry(&scored)?;

        tracing::info!(
            domain = %scored.score.domain,
            sub_score = scored.score.sub_score,
            labels = scored.labels.len(),
            degraded = !degradations.is_empty(),
            "ingested entry"
        );

        Ok(IngestOutcome {
            scored,
            degradations,
        })
    }

    /// Assess the recent history held by `store` as of `as_of`.
    ///
    /// Always produces a report. The report is persisted; if that fails the
    /// failure is listed in `degradations`.
    pub fn assess(
        &self,
        store: &dyn RecordStore,
        analyzer: Option<&dyn TextAnalyzer>,
        as_of: DateTime<Utc>,
    ) -> AssessmentReport {
        self.assess_with(store, analyzer, as_of, Vec::new())
    }

    /// `assess`, starting from degradations already recorded by the caller
    fn assess_with(
        &self,
        store: &dyn RecordStore,
        analyzer: Option<&dyn TextAnalyzer>,
        as_of: DateTime<Utc>,
        mut degradations: Vec<Degradation>,
    ) -> AssessmentReport {
        let mut snapshot = HistorySnapshot::default();

        for domain in Domain::ALL {
            match store.recent_entries(domain, self.config.window_size) {
                Ok(entries) => *snapshot.for_domain_mut(domain) = entries,
                Err(e) => degrade(
                    &mut degradations,
                    Degradation::HistoryUnavailable {
                        domain: Some(domain),
                        reason: e.to_string(),
                    },
                ),
            }
        }

        let mut inputs = RiskInputs::default();
        for domain in Domain::ALL {
            let latest = snapshot.for_domain(domain).first().map(|e| e.score.sub_score);
            inputs.set(domain, latest);
        }

        let trends = DomainTrends {
            mood: self.domain_trend(&snapshot, Domain::Mood),
            sleep: self.domain_trend(&snapshot, Domain::Sleep),
            activity: self.domain_trend(&snapshot, Domain::Activity),
        };

        let collaborator = match analyzer {
            Some(analyzer) if !snapshot.is_empty() => match analyzer.assess_history(&snapshot) {
                Ok(assessment) => Some(assessment.sanitized()),
                Err(e) => {
                    degrade(
                        &mut degradations,
                        Degradation::TextAnalysisUnavailable {
                            reason: e.to_string(),
                        },
                    );
                    None
                }
            },
            _ => None,
        };

        let previous_tier = match store.latest_assessment() {
            Ok(previous) => previous.map(|r| r.assessment.risk_tier),
            Err(e) => {
                degrade(
                    &mut degradations,
                    Degradation::HistoryUnavailable {
                        domain: None,
                        reason: e.to_string(),
                    },
                );
                None
            }
        };

        let assessment =
            self.aggregator
                .aggregate_with(inputs, collaborator.as_ref(), previous_tier, as_of);

        let mut report = AssessmentReport {
            id: Uuid::new_v4(),
            plan: InterventionSelector::plan(assessment.risk_tier),
            assessment,
            trends,
            degradations,
        };

        if let Err(e) = store.insert_assessment(&report) {
            degrade(
                &mut report.degradations,
                Degradation::PersistenceFailed {
                    reason: e.to_string(),
                },
            );
        }

        tracing::info!(
            id = %report.id,
            tier = %report.assessment.risk_tier,
            overall_wellness = report.assessment.overall_wellness,
            degraded = !report.degradations.is_empty(),
            "completed assessment"
        );

        report
    }

    fn domain_trend(&self, snapshot: &HistorySnapshot, domain: Domain) -> TrendLabel {
        let scores: Vec<_> = snapshot.for_domain(domain).iter().map(|e| e.score).collect();
        self.trends.analyze_scores(&scores)
    }

    fn rule_labels(
        &self,
        entry: &DailyMetricEntry,
        history: &[DailyMetricEntry],
    ) -> Result<BTreeSet<String>, EngineError> {
        let mut labels: BTreeSet<String> = Normalizer::labels(entry, history)?.into_iter().collect();
        if let Some(note) = entry.note() {
            labels.extend(self.rule_triggers.detect(note));
        }
        Ok(labels)
    }
}

impl AssessmentReport {
    /// Fail unless at least one domain had enough history for a trend
    pub fn require_trend(&self) -> Result<(), EngineError> {
        let trends = [self.trends.mood, self.trends.sleep, self.trends.activity];
        if trends.iter().all(|t| *t == TrendLabel::InsufficientData) {
            return Err(EngineError::InsufficientHistory(
                "no domain has enough entries to establish a trend".to_string(),
            ));
        }
        Ok(())
    }
}

fn degrade(degradations: &mut Vec<Degradation>, degradation: Degradation) {
    tracing::warn!(?degradation, "continuing with degraded result");
    degradations.push(degradation);
}

// ============================================================================
// Stateless JSON API
// ============================================================================

#[derive(Deserialize)]
struct ScoreRequest {
    entry: DailyMetricEntry,
    #[serde(default)]
    history: Vec<DailyMetricEntry>,
}

#[derive(Deserialize)]
struct AssessRequest {
    #[serde(default)]
    entries: Vec<DailyMetricEntry>,
    #[serde(default)]
    collaborator: Option<CollaboratorAssessment>,
    #[serde(default)]
    previous_tier: Option<RiskTier>,
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
}

/// Analyzer that replays a fixed whole-history assessment
struct FixedAssessment(CollaboratorAssessment);

impl TextAnalyzer for FixedAssessment {
    fn analyze_entry(&self, _entry: &DailyMetricEntry) -> Result<EntryAnalysis, CollaboratorError> {
        Ok(EntryAnalysis::default())
    }

    fn assess_history(
        &self,
        _history: &HistorySnapshot,
    ) -> Result<CollaboratorAssessment, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Score a single entry with default rules.
///
/// # Arguments
/// * `request_json` - `{"entry": {...}, "history": [...]}` or a bare entry
///
/// # Returns
/// The `ScoredEntry` as JSON
///
/// # Example
/// ```ignore
/// let scored = score_entry_json(
///     r#"{"domain":"mood","mood_value":3,"timestamp":"2024-01-15T08:00:00Z"}"#.to_string()
/// )?;
/// ```
pub fn score_entry_json(request_json: String) -> Result<String, EngineError> {
    let value: serde_json::Value = serde_json::from_str(&request_json)?;
    let request = if value.get("entry").is_some() {
        serde_json::from_value::<ScoreRequest>(value)?
    } else {
        ScoreRequest {
            entry: serde_json::from_value(value)?,
            history: Vec::new(),
        }
    };

    let scored = WellnessEngine::default().score(&request.entry, &request.history)?;
    Ok(serde_json::to_string(&scored)?)
}

/// Run a full assessment over a batch of entries with default rules.
///
/// Entries are ingested oldest first into a scratch store, so sleep
/// regularity sees earlier nights. An entry that fails validation is left out
/// and listed as a `rejected_entry` degradation; the rest are still assessed.
/// An optional `collaborator` assessment is blended in and `previous_tier`
/// seeds hysteresis.
///
/// # Returns
/// The `AssessmentReport` as JSON
pub fn assess_risks_json(request_json: String) -> Result<String, EngineError> {
    let request: AssessRequest = serde_json::from_str(&request_json)?;
    let engine = WellnessEngine::default();
    let report = assess_batch(&engine, request)?;
    Ok(serde_json::to_string(&report)?)
}

/// Intervention plan for a tier label (`low`, `medium`/`moderate`, `high`)
pub fn interventions_json(tier: &str) -> Result<String, EngineError> {
    let tier = RiskTier::parse(tier)
        .ok_or_else(|| EngineError::invalid("tier", format!("unknown risk tier '{}'", tier.trim())))?;
    Ok(serde_json::to_string(&InterventionSelector::plan(tier))?)
}

fn assess_batch(
    engine: &WellnessEngine,
    request: AssessRequest,
) -> Result<AssessmentReport, EngineError> {
    let store = InMemoryRecordStore::new();
    let as_of = request.as_of.unwrap_or_else(Utc::now);

    if let Some(previous_tier) = request.previous_tier {
        // Seed the store so hysteresis sees the prior tier
        let seed = engine
            .aggregator
            .aggregate(RiskInputs::default(), as_of);
        let mut seed = AssessmentReport {
            id: Uuid::nil(),
            plan: InterventionSelector::plan(previous_tier),
            assessment: seed,
            trends: DomainTrends::default(),
            degradations: Vec::new(),
        };
        seed.assessment.risk_tier = previous_tier;
        store.insert_assessment(&seed)?;
    }

    let mut entries: Vec<(usize, DailyMetricEntry)> =
        request.entries.into_iter().enumerate().collect();
    entries.sort_by_key(|(_, e)| e.timestamp());

    let mut rejected = Vec::new();
    for (index, entry) in entries {
        match engine.ingest(entry, &store, None) {
            Ok(_) => {}
            Err(e @ EngineError::InvalidInput { .. }) => degrade(
                &mut rejected,
                Degradation::RejectedEntry {
                    index,
                    reason: e.to_string(),
                },
            ),
            Err(e) => return Err(e),
        }
    }

    let analyzer = request.collaborator.map(FixedAssessment);
    Ok(engine.assess_with(
        &store,
        analyzer.as_ref().map(|a| a as &dyn TextAnalyzer),
        as_of,
        rejected,
    ))
}

/// Run a batch assessment with an explicit engine (used by the CLI)
pub fn assess_entries(
    engine: &WellnessEngine,
    entries: Vec<DailyMetricEntry>,
    collaborator: Option<CollaboratorAssessment>,
    as_of: DateTime<Utc>,
) -> Result<AssessmentReport, EngineError> {
    assess_batch(
        engine,
        AssessRequest {
            entries,
            collaborator,
            previous_tier: None,
            as_of: Some(as_of),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggers::NoTriggers;
    use crate::types::{ActivityEntry, ActivityLevel, MoodEntry, SleepEntry};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::days(n)
    }

    fn mood(value: i32, note: &str, n: i64) -> DailyMetricEntry {
        DailyMetricEntry::Mood(MoodEntry {
            mood_value: value,
            note: note.to_string(),
            timestamp: day(n),
        })
    }

    fn sleep(bedtime: &str, wake_time: &str, quality: i32, n: i64) -> DailyMetricEntry {
        DailyMetricEntry::Sleep(SleepEntry {
            bedtime: bedtime.to_string(),
            wake_time: wake_time.to_string(),
            quality_value: quality,
            interruption_count: 0,
            timestamp: day(n),
        })
    }

    fn activity(steps: i64, n: i64) -> DailyMetricEntry {
        activity_with(steps, 4.0, 3, 30, n)
    }

    fn activity_with(steps: i64, screen: f64, social: i64, exercise: i64, n: i64) -> DailyMetricEntry {
        DailyMetricEntry::Activity(ActivityEntry {
            steps,
            screen_time_hours: screen,
            social_interaction_count: social,
            exercise_minutes: exercise,
            outdoor_time_hours: 1.0,
            timestamp: day(n),
        })
    }

    /// Store whose operations can be made to fail individually
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryRecordStore,
        fail_reads: bool,
        fail_writes: bool,
        fail_assessment_writes: bool,
    }

    impl RecordStore for FlakyStore {
        fn insert_entry(&self, entry: &ScoredEntry) -> Result<(), CollaboratorError> {
            if self.fail_writes {
                return Err(CollaboratorError::Timeout("record store".to_string()));
            }
            self.inner.insert_entry(entry)
        }

        fn recent_entries(
            &self,
            domain: Domain,
            limit: usize,
        ) -> Result<Vec<ScoredEntry>, CollaboratorError> {
            if self.fail_reads {
                return Err(CollaboratorError::Unreachable("record store".to_string()));
            }
            self.inner.recent_entries(domain, limit)
        }

        fn entries_before(
            &self,
            domain: Domain,
            before: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<ScoredEntry>, CollaboratorError> {
            if self.fail_reads {
                return Err(CollaboratorError::Unreachable("record store".to_string()));
            }
            self.inner.entries_before(domain, before, limit)
        }

        fn insert_assessment(&self, report: &AssessmentReport) -> Result<(), CollaboratorError> {
            if self.fail_assessment_writes {
                return Err(CollaboratorError::Timeout("record store".to_string()));
            }
            self.inner.insert_assessment(report)
        }

        fn latest_assessment(&self) -> Result<Option<AssessmentReport>, CollaboratorError> {
            if self.fail_reads {
                return Err(CollaboratorError::Unreachable("record store".to_string()));
            }
            self.inner.latest_assessment()
        }
    }

    struct StubAnalyzer {
        entry: Result<EntryAnalysis, CollaboratorError>,
        history: Result<CollaboratorAssessment, CollaboratorError>,
        calls: Mutex<usize>,
    }

    impl StubAnalyzer {
        fn failing() -> Self {
            Self {
                entry: Err(CollaboratorError::Timeout("text analyzer".to_string())),
                history: Err(CollaboratorError::Timeout("text analyzer".to_string())),
                calls: Mutex::new(0),
            }
        }

        fn labels(labels: &[&str], estimate: Option<f64>) -> Self {
            Self {
                entry: Ok(EntryAnalysis {
                    labels: labels.iter().map(|l| l.to_string()).collect(),
                    risk_estimate: estimate,
                }),
                history: Ok(CollaboratorAssessment::default()),
                calls: Mutex::new(0),
            }
        }
    }

    impl TextAnalyzer for StubAnalyzer {
        fn analyze_entry(&self, _entry: &DailyMetricEntry) -> Result<EntryAnalysis, CollaboratorError> {
            *self.calls.lock().unwrap() += 1;
            self.entry.clone()
        }

        fn assess_history(
            &self,
            _history: &HistorySnapshot,
        ) -> Result<CollaboratorAssessment, CollaboratorError> {
            *self.calls.lock().unwrap() += 1;
            self.history.clone()
        }
    }

    #[test]
    fn test_ingest_mood_with_triggers() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();

        let outcome = engine
            .ingest(mood(3, "Work has been rough this week", 0), &store, None)
            .unwrap();

        assert_eq!(outcome.scored.score.sub_score, 70.0);
        assert_eq!(outcome.scored.labels, vec!["Work Stress"]);
        assert!(outcome.degradations.is_empty());
        assert_eq!(store.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_ingest_merges_collaborator_labels() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();
        let analyzer = StubAnalyzer::labels(&["Isolation", "Work Stress"], Some(62.0));

        let outcome = engine
            .ingest(mood(4, "work and family both hard", 0), &store, Some(&analyzer))
            .unwrap();

        assert_eq!(
            outcome.scored.labels,
            vec!["Family Tension", "Isolation", "Work Stress"]
        );
        assert_eq!(outcome.scored.collaborator_estimate, Some(62.0));
        // Rule score is kept as-is
        assert_eq!(outcome.scored.score.sub_score, 60.0);
    }

    #[test]
    fn test_rule_triggers_can_be_disabled() {
        let engine = WellnessEngine::default().with_trigger_source(Box::new(NoTriggers));
        let store = InMemoryRecordStore::new();
        let analyzer = StubAnalyzer::labels(&["Burnout"], None);

        let outcome = engine
            .ingest(mood(4, "work has been stressful", 0), &store, Some(&analyzer))
            .unwrap();
        assert_eq!(outcome.scored.labels, vec!["Burnout"]);
    }

    #[test]
    fn test_ingest_degrades_when_analyzer_fails() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();
        let analyzer = StubAnalyzer::failing();

        let outcome = engine
            .ingest(mood(2, "family argument again", 0), &store, Some(&analyzer))
            .unwrap();

        assert_eq!(outcome.scored.labels, vec!["Family Tension"]);
        assert_eq!(outcome.degradations.len(), 1);
        assert!(matches!(
            outcome.degradations[0],
            Degradation::TextAnalysisUnavailable { .. }
        ));
    }

    #[test]
    fn test_ingest_rejects_invalid_input_before_collaborators() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();
        let analyzer = StubAnalyzer::labels(&[], None);

        let err = engine
            .ingest(mood(11, "", 0), &store, Some(&analyzer))
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(*analyzer.calls.lock().unwrap(), 0);
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_ingest_persistence_failure_is_server_error() {
        let engine = WellnessEngine::default();
        let store = FlakyStore {
            fail_writes: true,
            ..Default::default()
        };

        let err = engine.ingest(activity(9000, 0), &store, None).unwrap_err();
        assert!(matches!(err, EngineError::CollaboratorUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_ingest_sleep_uses_prior_bedtimes() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();

        for n in 0..3 {
            engine
                .ingest(sleep("22:00", "06:00", 8, n), &store, None)
                .unwrap();
        }
        let outcome = engine
            .ingest(sleep("02:00", "10:00", 8, 3), &store, None)
            .unwrap();

        assert_eq!(outcome.scored.score.sub_score, 25.0);
        assert_eq!(outcome.scored.labels, vec!["Irregular Sleep Schedule"]);
    }

    #[test]
    fn test_ingest_backdated_sleep_sees_earlier_nights() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();

        for n in 0..3 {
            engine
                .ingest(sleep("22:00", "06:00", 8, n), &store, None)
                .unwrap();
        }
        // A full window of later nights must not hide the earlier ones
        for n in 10..17 {
            engine
                .ingest(sleep("02:00", "10:00", 8, n), &store, None)
                .unwrap();
        }

        let outcome = engine
            .ingest(sleep("02:00", "10:00", 8, 3), &store, None)
            .unwrap();
        assert_eq!(outcome.scored.score.sub_score, 25.0);
        assert_eq!(outcome.scored.labels, vec!["Irregular Sleep Schedule"]);
    }

    #[test]
    fn test_ingest_activity_keeps_highlights_apart_from_alerts() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();
        let analyzer = StubAnalyzer::labels(&["Excessive screen time"], Some(30.0));

        let outcome = engine
            .ingest(activity_with(9000, 2.0, 3, 60, 0), &store, Some(&analyzer))
            .unwrap();

        assert_eq!(outcome.scored.labels, vec!["Excessive screen time"]);
        assert_eq!(
            outcome.scored.highlights,
            vec![
                "Good physical activity levels",
                "Healthy social engagement",
                "Balanced screen time",
            ]
        );
        assert_eq!(outcome.scored.activity_band, Some(ActivityLevel::High));
    }

    #[test]
    fn test_non_activity_entries_have_no_band() {
        let engine = WellnessEngine::default();
        let scored = engine.score(&mood(5, "", 0), &[]).unwrap();
        assert!(scored.highlights.is_empty());
        assert_eq!(scored.activity_band, None);
    }

    #[test]
    fn test_ingest_sleep_without_history_degrades() {
        let engine = WellnessEngine::default();
        let store = FlakyStore {
            fail_reads: true,
            ..Default::default()
        };

        let outcome = engine
            .ingest(sleep("02:00", "10:00", 8, 3), &store, None)
            .unwrap();

        assert_eq!(outcome.scored.score.sub_score, 0.0);
        assert_eq!(
            outcome.degradations,
            vec![Degradation::HistoryUnavailable {
                domain: Some(Domain::Sleep),
                reason: "record store is unreachable".to_string(),
            }]
        );
    }

    #[test]
    fn test_assess_uses_latest_scores_and_trends() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();

        for (n, value) in [8, 8, 8, 3, 3, 3].iter().enumerate() {
            engine
                .ingest(mood(*value, "", n as i64), &store, None)
                .unwrap();
        }
        engine.ingest(activity(10000, 5), &store, None).unwrap();

        let report = engine.assess(&store, None, day(6));

        assert_eq!(report.assessment.domain_risks.mood, 70.0);
        assert_eq!(report.assessment.domain_risks.sleep, 50.0);
        assert_eq!(report.assessment.domain_risks.activity, 35.0);
        assert_eq!(report.assessment.risk_tier, RiskTier::High);
        assert_eq!(report.assessment.computed_at, day(6));
        assert_eq!(report.trends.mood, TrendLabel::Declining);
        assert_eq!(report.trends.sleep, TrendLabel::InsufficientData);
        assert_eq!(report.plan.tier, RiskTier::High);
        assert_eq!(report.plan.strategies.len(), 3);
        assert!(report.degradations.is_empty());
        assert_eq!(store.assessments().unwrap().len(), 1);
    }

    #[test]
    fn test_assess_empty_store_is_neutral() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();
        let analyzer = StubAnalyzer::failing();

        let report = engine.assess(&store, Some(&analyzer), day(0));

        assert_eq!(report.assessment.overall_wellness, 50.0);
        assert_eq!(report.assessment.risk_tier, RiskTier::Medium);
        // Nothing to send the analyzer
        assert_eq!(*analyzer.calls.lock().unwrap(), 0);
        assert!(report.require_trend().is_err());
    }

    #[test]
    fn test_assess_survives_collaborator_failures() {
        let engine = WellnessEngine::default();
        let store = FlakyStore::default();
        engine.ingest(mood(9, "", 0), &store, None).unwrap();

        let store = FlakyStore {
            fail_assessment_writes: true,
            ..store
        };
        let analyzer = StubAnalyzer::failing();
        let report = engine.assess(&store, Some(&analyzer), day(1));

        assert_eq!(report.assessment.domain_risks.mood, 10.0);
        assert_eq!(report.degradations.len(), 2);
        assert!(report
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::TextAnalysisUnavailable { .. })));
        assert!(report
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::PersistenceFailed { .. })));
    }

    #[test]
    fn test_assess_store_read_failure_degrades_to_missing_domains() {
        let engine = WellnessEngine::default();
        let store = FlakyStore {
            fail_reads: true,
            ..Default::default()
        };

        let report = engine.assess(&store, None, day(0));
        assert_eq!(report.assessment.overall_wellness, 50.0);
        // Three domains plus the previous assessment lookup
        assert_eq!(report.degradations.len(), 4);
    }

    #[test]
    fn test_assess_blends_collaborator_view() {
        let engine = WellnessEngine::default();
        let store = InMemoryRecordStore::new();
        engine.ingest(mood(9, "", 0), &store, None).unwrap();

        let analyzer = StubAnalyzer {
            entry: Ok(EntryAnalysis::default()),
            history: Ok(CollaboratorAssessment {
                risk_level: Some(RiskTier::High),
                insights: Some("Notes mention hopelessness.".to_string()),
                ..Default::default()
            }),
            calls: Mutex::new(0),
        };
        let report = engine.assess(&store, Some(&analyzer), day(1));

        assert_eq!(report.assessment.risk_tier, RiskTier::High);
        assert_eq!(report.assessment.insights, "Notes mention hopelessness.");
        assert!(report.plan.strategies.iter().all(|s| s.urgent));
    }

    #[test]
    fn test_assess_hysteresis_uses_stored_tier() {
        let mut config = EngineConfig::default();
        config.tier_policy.hysteresis_margin = 5.0;
        let engine = WellnessEngine::from_config(config).unwrap();
        let store = InMemoryRecordStore::new();

        engine.ingest(mood(9, "", 0), &store, None).unwrap();
        engine.ingest(sleep("22:00", "06:00", 8, 0), &store, None).unwrap();
        // Only social contact counts: activity risk 75
        engine.ingest(activity_with(0, 8.0, 5, 0, 0), &store, None).unwrap();
        assert_eq!(engine.assess(&store, None, day(0)).assessment.risk_tier, RiskTier::High);

        // Activity risk 67.5 is within the margin of the high bound
        engine.ingest(activity_with(0, 8.0, 3, 42, 1), &store, None).unwrap();
        assert_eq!(engine.assess(&store, None, day(1)).assessment.risk_tier, RiskTier::High);

        // Activity risk 35 leaves high but sits on the widened medium bound
        engine.ingest(activity(10000, 2), &store, None).unwrap();
        assert_eq!(engine.assess(&store, None, day(2)).assessment.risk_tier, RiskTier::Medium);
    }

    #[test]
    fn test_score_entry_json_bare_and_wrapped() {
        let bare = r#"{"domain":"mood","mood_value":3,"note":"","timestamp":"2024-01-15T08:00:00Z"}"#;
        let scored: ScoredEntry =
            serde_json::from_str(&score_entry_json(bare.to_string()).unwrap()).unwrap();
        assert_eq!(scored.score.sub_score, 70.0);

        let wrapped = r#"{
            "entry": {"domain":"sleep","bedtime":"23:00","wake_time":"07:00",
                      "quality_value":3,"interruption_count":5,
                      "timestamp":"2024-01-15T08:00:00Z"},
            "history": []
        }"#;
        let scored: ScoredEntry =
            serde_json::from_str(&score_entry_json(wrapped.to_string()).unwrap()).unwrap();
        assert_eq!(scored.score.sub_score, 45.0);
        assert_eq!(
            scored.labels,
            vec!["Frequent Sleep Interruptions", "Poor Sleep Quality"]
        );
    }

    #[test]
    fn test_score_entry_json_errors() {
        let err = score_entry_json("not json".to_string()).unwrap_err();
        assert!(matches!(err, EngineError::JsonError(_)));

        let err = score_entry_json(
            r#"{"domain":"mood","mood_value":0,"timestamp":"2024-01-15T08:00:00Z"}"#.to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { field: "mood_value", .. }));
    }

    #[test]
    fn test_assess_risks_json() {
        let request = r#"{
            "entries": [
                {"domain":"mood","mood_value":8,"timestamp":"2024-01-15T08:00:00Z"},
                {"domain":"activity","steps":10000,"screen_time_hours":0,
                 "social_interaction_count":5,"exercise_minutes":60,
                 "timestamp":"2024-01-15T20:00:00Z"},
                {"domain":"sleep","bedtime":"23:00","wake_time":"07:00",
                 "quality_value":8,"timestamp":"2024-01-15T07:00:00Z"}
            ],
            "as_of": "2024-01-16T00:00:00Z"
        }"#;
        let report: AssessmentReport =
            serde_json::from_str(&assess_risks_json(request.to_string()).unwrap()).unwrap();

        assert_eq!(report.assessment.domain_risks.mood, 20.0);
        assert_eq!(report.assessment.domain_risks.sleep, 0.0);
        assert_eq!(report.assessment.domain_risks.activity, 0.0);
        assert_eq!(report.assessment.risk_tier, RiskTier::Low);
        assert!(report.plan.emergency_contacts.is_empty());
    }

    #[test]
    fn test_assess_risks_json_rejects_invalid_entry_alone() {
        let request = r#"{
            "entries": [
                {"domain":"mood","mood_value":2,"timestamp":"2024-01-15T08:00:00Z"},
                {"domain":"activity","steps":-5,"screen_time_hours":2,
                 "social_interaction_count":3,"exercise_minutes":30,
                 "timestamp":"2024-01-15T07:00:00Z"}
            ],
            "as_of": "2024-01-16T00:00:00Z"
        }"#;
        let report: AssessmentReport =
            serde_json::from_str(&assess_risks_json(request.to_string()).unwrap()).unwrap();

        assert_eq!(report.assessment.domain_risks.mood, 80.0);
        assert_eq!(report.assessment.domain_risks.activity, 50.0);
        assert_eq!(report.assessment.risk_tier, RiskTier::High);
        assert_eq!(
            report.degradations,
            vec![Degradation::RejectedEntry {
                index: 1,
                reason: "Invalid value for steps: -5 is negative".to_string(),
            }]
        );
    }

    #[test]
    fn test_assess_entries_keeps_valid_entries() {
        let engine = WellnessEngine::default();
        let entries = vec![mood(11, "", 0), mood(8, "", 1), mood(7, "", 2)];

        let report = assess_entries(&engine, entries, None, day(3)).unwrap();
        assert_eq!(report.assessment.domain_risks.mood, 30.0);
        assert_eq!(report.degradations.len(), 1);
        assert!(matches!(
            report.degradations[0],
            Degradation::RejectedEntry { index: 0, .. }
        ));
    }

    #[test]
    fn test_assess_risks_json_previous_tier_without_hysteresis() {
        let request = r#"{"entries": [], "previous_tier": "high",
                          "as_of": "2024-01-16T00:00:00Z"}"#;
        let report: AssessmentReport =
            serde_json::from_str(&assess_risks_json(request.to_string()).unwrap()).unwrap();
        // Default margin is zero, so the neutral assessment stands
        assert_eq!(report.assessment.risk_tier, RiskTier::Medium);
    }

    #[test]
    fn test_interventions_json() {
        let plan: crate::types::InterventionPlan =
            serde_json::from_str(&interventions_json("moderate").unwrap()).unwrap();
        assert_eq!(plan.tier, RiskTier::Medium);
        assert_eq!(plan.strategies.len(), 4);

        let err = interventions_json("severe").unwrap_err();
        assert!(err.is_client_error());
    }
}
