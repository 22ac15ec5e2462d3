//! Domain normalization
//!
//! This module converts raw daily entries into 0-100 risk sub-scores
//! (higher = worse), one rule set per domain:
//! - Mood: linear inversion of the 1-10 mood value
//! - Sleep: fixed penalties for duration, quality, interruptions and schedule drift
//! - Activity: inverse of a four-part composite activity level
//!
//! Every out-of-range field is rejected with `EngineError::InvalidInput`
//! before any arithmetic happens.

use crate::error::EngineError;
use crate::types::{
    ActivityEntry, ActivityLevel, DailyMetricEntry, DomainScore, MoodEntry, SleepEntry,
};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Sleep shorter than this (hours) is penalized
const MIN_HEALTHY_SLEEP_HOURS: f64 = 6.0;
/// Sleep longer than this (hours) is penalized
const MAX_HEALTHY_SLEEP_HOURS: f64 = 10.0;
const DURATION_PENALTY: f64 = 30.0;
/// Quality below this (1-10 scale) is penalized
const POOR_QUALITY_BELOW: i32 = 5;
const QUALITY_PENALTY: f64 = 25.0;
/// More interruptions than this are penalized
const MAX_INTERRUPTIONS: i64 = 3;
const INTERRUPTION_PENALTY: f64 = 20.0;
/// Bedtime drift from the historical mean (hours) that counts as irregular
const MAX_BEDTIME_DRIFT_HOURS: f64 = 2.0;
const IRREGULARITY_PENALTY: f64 = 25.0;

const STEP_GOAL: f64 = 10_000.0;
const SCREEN_TIME_BUDGET_HOURS: f64 = 8.0;
const SOCIAL_INTERACTION_GOAL: f64 = 5.0;
const EXERCISE_GOAL_MINUTES: f64 = 60.0;

/// A sleep penalty that fired, kept as a label for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepRiskFactor {
    InsufficientDuration,
    ExcessiveDuration,
    PoorQuality,
    FrequentInterruptions,
    IrregularSchedule,
}

impl SleepRiskFactor {
    pub fn label(&self) -> &'static str {
        match self {
            SleepRiskFactor::InsufficientDuration => "Insufficient Sleep Duration",
            SleepRiskFactor::ExcessiveDuration => "Excessive Sleep Duration",
            SleepRiskFactor::PoorQuality => "Poor Sleep Quality",
            SleepRiskFactor::FrequentInterruptions => "Frequent Sleep Interruptions",
            SleepRiskFactor::IrregularSchedule => "Irregular Sleep Schedule",
        }
    }

    fn penalty(&self) -> f64 {
        match self {
            SleepRiskFactor::InsufficientDuration | SleepRiskFactor::ExcessiveDuration => {
                DURATION_PENALTY
            }
            SleepRiskFactor::PoorQuality => QUALITY_PENALTY,
            SleepRiskFactor::FrequentInterruptions => INTERRUPTION_PENALTY,
            SleepRiskFactor::IrregularSchedule => IRREGULARITY_PENALTY,
        }
    }
}

/// Detailed sleep scoring result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepBreakdown {
    pub duration_hours: f64,
    pub risk: f64,
    pub risk_factors: Vec<SleepRiskFactor>,
}

/// Detailed activity scoring result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBreakdown {
    /// Composite activity level (0-100, higher = better)
    pub activity_level: f64,
    pub band: ActivityLevel,
    pub risk: f64,
    /// Positive observations about the day
    pub highlights: Vec<String>,
}

/// Normalizer for converting raw entries to domain risk scores
pub struct Normalizer;

impl Normalizer {
    /// Score an entry. `history` holds earlier entries of any domain; only
    /// sleep uses it (for schedule regularity).
    pub fn score(
        entry: &DailyMetricEntry,
        history: &[DailyMetricEntry],
    ) -> Result<DomainScore, EngineError> {
        let sub_score = match entry {
            DailyMetricEntry::Mood(mood) => Self::score_mood(mood)?,
            DailyMetricEntry::Sleep(sleep) => Self::score_sleep(sleep, &prior_bedtimes(history))?.risk,
            DailyMetricEntry::Activity(activity) => Self::score_activity(activity)?.risk,
        };

        tracing::debug!(domain = %entry.domain(), sub_score, "scored entry");

        Ok(DomainScore {
            domain: entry.domain(),
            sub_score,
            computed_at: entry.timestamp(),
        })
    }

    /// Rule-derived risk labels for an entry (sleep risk factors).
    ///
    /// Activity highlights are positive signals and come from
    /// `score_activity` instead.
    pub fn labels(
        entry: &DailyMetricEntry,
        history: &[DailyMetricEntry],
    ) -> Result<Vec<String>, EngineError> {
        match entry {
            DailyMetricEntry::Sleep(sleep) => Ok(Self::score_sleep(sleep, &prior_bedtimes(history))?
                .risk_factors
                .iter()
                .map(|f| f.label().to_string())
                .collect()),
            DailyMetricEntry::Mood(_) | DailyMetricEntry::Activity(_) => Ok(Vec::new()),
        }
    }

    /// Mood risk: `(10 - mood) * 10`
    pub fn score_mood(entry: &MoodEntry) -> Result<f64, EngineError> {
        check_scale("mood_value", entry.mood_value)?;
        Ok((((10 - entry.mood_value) * 10) as f64).clamp(0.0, 100.0))
    }

    /// Sleep risk from duration, quality, interruptions and bedtime drift.
    ///
    /// `prior_bedtimes` are bedtimes of earlier nights; with none, the
    /// irregularity check is skipped.
    pub fn score_sleep(
        entry: &SleepEntry,
        prior_bedtimes: &[NaiveTime],
    ) -> Result<SleepBreakdown, EngineError> {
        let bedtime = parse_time_of_day("bedtime", &entry.bedtime)?;
        let wake_time = parse_time_of_day("wake_time", &entry.wake_time)?;
        check_scale("quality_value", entry.quality_value)?;
        check_count("interruption_count", entry.interruption_count)?;

        let duration_hours = sleep_duration_hours(bedtime, wake_time);
        let mut risk_factors = Vec::new();

        if duration_hours < MIN_HEALTHY_SLEEP_HOURS {
            risk_factors.push(SleepRiskFactor::InsufficientDuration);
        } else if duration_hours > MAX_HEALTHY_SLEEP_HOURS {
            risk_factors.push(SleepRiskFactor::ExcessiveDuration);
        }

        if entry.quality_value < POOR_QUALITY_BELOW {
            risk_factors.push(SleepRiskFactor::PoorQuality);
        }

        if entry.interruption_count > MAX_INTERRUPTIONS {
            risk_factors.push(SleepRiskFactor::FrequentInterruptions);
        }

        if !prior_bedtimes.is_empty() {
            let mean_hour = prior_bedtimes.iter().map(|t| t.hour() as f64).sum::<f64>()
                / prior_bedtimes.len() as f64;
            if (bedtime.hour() as f64 - mean_hour).abs() > MAX_BEDTIME_DRIFT_HOURS {
                risk_factors.push(SleepRiskFactor::IrregularSchedule);
            }
        }

        let risk = risk_factors
            .iter()
            .map(SleepRiskFactor::penalty)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        Ok(SleepBreakdown {
            duration_hours,
            risk,
            risk_factors,
        })
    }

    /// Activity risk: `100 - activity_level`
    pub fn score_activity(entry: &ActivityEntry) -> Result<ActivityBreakdown, EngineError> {
        check_count("steps", entry.steps)?;
        check_hours("screen_time_hours", entry.screen_time_hours)?;
        check_count("social_interaction_count", entry.social_interaction_count)?;
        check_count("exercise_minutes", entry.exercise_minutes)?;
        check_hours("outdoor_time_hours", entry.outdoor_time_hours)?;

        let activity_level = activity_level(entry);
        let band = if activity_level >= 75.0 {
            ActivityLevel::High
        } else if activity_level >= 50.0 {
            ActivityLevel::Moderate
        } else {
            ActivityLevel::Low
        };

        let mut highlights = Vec::new();
        if entry.steps >= 8_000 {
            highlights.push("Good physical activity levels".to_string());
        }
        if entry.social_interaction_count >= 2 {
            highlights.push("Healthy social engagement".to_string());
        }
        if entry.screen_time_hours <= 6.0 {
            highlights.push("Balanced screen time".to_string());
        }

        Ok(ActivityBreakdown {
            activity_level,
            band,
            risk: (100.0 - activity_level).clamp(0.0, 100.0),
            highlights,
        })
    }
}

/// Composite activity level (0-100), each of four components worth 25 points
fn activity_level(entry: &ActivityEntry) -> f64 {
    let steps = (entry.steps as f64 / STEP_GOAL).min(1.0) * 25.0;
    let screen = (SCREEN_TIME_BUDGET_HOURS - entry.screen_time_hours).max(0.0)
        / SCREEN_TIME_BUDGET_HOURS
        * 25.0;
    let social = (entry.social_interaction_count as f64).min(SOCIAL_INTERACTION_GOAL)
        / SOCIAL_INTERACTION_GOAL
        * 25.0;
    let exercise = (entry.exercise_minutes as f64).min(EXERCISE_GOAL_MINUTES)
        / EXERCISE_GOAL_MINUTES
        * 25.0;
    (steps + screen + social + exercise).clamp(0.0, 100.0)
}

/// Hours between bedtime and wake time, wrapping past midnight
pub fn sleep_duration_hours(bedtime: NaiveTime, wake_time: NaiveTime) -> f64 {
    let bed = bedtime.num_seconds_from_midnight() as f64 / 3600.0;
    let wake = wake_time.num_seconds_from_midnight() as f64 / 3600.0;
    if wake < bed {
        wake + 24.0 - bed
    } else {
        wake - bed
    }
}

/// Parse an "HH:MM" or "HH:MM:SS" time of day
pub fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, EngineError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| EngineError::invalid(field, format!("'{value}' is not a time of day")))
}

/// Bedtimes of the sleep entries in `history`. A stored bedtime that no
/// longer parses is skipped so it cannot reject the current entry.
fn prior_bedtimes(history: &[DailyMetricEntry]) -> Vec<NaiveTime> {
    history
        .iter()
        .filter_map(|entry| match entry {
            DailyMetricEntry::Sleep(sleep) => match parse_time_of_day("bedtime", &sleep.bedtime) {
                Ok(time) => Some(time),
                Err(e) => {
                    tracing::warn!(timestamp = %sleep.timestamp, error = %e, "skipping prior night");
                    None
                }
            },
            _ => None,
        })
        .collect()
}

fn check_scale(field: &'static str, value: i32) -> Result<(), EngineError> {
    if (1..=10).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::invalid(field, format!("{value} is outside 1-10")))
    }
}

fn check_count(field: &'static str, value: i64) -> Result<(), EngineError> {
    if value < 0 {
        Err(EngineError::invalid(field, format!("{value} is negative")))
    } else {
        Ok(())
    }
}

fn check_hours(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(
            field,
            format!("{value} is not a non-negative number of hours"),
        ))
    }
}
