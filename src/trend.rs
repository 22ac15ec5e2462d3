//! Trend analysis over rolling score windows
//!
//! Compares the average of the most recent window of scores with the window
//! before it. The same comparison serves every domain; the caller states
//! whether higher values are better (wellness-style) or worse (risk-style).

use crate::config::TrendConfig;
use crate::types::{DomainScore, ScoreDirection, TrendLabel};

/// Minimum number of values before any direction is reported
const MIN_HISTORY: usize = 2;

/// Trend analyzer parameterized by window length and threshold
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    window: usize,
    threshold: f64,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(&TrendConfig::default())
    }
}

impl TrendAnalyzer {
    pub fn new(config: &TrendConfig) -> Self {
        Self {
            window: config.window.max(1),
            threshold: config.threshold,
        }
    }

    /// Classify the direction of `values`, ordered most-recent-first
    pub fn analyze(&self, values: &[f64], direction: ScoreDirection) -> TrendLabel {
        if values.len() < MIN_HISTORY {
            return TrendLabel::InsufficientData;
        }

        let recent = Self::window_average(values.iter().take(self.window));
        let older = Self::window_average(values.iter().skip(self.window).take(self.window));

        let (recent, older) = match (recent, older) {
            (Some(r), Some(o)) => (r, o),
            _ => return TrendLabel::InsufficientData,
        };

        // Flip risk-style values so "up" always means better
        let (recent, older) = match direction {
            ScoreDirection::HigherIsBetter => (recent, older),
            ScoreDirection::LowerIsBetter => (-recent, -older),
        };

        if recent > older + self.threshold {
            TrendLabel::Improving
        } else if recent < older - self.threshold {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        }
    }

    /// Trend of risk sub-scores (most-recent-first); falling risk is improving
    pub fn analyze_scores(&self, scores: &[DomainScore]) -> TrendLabel {
        let values: Vec<f64> = scores.iter().map(|s| s.sub_score).collect();
        self.analyze(&values, ScoreDirection::LowerIsBetter)
    }

    /// Average over whatever the window holds; `None` when empty
    fn window_average<'a>(values: impl Iterator<Item = &'a f64>) -> Option<f64> {
        let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;
    use chrono::Utc;

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::default()
    }

    #[test]
    fn test_insufficient_history() {
        let a = analyzer();
        assert_eq!(
            a.analyze(&[], ScoreDirection::HigherIsBetter),
            TrendLabel::InsufficientData
        );
        assert_eq!(
            a.analyze(&[5.0], ScoreDirection::HigherIsBetter),
            TrendLabel::InsufficientData
        );
    }

    #[test]
    fn test_empty_older_window_is_insufficient() {
        // Two or three values fill only the recent window
        let a = analyzer();
        assert_eq!(
            a.analyze(&[9.0, 1.0], ScoreDirection::HigherIsBetter),
            TrendLabel::InsufficientData
        );
        assert_eq!(
            a.analyze(&[9.0, 8.0, 1.0], ScoreDirection::HigherIsBetter),
            TrendLabel::InsufficientData
        );
    }

    #[test]
    fn test_wellness_values_improving() {
        // recent = 8, older = 5
        let values = [8.0, 8.0, 8.0, 5.0, 5.0, 5.0];
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::HigherIsBetter),
            TrendLabel::Improving
        );
    }

    #[test]
    fn test_wellness_values_declining() {
        let values = [3.0, 4.0, 2.0, 7.0, 7.0, 7.0];
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::HigherIsBetter),
            TrendLabel::Declining
        );
    }

    #[test]
    fn test_small_changes_are_stable() {
        // recent = 6.33, older = 6.0, within 0.5
        let values = [6.0, 7.0, 6.0, 6.0, 6.0, 6.0];
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::HigherIsBetter),
            TrendLabel::Stable
        );
    }

    #[test]
    fn test_partial_older_window_averages_what_exists() {
        // recent = 5, older = [9] -> declining for wellness
        let values = [5.0, 5.0, 5.0, 9.0];
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::HigherIsBetter),
            TrendLabel::Declining
        );
    }

    #[test]
    fn test_values_beyond_two_windows_ignored() {
        let values = [5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 100.0];
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::HigherIsBetter),
            TrendLabel::Stable
        );
    }

    #[test]
    fn test_risk_direction_is_inverted() {
        // Risk dropped from 70 to 30
        let values = [30.0, 30.0, 30.0, 70.0, 70.0, 70.0];
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::LowerIsBetter),
            TrendLabel::Improving
        );
        assert_eq!(
            analyzer().analyze(&values, ScoreDirection::HigherIsBetter),
            TrendLabel::Declining
        );
    }

    #[test]
    fn test_analyze_scores_uses_risk_convention() {
        let now = Utc::now();
        let scores: Vec<DomainScore> = [80.0, 75.0, 70.0, 20.0]
            .iter()
            .map(|&sub_score| DomainScore {
                domain: Domain::Mood,
                sub_score,
                computed_at: now,
            })
            .collect();
        assert_eq!(analyzer().analyze_scores(&scores), TrendLabel::Declining);
    }

    #[test]
    fn test_custom_window_and_threshold() {
        let a = TrendAnalyzer::new(&TrendConfig {
            window: 1,
            threshold: 2.0,
        });
        assert_eq!(
            a.analyze(&[6.0, 5.0], ScoreDirection::HigherIsBetter),
            TrendLabel::Stable
        );
        assert_eq!(
            a.analyze(&[8.0, 5.0], ScoreDirection::HigherIsBetter),
            TrendLabel::Improving
        );
    }
}
