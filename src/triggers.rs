//! Rule-based trigger detection
//!
//! Scans free-text notes for known concern keywords. This is a low-precision
//! heuristic kept apart from collaborator-provided labels: both implement
//! `TriggerSource`, either can be switched off, and `merge_labels` combines
//! their output without one replacing the other.

use crate::config::{KeywordRule, TriggerConfig};
use std::collections::BTreeSet;

/// Anything that can turn a note into a set of trigger labels
pub trait TriggerSource: Send + Sync {
    fn detect(&self, text: &str) -> BTreeSet<String>;
}

/// Case-insensitive keyword matcher
#[derive(Debug, Clone)]
pub struct KeywordTriggerDetector {
    min_text_len: usize,
    /// Keywords stored lowercase
    rules: Vec<KeywordRule>,
}

impl Default for KeywordTriggerDetector {
    fn default() -> Self {
        Self::new(&TriggerConfig::default())
    }
}

impl KeywordTriggerDetector {
    pub fn new(config: &TriggerConfig) -> Self {
        let rules = config
            .keywords
            .iter()
            .map(|rule| KeywordRule {
                keyword: rule.keyword.to_lowercase(),
                label: rule.label.clone(),
            })
            .collect();
        Self {
            min_text_len: config.min_text_len,
            rules,
        }
    }
}

impl TriggerSource for KeywordTriggerDetector {
    fn detect(&self, text: &str) -> BTreeSet<String> {
        if text.chars().count() <= self.min_text_len {
            return BTreeSet::new();
        }

        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| haystack.contains(rule.keyword.as_str()))
            .map(|rule| rule.label.clone())
            .collect()
    }
}

/// A source that never reports anything; used to disable a label stream
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTriggers;

impl TriggerSource for NoTriggers {
    fn detect(&self, _text: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// Union of rule labels and collaborator labels, blank labels dropped
pub fn merge_labels<I, S>(rule_labels: BTreeSet<String>, collaborator_labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut merged = rule_labels;
    merged.extend(
        collaborator_labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty()),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_multiple_triggers() {
        let detector = KeywordTriggerDetector::default();
        let triggers = detector.detect("work has been stressful and sleep is bad");
        assert!(triggers.contains("Work Stress"));
        assert!(triggers.contains("Sleep Issues"));
        assert_eq!(triggers.len(), 2);
    }

    #[test]
    fn test_short_text_is_ignored() {
        let detector = KeywordTriggerDetector::default();
        assert!(detector.detect("ok").is_empty());
        // Exactly ten characters still contains a keyword but is too short
        assert!(detector.detect("work work!").is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let detector = KeywordTriggerDetector::default();
        let triggers = detector.detect("FAMILY dinner was tense, SOCIAL plans cancelled");
        assert_eq!(
            triggers,
            BTreeSet::from(["Family Tension".to_string(), "Social Anxiety".to_string()])
        );
    }

    #[test]
    fn test_substring_matches() {
        let detector = KeywordTriggerDetector::default();
        let triggers = detector.detect("long day of homework again");
        assert!(triggers.contains("Work Stress"));
    }

    #[test]
    fn test_no_keywords_yields_empty() {
        let detector = KeywordTriggerDetector::default();
        assert!(detector.detect("a calm and pleasant afternoon").is_empty());
    }

    #[test]
    fn test_custom_rules() {
        let detector = KeywordTriggerDetector::new(&TriggerConfig {
            min_text_len: 3,
            keywords: vec![KeywordRule::new("Exam", "Academic Pressure")],
        });
        assert_eq!(
            detector.detect("exam soon"),
            BTreeSet::from(["Academic Pressure".to_string()])
        );
        assert!(detector.detect("work is hard").is_empty());
    }

    #[test]
    fn test_disabled_source() {
        assert!(NoTriggers.detect("work has been stressful").is_empty());
    }

    #[test]
    fn test_merge_keeps_both_sources() {
        let rules = BTreeSet::from(["Work Stress".to_string()]);
        let merged = merge_labels(rules, vec!["Burnout", "  ", "Work Stress"]);
        assert_eq!(
            merged,
            BTreeSet::from(["Burnout".to_string(), "Work Stress".to_string()])
        );
    }
}
