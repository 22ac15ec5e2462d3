//! Tier-to-intervention mapping
//!
//! A static catalog keyed by risk tier. Strategies are returned in display
//! order; the plan adds the tier headline, guidance text and, for medium and
//! high tiers, the crisis support lines.

use crate::types::{EmergencyContact, InterventionPlan, InterventionStrategy, RiskTier};

struct StrategyTemplate {
    title: &'static str,
    description: &'static str,
    action_label: &'static str,
}

const LOW_STRATEGIES: &[StrategyTemplate] = &[
    StrategyTemplate {
        title: "Mindfulness Check-in",
        description: "Take 5 minutes for deep breathing and mindfulness",
        action_label: "Start Guided Session",
    },
    StrategyTemplate {
        title: "Social Connection",
        description: "Reach out to a friend or family member",
        action_label: "View Contacts",
    },
    StrategyTemplate {
        title: "Physical Activity",
        description: "Take a short walk or do light exercise",
        action_label: "Start Activity",
    },
];

const MEDIUM_STRATEGIES: &[StrategyTemplate] = &[
    StrategyTemplate {
        title: "Professional Check-in",
        description: "Schedule appointment with your therapist/counselor",
        action_label: "Schedule Now",
    },
    StrategyTemplate {
        title: "Crisis Support Chat",
        description: "Connect with trained crisis counselor online",
        action_label: "Start Chat",
    },
    StrategyTemplate {
        title: "Safety Planning",
        description: "Review and update your personalized safety plan",
        action_label: "Open Safety Plan",
    },
    StrategyTemplate {
        title: "Support Network Alert",
        description: "Notify trusted contacts about your current state",
        action_label: "Send Alerts",
    },
];

const HIGH_STRATEGIES: &[StrategyTemplate] = &[
    StrategyTemplate {
        title: "Immediate Professional Help",
        description: "Contact emergency mental health services now",
        action_label: "Call 988",
    },
    StrategyTemplate {
        title: "Crisis Center Locator",
        description: "Find nearest mental health crisis center",
        action_label: "Find Centers",
    },
    StrategyTemplate {
        title: "Emergency Contact",
        description: "Call your emergency contact person immediately",
        action_label: "Call Contact",
    },
];

/// (name, number, availability)
const EMERGENCY_CONTACTS: &[(&str, &str, &str)] = &[
    ("National Suicide Prevention Lifeline", "988", "24/7"),
    ("Crisis Text Line", "Text HOME to 741741", "24/7"),
    ("Emergency Services", "911", "24/7"),
    ("SAMHSA National Helpline", "1-800-662-4357", "24/7"),
];

/// Stateless selector over the intervention catalog
pub struct InterventionSelector;

impl InterventionSelector {
    /// Ordered strategies for a tier
    pub fn select(tier: RiskTier) -> Vec<InterventionStrategy> {
        let (templates, urgent) = match tier {
            RiskTier::Low => (LOW_STRATEGIES, false),
            RiskTier::Medium => (MEDIUM_STRATEGIES, false),
            RiskTier::High => (HIGH_STRATEGIES, true),
        };

        templates
            .iter()
            .map(|t| InterventionStrategy {
                title: t.title.to_string(),
                description: t.description.to_string(),
                action_label: t.action_label.to_string(),
                urgent,
                requires_emergency_resources: urgent,
            })
            .collect()
    }

    /// Full plan for a tier
    pub fn plan(tier: RiskTier) -> InterventionPlan {
        let (headline, guidance) = match tier {
            RiskTier::High => (
                "Immediate Action Required",
                "Patterns indicating immediate crisis risk were detected. Multiple intervention resources are available.",
            ),
            RiskTier::Medium => (
                "Proactive Intervention",
                "Elevated risk patterns detected. Proactive intervention can help prevent crisis development.",
            ),
            RiskTier::Low => (
                "Preventive Monitoring",
                "Current patterns show stable mental health. Continue monitoring and using preventive strategies.",
            ),
        };

        let emergency_contacts = match tier {
            RiskTier::Low => Vec::new(),
            RiskTier::Medium | RiskTier::High => Self::emergency_contacts(),
        };

        InterventionPlan {
            tier,
            headline: headline.to_string(),
            guidance: guidance.to_string(),
            strategies: Self::select(tier),
            emergency_contacts,
        }
    }

    pub fn emergency_contacts() -> Vec<EmergencyContact> {
        EMERGENCY_CONTACTS
            .iter()
            .map(|(name, number, available)| EmergencyContact {
                name: name.to_string(),
                number: number.to_string(),
                available: available.to_string(),
            })
            .collect()
    }
}

/// One-line status for a tier, suited to dashboards and CLI output
pub fn tier_summary(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::High => "Immediate attention recommended - Crisis prevention protocols activated",
        RiskTier::Medium => "Elevated concern - Proactive intervention suggested",
        RiskTier::Low => "Stable indicators - Continue monitoring",
    }
}
