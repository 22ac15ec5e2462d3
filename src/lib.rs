//! Synheart Wellness - Behavioral risk scoring and crisis-tier classification
//!
//! Wellness turns self-reported daily signals into a risk tier and matching
//! interventions through a deterministic pipeline: domain normalization →
//! trend analysis → trigger detection → risk aggregation → intervention
//! selection.
//!
//! ## Modules
//!
//! - **Scoring**: mood, sleep and activity entries into 0-100 risk sub-scores
//! - **Assessment**: sub-scores, trends and optional collaborator input into a tier
//! - **Collaborators**: record store and text-analysis traits the host implements

pub mod aggregator;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod interventions;
pub mod normalizer;
pub mod pipeline;
pub mod trend;
pub mod triggers;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{RiskAggregator, RiskInputs};
pub use collaborator::{
    CollaboratorAssessment, EntryAnalysis, HistorySnapshot, InMemoryRecordStore, RecordStore,
    TextAnalyzer,
};
pub use config::EngineConfig;
pub use error::{CollaboratorError, ConfigError, EngineError};
pub use interventions::InterventionSelector;
pub use normalizer::Normalizer;
pub use pipeline::{assess_risks_json, interventions_json, score_entry_json, WellnessEngine};
pub use trend::TrendAnalyzer;
pub use triggers::{KeywordTriggerDetector, TriggerSource};
pub use types::*;

/// Library version reported by the CLI and FFI
pub const WELLNESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for logs and reports
pub const PRODUCER_NAME: &str = "synheart-wellness";
