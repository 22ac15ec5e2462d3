//! Wellness CLI - Command-line interface for Synheart Wellness
//!
//! Commands:
//! - score: Score and label daily entries
//! - assess: Produce a risk assessment and intervention plan from entries
//! - triggers: Run the keyword trigger rules over a note
//! - interventions: Print the intervention plan for a tier
//! - config: Print the effective engine configuration
//! - doctor: Diagnose configuration and environment

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_wellness::interventions::tier_summary;
use synheart_wellness::pipeline::assess_entries;
use synheart_wellness::triggers::{KeywordTriggerDetector, TriggerSource};
use synheart_wellness::{
    CollaboratorAssessment, CollaboratorError, ConfigError, DailyMetricEntry, EngineConfig,
    EngineError, InMemoryRecordStore, InterventionSelector, RiskTier, WellnessEngine,
    PRODUCER_NAME, WELLNESS_VERSION,
};

/// Wellness - Behavioral risk scoring and crisis-tier classification
#[derive(Parser)]
#[command(name = "wellness")]
#[command(author = "Synheart AI Inc")]
#[command(version = WELLNESS_VERSION)]
#[command(about = "Score daily wellness entries and classify risk tiers", long_about = None)]
struct Cli {
    /// Engine config file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and label daily entries
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Produce a risk assessment and intervention plan from entries
    Assess {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Collaborator assessment to blend in (JSON or model output text)
        #[arg(long)]
        collaborator: Option<PathBuf>,

        /// Assessment time (RFC 3339); defaults to now
        #[arg(long)]
        as_of: Option<String>,

        /// Fail unless at least one domain has a trend
        #[arg(long)]
        require_history: bool,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Run the keyword trigger rules over a note
    Triggers {
        /// Note text (reads stdin if omitted)
        text: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the intervention plan for a tier
    Interventions {
        #[arg(value_enum)]
        tier: TierArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective engine configuration
    Config {
        /// Output format
        #[arg(long, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one entry per line)
    Ndjson,
    /// JSON array of entries
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one result per line)
    Ndjson,
    /// JSON array of results
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Low,
    Medium,
    High,
}

impl From<TierArg> for RiskTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Low => RiskTier::Low,
            TierArg::Medium => RiskTier::Medium,
            TierArg::High => RiskTier::High,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log filter from `WELLNESS_LOG` (or `RUST_LOG`), default `warn`, written to stderr
fn init_logging() {
    let log_env = std::env::var("WELLNESS_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn run(cli: Cli) -> Result<(), WellnessCliError> {
    let config_path = cli.config;

    match cli.command {
        Commands::Score {
            input,
            input_format,
            output_format,
        } => cmd_score(config_path.as_deref(), &input, input_format, output_format),

        Commands::Assess {
            input,
            input_format,
            collaborator,
            as_of,
            require_history,
            pretty,
        } => cmd_assess(
            config_path.as_deref(),
            &input,
            input_format,
            collaborator.as_deref(),
            as_of.as_deref(),
            require_history,
            pretty,
        ),

        Commands::Triggers { text, json } => cmd_triggers(config_path.as_deref(), text, json),

        Commands::Interventions { tier, json } => cmd_interventions(tier.into(), json),

        Commands::Config { format } => cmd_config(config_path.as_deref(), format),

        Commands::Doctor { json } => cmd_doctor(config_path.as_deref(), json),
    }
}

fn cmd_score(
    config_path: Option<&Path>,
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), WellnessCliError> {
    let engine = WellnessEngine::new(load_config(config_path)?);
    let mut entries = read_entries(input, input_format)?;
    if entries.is_empty() {
        return Err(WellnessCliError::NoEntries);
    }

    // Oldest first so sleep regularity sees earlier nights
    entries.sort_by_key(|e| e.timestamp());

    let store = InMemoryRecordStore::new();
    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        outcomes.push(engine.ingest(entry, &store, None)?);
    }

    print!("{}", format_output(&outcomes, &output_format)?);
    Ok(())
}

fn cmd_assess(
    config_path: Option<&Path>,
    input: &Path,
    input_format: InputFormat,
    collaborator: Option<&Path>,
    as_of: Option<&str>,
    require_history: bool,
    pretty: bool,
) -> Result<(), WellnessCliError> {
    let engine = WellnessEngine::new(load_config(config_path)?);
    let entries = read_entries(input, input_format)?;

    let as_of = match as_of {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| WellnessCliError::ParseError(format!("Invalid --as-of '{}': {}", raw, e)))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let collaborator = match collaborator {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(CollaboratorAssessment::from_model_output(&content).map_err(EngineError::from)?)
        }
        None => None,
    };

    let report = assess_entries(&engine, entries, collaborator, as_of)?;
    if require_history {
        report.require_trend()?;
    }

    if pretty {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

fn cmd_triggers(
    config_path: Option<&Path>,
    text: Option<String>,
    json: bool,
) -> Result<(), WellnessCliError> {
    let config = load_config(config_path)?;
    let text = match text {
        Some(text) => text,
        None => read_input(Path::new("-"))?,
    };

    let detector = KeywordTriggerDetector::new(&config.triggers);
    let triggers = detector.detect(text.trim());

    if json {
        println!("{}", serde_json::to_string(&triggers)?);
    } else if triggers.is_empty() {
        println!("No triggers detected");
    } else {
        for trigger in &triggers {
            println!("{}", trigger);
        }
    }
    Ok(())
}

fn cmd_interventions(tier: RiskTier, json: bool) -> Result<(), WellnessCliError> {
    let plan = InterventionSelector::plan(tier);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{} ({} risk)", plan.headline, plan.tier);
    println!("{}", "=".repeat(plan.headline.len() + plan.tier.as_str().len() + 8));
    println!("{}", tier_summary(plan.tier));
    println!("{}", plan.guidance);
    println!("\nStrategies:");
    for strategy in &plan.strategies {
        let marker = if strategy.urgent { "[URGENT]" } else { "-" };
        println!(
            "  {} {}: {} [{}]",
            marker, strategy.title, strategy.description, strategy.action_label
        );
    }
    if !plan.emergency_contacts.is_empty() {
        println!("\nEmergency contacts:");
        for contact in &plan.emergency_contacts {
            println!("  - {}: {} ({})", contact.name, contact.number, contact.available);
        }
    }
    Ok(())
}

fn cmd_config(config_path: Option<&Path>, format: ConfigFormat) -> Result<(), WellnessCliError> {
    let config = load_config(config_path)?;
    match format {
        ConfigFormat::Toml => print!("{}", config.to_toml_string()?),
        ConfigFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), WellnessCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "wellness_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Wellness version {}", WELLNESS_VERSION),
    });

    match config_path {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist; defaults will be used".to_string(),
        }),
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (window {}, {} trigger keywords)",
                    config.window_size,
                    config.triggers.keywords.len()
                ),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        },
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "No config file given; using defaults".to_string(),
        }),
    }

    // Check stdin is available (for piped input)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --input -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: WELLNESS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Wellness Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(WellnessCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, WellnessCliError> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, WellnessCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_entries(input: &Path, format: InputFormat) -> Result<Vec<DailyMetricEntry>, WellnessCliError> {
    let data = read_input(input)?;
    match format {
        InputFormat::Json => Ok(serde_json::from_str(&data)?),
        InputFormat::Ndjson => data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line.trim()).map_err(|e| {
                    WellnessCliError::ParseError(format!("Line {}: {}", index + 1, e))
                })
            })
            .collect(),
    }
}

fn format_output<T: Serialize>(items: &[T], format: &OutputFormat) -> Result<String, WellnessCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)?),
    }
}

// Error types

#[derive(Debug)]
enum WellnessCliError {
    Io(io::Error),
    Engine(EngineError),
    Config(ConfigError),
    Json(serde_json::Error),
    NoEntries,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for WellnessCliError {
    fn from(e: io::Error) -> Self {
        WellnessCliError::Io(e)
    }
}

impl From<EngineError> for WellnessCliError {
    fn from(e: EngineError) -> Self {
        WellnessCliError::Engine(e)
    }
}

impl From<ConfigError> for WellnessCliError {
    fn from(e: ConfigError) -> Self {
        WellnessCliError::Config(e)
    }
}

impl From<serde_json::Error> for WellnessCliError {
    fn from(e: serde_json::Error) -> Self {
        WellnessCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WellnessCliError> for CliError {
    fn from(e: WellnessCliError) -> Self {
        match e {
            WellnessCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WellnessCliError::Engine(e) => {
                let (code, hint) = match &e {
                    EngineError::InvalidInput { .. } => {
                        ("INVALID_INPUT", "Check entry values against their allowed ranges")
                    }
                    EngineError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    EngineError::InsufficientHistory(_) => {
                        ("INSUFFICIENT_HISTORY", "Provide at least four entries for one domain")
                    }
                    EngineError::CollaboratorUnavailable(CollaboratorError::BadResponse(..)) => {
                        ("BAD_COLLABORATOR_RESPONSE", "Check the collaborator assessment file")
                    }
                    EngineError::CollaboratorUnavailable(_) => {
                        ("COLLABORATOR_UNAVAILABLE", "Retry once the collaborator is reachable")
                    }
                    EngineError::Config(_) => ("CONFIG_ERROR", "Run 'wellness doctor' for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            WellnessCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'wellness doctor' for details".to_string()),
            },
            WellnessCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            WellnessCliError::NoEntries => CliError {
                code: "NO_ENTRIES".to_string(),
                message: "No entries found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            WellnessCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            WellnessCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
