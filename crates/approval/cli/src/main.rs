//! approvalctl - Command-line driver for the approval engine
//!
//! - `resolve`: print the gates a record with the given attributes would need
//! - `run`: execute a JSON scenario (accounts plus submit/act/cancel/adjust
//!   steps) against an in-memory engine and print the outcome
//! - `definitions`: list the registered workflow definitions

use anyhow::Context;
use approval_engine::{ApprovalEngine, DefinitionRegistry, EngineConfig, TreasuryLedger};
use approval_types::RecordAttributes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod scenario;
mod telemetry;

use scenario::Scenario;

/// approvalctl CLI
#[derive(Parser)]
#[command(name = "approvalctl")]
#[command(about = "Approval workflow engine - resolve gates and run scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "APPROVALS_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configured level)
    #[arg(long, env = "APPROVALS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "APPROVALS_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gates a record would have to pass
    Resolve {
        /// JSON file holding the record attributes (tagged by `record_type`)
        #[arg(short, long)]
        attributes: PathBuf,
    },

    /// Run a scenario file and print the resulting records
    Run {
        /// JSON scenario file
        #[arg(short, long)]
        scenario: PathBuf,
    },

    /// List registered workflow definitions
    Definitions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    telemetry::init_tracing(&config.logging).context("initializing tracing")?;

    match cli.command {
        Commands::Resolve { attributes } => {
            let raw = std::fs::read_to_string(&attributes)
                .with_context(|| format!("reading {}", attributes.display()))?;
            let attributes: RecordAttributes =
                serde_json::from_str(&raw).context("parsing record attributes")?;

            let registry = DefinitionRegistry::with_builtin(&config.routing)?;
            let gates = registry.resolve_gates(attributes.record_type(), &attributes)?;
            let output = serde_json::json!({
                "record_type": attributes.record_type(),
                "magnitude": attributes.magnitude(),
                "gates": gates,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Run { scenario } => {
            let raw = std::fs::read_to_string(&scenario)
                .with_context(|| format!("reading {}", scenario.display()))?;
            let scenario: Scenario = serde_json::from_str(&raw).context("parsing scenario")?;

            let ledger = Arc::new(TreasuryLedger::with_accounts(
                &config.ledger,
                scenario.accounts.clone(),
            )?);
            let engine = ApprovalEngine::with_treasury(&config, ledger.clone())?;

            tracing::info!(steps = scenario.steps.len(), "Running scenario");
            let report = scenario::run(&engine, &ledger, scenario.steps).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Definitions => {
            let registry = DefinitionRegistry::with_builtin(&config.routing)?;
            let mut definitions = registry.list();
            definitions.sort_by_key(|d| d.record_type.as_str());
            println!("{}", serde_json::to_string_pretty(&definitions)?);
        }
    }

    Ok(())
}
