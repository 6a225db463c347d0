//! Configuration for the approval engine

use serde::{Deserialize, Serialize};

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Routing thresholds for conditional gates
    #[serde(default)]
    pub routing: RoutingThresholds,

    /// Ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds that insert conditional gates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingThresholds {
    /// Invoices above this amount need CFO sign-off
    #[serde(default = "default_invoice_cfo_threshold")]
    pub invoice_cfo_threshold: i64,

    /// Treasury transactions above this amount need CFO sign-off
    #[serde(default = "default_transaction_cfo_threshold")]
    pub transaction_cfo_threshold: i64,

    /// Leave requests longer than this many days need HR sign-off
    #[serde(default = "default_leave_hr_threshold_days")]
    pub leave_hr_threshold_days: i64,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            invoice_cfo_threshold: default_invoice_cfo_threshold(),
            transaction_cfo_threshold: default_transaction_cfo_threshold(),
            leave_hr_threshold_days: default_leave_hr_threshold_days(),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Prefix of allocated journal-entry identifiers
    #[serde(default = "default_journal_prefix")]
    pub journal_prefix: String,

    /// Fiscal year embedded in journal-entry identifiers; current year if unset
    #[serde(default)]
    pub fiscal_year: Option<i32>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            journal_prefix: default_journal_prefix(),
            fiscal_year: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers

fn default_invoice_cfo_threshold() -> i64 {
    100_000
}

fn default_transaction_cfo_threshold() -> i64 {
    250_000
}

fn default_leave_hr_threshold_days() -> i64 {
    5
}

fn default_journal_prefix() -> String {
    "JE".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration from defaults, an optional file, then `APPROVALS_*`
    /// environment variables (e.g. `APPROVALS_ROUTING__INVOICE_CFO_THRESHOLD`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("APPROVALS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
