//! Piggyback configuration

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the CLI renders a statistics report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    /// Hex dump of the encoded protocol message
    Wire,
}

/// Settings for one statistics context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Track functional dependency candidates between result columns
    pub fd_discovery: bool,

    /// Initial capacity of distinct-value sets, as a power of two
    pub initial_set_bits: u32,

    /// Initial capacity of the per-pair FD value maps
    pub initial_map_capacity: usize,

    /// Ceiling on the number of entries held by all containers of a context.
    /// Crossing it abandons the statistics for that execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tracked_values: Option<usize>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            fd_discovery: true,
            initial_set_bits: 4,
            initial_map_capacity: 16,
            max_tracked_values: None,
        }
    }
}

impl StatsConfig {
    pub fn without_fd_discovery(mut self) -> Self {
        self.fd_discovery = false;
        self
    }

    pub fn with_max_tracked_values(mut self, limit: usize) -> Self {
        self.max_tracked_values = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), crate::PiggybackError> {
        if self.initial_set_bits == 0 || self.initial_set_bits > 30 {
            return Err(crate::PiggybackError::Config(format!(
                "initial_set_bits must be within 1..=30, got {}",
                self.initial_set_bits
            )));
        }
        if self.initial_map_capacity == 0 {
            return Err(crate::PiggybackError::Config(
                "initial_map_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// CLI configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub stats: StatsConfig,

    /// Output format of the statistics report
    pub report_format: ReportFormat,

    /// Print result rows before the report
    pub print_rows: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            stats: StatsConfig::default(),
            report_format: ReportFormat::Text,
            print_rows: true,
        }
    }
}

impl CliConfig {
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::PiggybackError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.stats.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), crate::PiggybackError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
