//! TOML configuration for backtests, optimization and live trading.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) is a valid configuration. CLI flags override loaded values.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use daytrader_core::domain::{LotSize, ParamError, Parameters};
use daytrader_core::signal::{Resample, SessionCutoff, SignalStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collaborators::HistoryWindow;
use crate::optimizer::ParamGrid;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamError),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaytraderConfig {
    pub account: AccountConfig,
    pub strategy: StrategyConfig,
    pub optimizer: OptimizerConfig,
    pub data: DataConfig,
    pub live: LiveConfig,
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Key under which ledger state is persisted.
    pub account_id: String,
    pub initial_cash: f64,
    pub lot_size: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_id: "default".into(),
            initial_cash: 100_000.0,
            lot_size: 1,
        }
    }
}

impl AccountConfig {
    pub fn lot(&self) -> LotSize {
        LotSize::new(self.lot_size)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: SignalStrategy,
    pub resample: Resample,
    pub params: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub grid: ParamGrid,
    pub parallel: bool,
    /// Directory for `{ticker}_optimal_parameters_*.csv` reports.
    pub output_dir: PathBuf,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            parallel: true,
            output_dir: PathBuf::from("optimal_parameter_log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `{ticker}.csv` price files.
    pub dir: PathBuf,
    pub tickers: Vec<String>,
    pub window: HistoryWindow,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            tickers: Vec::new(),
            window: HistoryWindow::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub symbol: String,
    /// Local wall-clock time, `HH:MM`.
    pub cutoff: String,
    pub poll_interval_secs: u64,
    /// Days of history used to warm up the signal window.
    pub warmup_days: u32,
    /// Directory for persisted ledger state.
    pub state_dir: PathBuf,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            cutoff: "14:45".into(),
            poll_interval_secs: 60,
            warmup_days: 10,
            state_dir: PathBuf::from("state"),
        }
    }
}

impl LiveConfig {
    pub fn session_cutoff(&self) -> Result<SessionCutoff, ConfigError> {
        NaiveTime::parse_from_str(&self.cutoff, "%H:%M")
            .map(SessionCutoff::new)
            .map_err(|e| ConfigError::Invalid {
                field: "live.cutoff",
                reason: format!("'{}' is not HH:MM ({e})", self.cutoff),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Environment variable names for the credentials (never the values).
    pub client_id_env: String,
    pub client_secret_env: String,
    pub username_env: String,
    pub password_env: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example-broker.com/v1".into(),
            timeout_secs: 10,
            client_id_env: "DAYTRADER_CLIENT_ID".into(),
            client_secret_env: "DAYTRADER_CLIENT_SECRET".into(),
            username_env: "DAYTRADER_USERNAME".into(),
            password_env: "DAYTRADER_PASSWORD".into(),
        }
    }
}

impl DaytraderConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.account.initial_cash.is_finite() || self.account.initial_cash < 0.0 {
            return Err(ConfigError::Invalid {
                field: "account.initial_cash",
                reason: format!("must be a non-negative amount, got {}", self.account.initial_cash),
            });
        }
        if self.account.lot_size == 0 {
            return Err(ConfigError::Invalid {
                field: "account.lot_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.account.account_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "account.account_id",
                reason: "must not be empty".into(),
            });
        }
        self.strategy.params.validate()?;
        if self.live.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "live.poll_interval_secs",
                reason: "must be at least 1 second".into(),
            });
        }
        match self.data.window {
            HistoryWindow::LastBars(0) => {
                return Err(ConfigError::Invalid {
                    field: "data.window",
                    reason: "last_bars must be at least 1".into(),
                });
            }
            HistoryWindow::LastDays(days) if days < 0 => {
                return Err(ConfigError::Invalid {
                    field: "data.window",
                    reason: format!("last_days must not be negative, got {days}"),
                });
            }
            _ => {}
        }
        self.live.session_cutoff()?;
        Ok(())
    }
}
