use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: Storage,
    pub logging: Logging,
}

/// Where and how the ledger documents are persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// Directory holding the four ledger documents. Created on first write.
    pub data_dir: PathBuf,
    pub transactions_file: String,
    pub positions_file: String,
    pub history_file: String,
    pub balance_file: String,
    /// Keep at most this many snapshots, dropping the oldest. Unbounded when unset.
    #[serde(default)]
    pub history_limit: Option<usize>,
}

impl Storage {
    pub fn transactions_path(&self) -> PathBuf {
        self.data_dir.join(&self.transactions_file)
    }

    pub fn positions_path(&self) -> PathBuf {
        self.data_dir.join(&self.positions_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    pub fn balance_path(&self) -> PathBuf {
        self.data_dir.join(&self.balance_file)
    }

    /// Storage rooted at `data_dir` with the default document names.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            transactions_file: "transactions.json".to_string(),
            positions_file: "positions.json".to_string(),
            history_file: "history.json".to_string(),
            balance_file: "balance.json".to_string(),
            history_limit: None,
        }
    }
}

pub(crate) const DEFAULT_DATA_DIR: &str = "data";

/// Log output settings. `RUST_LOG` takes precedence over `level` when set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    #[serde(default)]
    pub level: LogLevel,
    /// When set, a daily rolling log file is written here in addition to stderr.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
