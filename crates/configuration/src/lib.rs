use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, LogLevel, Logging, Storage};

/// Prefix for environment overrides, e.g. `FOLIO__STORAGE__DATA_DIR=/srv/folio`.
pub const ENV_PREFIX: &str = "FOLIO";

/// Loads the application configuration.
///
/// Sources are layered lowest to highest: built-in defaults, the TOML file at
/// `path` (optional, a missing file is fine), then `FOLIO__*` environment
/// variables. A `.env` file in the working directory is loaded first if present.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if let Ok(env_file) = dotenvy::dotenv() {
        tracing::debug!(path = %env_file.display(), "Loaded .env file");
    }

    let defaults = Storage::default();
    let builder = config::Config::builder()
        .set_default("storage.data_dir", settings::DEFAULT_DATA_DIR)?
        .set_default("storage.transactions_file", defaults.transactions_file)?
        .set_default("storage.positions_file", defaults.positions_file)?
        .set_default("storage.history_file", defaults.history_file)?
        .set_default("storage.balance_file", defaults.balance_file)?
        .set_default("logging.level", LogLevel::default().as_str())?
        .add_source(
            config::File::new(&path.to_string_lossy(), config::FileFormat::Toml).required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

/// Rejects settings the ledger cannot work with.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let storage = &config.storage;
    if storage.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::invalid("storage.data_dir", "must not be empty"));
    }

    let names = [
        ("storage.transactions_file", &storage.transactions_file),
        ("storage.positions_file", &storage.positions_file),
        ("storage.history_file", &storage.history_file),
        ("storage.balance_file", &storage.balance_file),
    ];
    for (key, name) in names {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid(key, "must not be empty"));
        }
    }
    for (i, (key, name)) in names.iter().enumerate() {
        if let Some((other, _)) = names[i + 1..].iter().find(|(_, n)| n == name) {
            return Err(ConfigError::invalid(
                *key,
                format!("'{name}' is also used by {other}"),
            ));
        }
    }

    if storage.history_limit == Some(0) {
        return Err(ConfigError::invalid(
            "storage.history_limit",
            "must be greater than zero when set",
        ));
    }

    Ok(())
}
