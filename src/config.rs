use std::{fmt, fs, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_VAR: &str = "TIME_TRACKER_CONFIG";
pub const DB_PATH_VAR: &str = "TIME_TRACKER_DB";
pub const ENV_VAR: &str = "TIME_TRACKER_ENV";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    #[default]
    Dev,
    Stage,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Stage => "STAGE",
            Environment::Prod => "PROD",
        }
    }

    /// Log filter used when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> log::LevelFilter {
        match self {
            Environment::Dev => log::LevelFilter::Debug,
            Environment::Stage | Environment::Prod => log::LevelFilter::Info,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DEV" => Ok(Environment::Dev),
            "STAGE" => Ok(Environment::Stage),
            "PROD" => Ok(Environment::Prod),
            other => Err(anyhow!("unknown environment '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("time-tracker.sqlite3"),
            environment: Environment::Dev,
        }
    }
}

impl AppConfig {
    /// Defaults, then the JSON file named by `TIME_TRACKER_CONFIG`, then
    /// `TIME_TRACKER_DB` / `TIME_TRACKER_ENV`.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(db_path) = lookup(DB_PATH_VAR) {
            config.database_path = PathBuf::from(db_path);
        }
        if let Some(env) = lookup(ENV_VAR) {
            config.environment = env
                .parse()
                .with_context(|| format!("invalid {ENV_VAR}"))?;
        }

        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }
}
