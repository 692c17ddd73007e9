//! Layered settings: built-in defaults, an optional TOML file and
//! `COSTAR_*` environment variables, in increasing order of precedence.
//!
//! ```toml
//! [connection]
//! database = "imdb.sqlite"
//!
//! [mining]
//! min_support = 5
//! antecedents = "prefix_suffix"
//! evaluator = "sql"
//! ```
//!
//! Nested keys are separated by a double underscore in the environment, e.g.
//! `COSTAR_MINING__MIN_SUPPORT=6`.

use config::{Config, Environment, File, FileFormat};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{CostarError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "costar.toml";
pub const CONFIG_PATH_VARIABLE: &str = "COSTAR_CONFIG";

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub schema: SchemaSettings,
    pub mining: MiningSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub host: String,
    /// Path of the SQLite file, or `:memory:`.
    pub database: String,
    pub username: String,
    pub password: String,
}
impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Names of the external tables the base relation is read from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    pub movie_table: String,
    pub member_table: String,
    pub appearance_table: String,
}
impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            movie_table: "movie".into(),
            member_table: "member".into(),
            appearance_table: "movie_actor".into(),
        }
    }
}

/// Which (k-1)-projections of a candidate must already be frequent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntecedentCheck {
    PrefixSuffix,
    AllSubsets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Sql,
    Bitmap,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    pub min_support: u64,
    pub movie_type: String,
    /// Movies must be rated strictly above this.
    pub min_rating: f64,
    pub antecedents: AntecedentCheck,
    pub evaluator: EvaluatorKind,
    /// Lets the store drop infrequent groups before returning them.
    pub push_down_support: bool,
    pub level_timeout_secs: Option<u64>,
}
impl Default for MiningSettings {
    fn default() -> Self {
        Self {
            min_support: 5,
            movie_type: "movie".into(),
            min_rating: 5.0,
            antecedents: AntecedentCheck::PrefixSuffix,
            evaluator: EvaluatorKind::Sql,
            push_down_support: true,
            level_timeout_secs: None,
        }
    }
}
impl MiningSettings {
    pub fn level_timeout(&self) -> Option<Duration> {
        self.level_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}
impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Settings {
    /// Loads from `COSTAR_CONFIG` (or `costar.toml`) and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VARIABLE).ok();
        Self::from_file(path.as_deref().unwrap_or(DEFAULT_CONFIG_FILE))
    }

    /// Loads from the given file, which may be absent, and the environment.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("COSTAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for name in [
            &self.schema.movie_table,
            &self.schema.member_table,
            &self.schema.appearance_table,
        ] {
            if !IDENTIFIER.is_match(name) {
                return Err(CostarError::Config(format!(
                    "'{name}' is not a plain table name"
                )));
            }
        }
        if self.mining.min_support == 0 {
            return Err(CostarError::Config("min_support must be at least 1".into()));
        }
        if !self.mining.min_rating.is_finite() {
            return Err(CostarError::Config("min_rating must be a finite number".into()));
        }
        Ok(())
    }
}
