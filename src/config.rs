//! Settings shared by every model of a [`Schema`](crate::schema::Schema).
//!
//! Settings are read from an optional `attribution.{toml,json,yaml}` file,
//! overridden by `ATTRIBUTION_`-prefixed environment variables, e.g.
//! `ATTRIBUTION_AUTOLOAD=false` or `ATTRIBUTION_UTC_OFFSET=-18000`.

// used to layer the settings file and the environment
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use std::path::Path;

use crate::error::{AttributionError, Result};
use crate::temporal::LocalZone;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Whether association reads may call finders, unless a model says otherwise.
    pub autoload: bool,
    /// Seconds east of UTC for wall-clock times without an offset. The system
    /// zone is used when absent.
    pub utc_offset: Option<i32>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            autoload: true,
            utc_offset: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Reads `attribution.*` from the working directory, if present, and the
    /// environment.
    pub fn load() -> Result<Settings> {
        Self::build(File::with_name("attribution").required(false))
    }
    pub fn from_file(path: impl AsRef<Path>) -> Result<Settings> {
        Self::build(File::from(path.as_ref()).required(true))
    }
    fn build<S>(file: S) -> Result<Settings>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("ATTRIBUTION").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.zone()?;
        Ok(settings)
    }
    /// The zone time coercion treats as local.
    pub fn zone(&self) -> Result<LocalZone> {
        match self.utc_offset {
            Some(seconds) => LocalZone::from_offset_seconds(seconds)
                .ok_or_else(|| AttributionError::Config(format!("utc_offset {seconds} is out of range"))),
            None => Ok(LocalZone::System),
        }
    }
}

/// Installs a formatting subscriber filtered by `RUST_LOG`, or by the
/// settings' `log_filter` when that is unset. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
