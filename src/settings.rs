use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_SETTINGS_FILE: &str = "metaclad";
pub const ENVIRONMENT_PREFIX: &str = "METACLAD";

fn default_log_filter() -> String {
    String::from("metaclad=info")
}
fn default_value_list_delimiter() -> String {
    String::from(",")
}

/// Runtime settings, read from an optional `metaclad.{toml,json,yaml}` file
/// and overridden by `METACLAD_*` environment variables, e.g.
/// `METACLAD_MODEL_PATH=model.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// JSON model definition read by the binary
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Delimiter for attributes that do not define their own
    #[serde(default = "default_value_list_delimiter")]
    pub value_list_delimiter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: None,
            log_filter: default_log_filter(),
            value_list_delimiter: default_value_list_delimiter(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    /// Reads `file` (extension optional, missing file is fine) and the
    /// environment on top of it.
    pub fn load_from(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENVIRONMENT_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
