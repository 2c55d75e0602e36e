//! Resolves aliases against a JSON model definition from the command line.
//!
//! ```text
//! metaclad [--model model.json] OBJECT ALIAS...
//! ```
//!
//! The model path falls back to the `model_path` setting.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use metaclad::attribute::Attribute;
use metaclad::loader::MemoryLoader;
use metaclad::settings::Settings;
use metaclad::{MetacladError, Model, Result};

/// Resolves attribute aliases of a meta object.
#[derive(Parser, Debug)]
#[command(name = "metaclad", version)]
struct Arguments {
    /// JSON model definition, defaults to the `model_path` setting
    #[arg(short, long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Object alias, optionally with namespace (`shop.ORDER`)
    object: String,

    /// Aliases to resolve on the object
    aliases: Vec<String>,
}

fn describe(attribute: &Attribute) -> String {
    let mut description = format!(
        "{} (id {}, {}, object #{})",
        attribute.alias_with_relation_path(),
        attribute.id(),
        attribute.data_type(),
        attribute.object_id()
    );
    if let Some(ancestor) = attribute.inherited_from_object_id() {
        description.push_str(&format!(", inherited from #{ancestor}"));
    }
    description
}

fn run(settings: &Settings, arguments: Arguments) -> Result<()> {
    let path = arguments
        .model
        .or_else(|| settings.model_path.clone())
        .ok_or_else(|| MetacladError::Config("no model definition given".to_string()))?;
    let json = std::fs::read_to_string(&path)
        .map_err(|e| MetacladError::Loader(format!("{}: {e}", path.display())))?;
    let loader = MemoryLoader::from_json(&json)?.with_value_list_delimiter(&settings.value_list_delimiter);
    let mut model = Model::new(Box::new(loader));
    let object_id = model.object_id(&arguments.object)?;
    info!(object = %arguments.object, object_id, "resolving aliases");
    for alias in &arguments.aliases {
        match model.get_attribute(object_id, alias) {
            Ok(attribute) => println!("{alias} => {}", describe(&attribute)),
            Err(e) => println!("{alias} => {e}"),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let arguments = Arguments::parse();
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();
    match run(&settings, arguments) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "resolution failed");
            ExitCode::FAILURE
        }
    }
}
