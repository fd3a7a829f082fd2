//! Oxide Gate operator commands
//!
//! Each command takes an already resolved [`GateConfig`] and returns a JSON
//! [`Outcome`]; the binary only parses arguments, prints, and sets the exit
//! code.

pub mod commands;

pub use commands::Outcome;
pub use oxide_gate::GateConfig;

use anyhow::Context;
use serde_json::Value;
use std::path::Path;

/// Read a JSON document from `path`
///
/// # Errors
/// Fails if the file cannot be read or is not JSON.
pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}

/// Resolve configuration from an optional TOML file plus the environment
///
/// # Errors
/// Fails on unreadable or invalid TOML and on malformed environment values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GateConfig> {
    let config = match path {
        Some(path) => GateConfig::load(path)?,
        None => GateConfig::default(),
    };
    Ok(config.with_env()?)
}
