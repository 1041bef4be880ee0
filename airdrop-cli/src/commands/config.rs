//! Show the effective configuration.

use anyhow::Result;
use std::path::Path;

use crate::config::{default_config_path, CliConfig};

/// Run the config command.
pub fn run(config: &CliConfig, source: Option<&Path>) -> Result<()> {
    match source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => {
            println!("# Built-in defaults");
            if let Some(path) = default_config_path() {
                println!("# (create {} to override)", path.display());
            }
        }
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
