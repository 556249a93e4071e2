//! Command line front end for Mixtype
//!
//! The binary lives in `main.rs`; everything it runs is here so it can be
//! tested without spawning a process.

pub mod cli;
pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mixtype::prelude::*;

use crate::cli::{Cli, Commands};

/// Run the parsed command line
pub fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), &cli.font_dirs)?;
    let engine = Engine::new(config).context("Failed to start the engine")?;
    for error in engine.registry().load_errors() {
        log::warn!("{error}");
    }

    match &cli.command {
        Commands::Render(args) => commands::render::run(&engine, args),
        Commands::Fonts(args) => commands::fonts::run(&engine, args),
        Commands::Batch(args) => commands::batch::run(&engine, args),
    }
}

/// The configuration file if given, else the defaults, then environment
/// overrides and extra font directories
pub fn load_config(path: Option<&Path>, extra_dirs: &[PathBuf]) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let mut config = config
        .with_env_overrides()
        .context("Invalid MIXTYPE_* environment variable")?;
    config.font_dirs.extend(extra_dirs.iter().cloned());
    Ok(config)
}

/// Parse "liga=0,kern,+dlig,-calt" into feature settings
///
/// A bare tag or `+tag` turns the feature on, `-tag` turns it off.
pub fn parse_features(spec: &str) -> Result<Vec<(String, u32)>> {
    spec.split([',', ' '])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (tag, value) = match item.split_once('=') {
                Some((tag, value)) => {
                    let value = value
                        .trim()
                        .parse::<u32>()
                        .with_context(|| format!("Invalid value in feature '{item}'"))?;
                    (tag.trim(), value)
                }
                None => match item.strip_prefix('-') {
                    Some(tag) => (tag, 0),
                    None => (item.strip_prefix('+').unwrap_or(item), 1),
                },
            };
            if tag.len() != 4 || !tag.is_ascii() {
                anyhow::bail!("Feature tags have four ASCII characters, got '{tag}'");
            }
            Ok((tag.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_parse_in_all_spellings() {
        let features = parse_features("liga=0, kern +dlig,-calt").unwrap();
        assert_eq!(
            features,
            vec![
                ("liga".to_string(), 0),
                ("kern".to_string(), 1),
                ("dlig".to_string(), 1),
                ("calt".to_string(), 0),
            ]
        );
        assert!(parse_features("").unwrap().is_empty());
    }

    #[test]
    fn malformed_features_are_errors() {
        assert!(parse_features("ligatures").is_err());
        assert!(parse_features("liga=yes").is_err());
    }

    #[test]
    fn extra_dirs_are_appended() {
        let dirs = vec![PathBuf::from("/opt/extra-fonts")];
        let config = load_config(None, &dirs).unwrap();
        assert_eq!(config.font_dirs.last(), dirs.last());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/mixtype.toml")), &[]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mixtype.toml"));
    }
}
