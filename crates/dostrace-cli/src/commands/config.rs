//! Config command - Validate a configuration file or print the defaults.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use dostrace_core::config::defaults_toml;
use dostrace_core::{OPTIONS, TraceConfig};

use crate::OutputFormat;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    /// Print the documented default [debugtrace] section
    #[arg(long)]
    pub defaults: bool,
}

/// Effective configuration with derived values.
#[derive(Debug, Serialize)]
struct ConfigReport<'a> {
    path: String,
    valid: bool,
    config: &'a TraceConfig,
    log_target: String,
    eager: bool,
    hex_dump_bytes: usize,
    sample_rate: u32,
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    if args.defaults {
        return print_defaults(format);
    }

    let path = config_path.context("No configuration file given (use --config FILE or --defaults)")?;
    let config = TraceConfig::load(path)
        .with_context(|| format!("Invalid configuration: {}", path.display()))?;

    if config.max_log_size_mb > 0 {
        tracing::warn!(
            max_log_size_mb = config.max_log_size_mb,
            "max_log_size_mb is accepted but log rotation is not performed"
        );
    }

    let report = ConfigReport {
        path: path.display().to_string(),
        valid: true,
        config: &config,
        log_target: config.log_target().to_string(),
        eager: config.eager_enabled(),
        hex_dump_bytes: config.hex_dump_bytes(),
        sample_rate: config.sample_rate(),
    };

    match format {
        OutputFormat::Human => {
            println!("Configuration is valid: {}", report.path);
            println!("  Log target: {}", report.log_target);
            println!(
                "  Activation: {}",
                if !config.enabled {
                    "disabled"
                } else if report.eager {
                    "at startup"
                } else {
                    "on first program load"
                }
            );
            println!();
            print!("{}", config.to_toml_section());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(())
}

fn print_defaults(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => print!("{}", defaults_toml()),
        OutputFormat::Json | OutputFormat::JsonCompact => {
            let options: Vec<serde_json::Value> = OPTIONS
                .iter()
                .map(|option| {
                    serde_json::json!({
                        "name": option.name,
                        "default": option.default,
                        "help": option.help,
                    })
                })
                .collect();
            let json = if matches!(format, OutputFormat::JsonCompact) {
                serde_json::to_string(&options)?
            } else {
                serde_json::to_string_pretty(&options)?
            };
            println!("{}", json);
        }
    }
    Ok(())
}
