//! Config subcommand handlers.

use mbsi_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, ConfigSetArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = mbsi_config::load_config_or_default();
            output::print_output(&format_config(&cfg), global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            output::print_output(
                &mbsi_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }
        ConfigCommand::Set(set) => handle_set(&set, global),
    }
}

fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "portal = \"{}\"", cfg.portal);
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);
    let _ = write!(out, "token_backend = \"{}\"", cfg.defaults.token_backend);
    out
}

fn handle_set(args: &ConfigSetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = mbsi_config::load_config_or_default();

    match args.key.as_str() {
        "portal" => {
            let _: url::Url = args.value.parse().map_err(|_| CliError::Validation {
                field: "portal".into(),
                reason: format!("invalid URL: {}", args.value),
            })?;
            cfg.portal.clone_from(&args.value);
        }
        "defaults.output" => cfg.defaults.output.clone_from(&args.value),
        "defaults.color" => cfg.defaults.color.clone_from(&args.value),
        "defaults.timeout" => {
            cfg.defaults.timeout = parse_num(&args.value, "defaults.timeout")?;
        }
        "defaults.page_size" => {
            cfg.defaults.page_size = parse_num(&args.value, "defaults.page_size")?;
        }
        "defaults.token_backend" => {
            if !matches!(args.value.as_str(), "keyring" | "file") {
                return Err(CliError::Validation {
                    field: "defaults.token_backend".into(),
                    reason: format!("expected 'keyring' or 'file', got '{}'", args.value),
                });
            }
            cfg.defaults.token_backend.clone_from(&args.value);
        }
        other => {
            return Err(CliError::Validation {
                field: "key".into(),
                reason: format!("unknown config key '{other}'"),
            });
        }
    }

    mbsi_config::save_config(&cfg)?;
    output::print_output(&format!("Set {} = {}", args.key, args.value), global.quiet);
    Ok(())
}

fn parse_num<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected a number, got '{value}'"),
    })
}
