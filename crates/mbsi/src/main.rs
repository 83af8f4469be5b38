mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mbsi_core::Portal;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a portal session
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::GetStarted => commands::onboarding::handle(&cli.global).await,

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "mbsi", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to the portal
        cmd => {
            let portal = build_portal(&cli.global)?;
            // A 401 on any request tears the whole session down.
            let listener = portal.session().spawn_rejection_listener();

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &portal, &cli.global).await;
            listener.abort();
            result
        }
    }
}

/// Build the portal facade from the config file and CLI overrides.
fn build_portal(global: &cli::GlobalOpts) -> Result<Portal, CliError> {
    let mut cfg = mbsi_config::load_config_or_default();
    apply_overrides(&mut cfg, global);

    let portal_config = mbsi_config::to_portal_config(&cfg)?;
    let token_store: Arc<dyn mbsi_core::TokenStore> = mbsi_config::token_store(&cfg)?;

    Portal::new(&portal_config, token_store).map_err(CliError::from)
}

/// Layer CLI flags over the loaded config. Flags the user did not pass
/// leave the config values alone.
fn apply_overrides(cfg: &mut mbsi_config::Config, global: &cli::GlobalOpts) {
    if let Some(url) = &global.portal {
        cfg.portal.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn absent_timeout_flag_keeps_the_config_value() {
        let cli = Cli::parse_from(["mbsi", "whoami"]);
        let mut cfg = mbsi_config::Config::default();
        cfg.defaults.timeout = 45;

        apply_overrides(&mut cfg, &cli.global);
        assert_eq!(cfg.defaults.timeout, 45);

        let cli = Cli::parse_from(["mbsi", "--timeout", "5", "whoami"]);
        apply_overrides(&mut cfg, &cli.global);
        assert_eq!(cfg.defaults.timeout, 5);
    }
}
