//! Interactive first-run setup.
//!
//! Walks through portal URL, token storage, login, and output
//! preferences, then writes the config file.

use std::sync::Arc;

use dialoguer::{Confirm, Input, Password, Select};
use owo_colors::OwoColorize;
use secrecy::SecretString;

use mbsi_core::Portal;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let heading = |text: &str| {
        if color {
            println!("\n{}", text.bold());
        } else {
            println!("\n{text}");
        }
    };

    let mut cfg = mbsi_config::load_config_or_default();

    // Step 1: portal URL
    heading("Step 1/4: Portal");
    let portal_url: String = Input::new()
        .with_prompt("Portal URL")
        .default(cfg.portal.clone())
        .interact_text()?;
    let _: url::Url = portal_url.parse().map_err(|_| CliError::Validation {
        field: "portal".into(),
        reason: format!("invalid URL: {portal_url}"),
    })?;
    cfg.portal = portal_url;

    // Step 2: token storage
    heading("Step 2/4: Session storage");
    let backends = ["keyring (OS credential store)", "file (plain file, 0600)"];
    let picked = Select::new()
        .with_prompt("Where should the session token live?")
        .items(&backends)
        .default(0)
        .interact()?;
    cfg.defaults.token_backend = if picked == 0 { "keyring" } else { "file" }.into();

    // Step 3: preferences
    heading("Step 3/4: Preferences");
    let formats = ["table", "json", "yaml", "plain"];
    let picked = Select::new()
        .with_prompt("Default output format")
        .items(&formats)
        .default(0)
        .interact()?;
    cfg.defaults.output = formats[picked].into();

    mbsi_config::save_config(&cfg)?;
    println!("Wrote {}", mbsi_config::config_path().display());

    // Step 4: log in (optional)
    heading("Step 4/4: Log in");
    if Confirm::new()
        .with_prompt("Log in now?")
        .default(true)
        .interact()?
    {
        let username: String = Input::new().with_prompt("Username").interact_text()?;
        let password = Password::new().with_prompt("Password").interact()?;

        let portal_config = mbsi_config::to_portal_config(&cfg)?;
        let token_store: Arc<dyn mbsi_core::TokenStore> = mbsi_config::token_store(&cfg)?;
        let portal = Portal::new(&portal_config, token_store)?;
        let account = portal
            .login(&username, &SecretString::from(password))
            .await?;
        println!("Logged in as {}", account.display_name());
    } else {
        println!("Run `mbsi login` when you're ready.");
    }

    Ok(())
}
