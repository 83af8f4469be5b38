//! Login, logout, and whoami handlers.

use dialoguer::{Input, Password};
use owo_colors::OwoColorize;
use secrecy::SecretString;

use mbsi_core::{Account, Portal};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;

pub async fn login(portal: &Portal, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let username = match args.username {
        Some(username) => username,
        None => Input::new().with_prompt("Username").interact_text()?,
    };
    let password = match args.password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };
    if username.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let account = portal
        .login(&username, &SecretString::from(password))
        .await?;

    let greeting = format!("Logged in as {}", account.display_name());
    let line = if output::should_color(&global.color) {
        greeting.green().to_string()
    } else {
        greeting
    };
    output::print_output(&line, global.quiet);
    Ok(())
}

pub fn logout(portal: &Portal, global: &GlobalOpts) -> Result<(), CliError> {
    portal.logout()?;
    output::print_output("Logged out", global.quiet);
    Ok(())
}

pub async fn whoami(portal: &Portal, global: &GlobalOpts) -> Result<(), CliError> {
    let account = super::require_session(portal).await?;
    let rendered = output::render_single(
        &global.output,
        &account,
        account_detail,
        |a| a.username.clone().unwrap_or_else(|| a.id.clone()),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn account_detail(account: &Account) -> String {
    let mut pairs = vec![
        ("Name", account.display_name()),
        (
            "Username",
            account.username.clone().unwrap_or_else(|| "-".into()),
        ),
        ("Id", account.id.clone()),
    ];
    if let Some(role) = &account.role {
        pairs.push(("Role", role.clone()));
    }
    if let Some(balance) = account.coin_balance {
        pairs.push(("Coins", balance.to_string()));
    }
    output::kv_lines(&pairs)
}
