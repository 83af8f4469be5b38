//! Command dispatch: bridges CLI args -> portal facade -> output formatting.

pub mod auth;
pub mod coins;
pub mod config_cmd;
pub mod onboarding;
pub mod profile;
pub mod stats;

use mbsi_core::{Account, Portal, SessionState};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a portal-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, portal: &Portal, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(portal, args, global).await,
        Command::Logout => auth::logout(portal, global),
        Command::Whoami => auth::whoami(portal, global).await,
        Command::Stats(args) => stats::handle(portal, args, global).await,
        Command::Profile(args) => profile::handle(portal, args, global).await,
        Command::Coins(args) => coins::handle(portal, args, global).await,
        // Handled before dispatch
        Command::Config(_) | Command::Completions(_) | Command::GetStarted => unreachable!(),
    }
}

/// Verify the persisted session and return the logged-in account.
///
/// Every authenticated command starts here: no token means `NotLoggedIn`,
/// a rejected token means `SessionExpired`.
pub async fn require_session(portal: &Portal) -> Result<Account, CliError> {
    match portal.session().verify().await? {
        SessionState::Authenticated => portal.me().await.map_err(CliError::from),
        SessionState::Rejected => Err(CliError::SessionExpired),
        _ => Err(CliError::NotLoggedIn),
    }
}
