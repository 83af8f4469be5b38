//! Profile subcommand handlers.

use mbsi_core::{Portal, UpdateProfile};

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand, ProfileEditArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    portal: &Portal,
    args: ProfileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ProfileCommand::Show => super::auth::whoami(portal, global).await,
        ProfileCommand::Edit(edit) => handle_edit(portal, edit, global).await,
    }
}

async fn handle_edit(
    portal: &Portal,
    args: ProfileEditArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.first_name.is_none() && args.last_name.is_none() {
        return Err(CliError::Validation {
            field: "profile".into(),
            reason: "nothing to change; pass --first-name and/or --last-name".into(),
        });
    }

    let account = super::require_session(portal).await?;
    // Unchanged fields are resubmitted as-is; the portal expects both.
    let update = UpdateProfile {
        first_name: args
            .first_name
            .or(account.first_name)
            .unwrap_or_default(),
        last_name: args.last_name.or(account.last_name).unwrap_or_default(),
    };

    let updated = portal.update_profile(&update).await?;
    output::print_output(
        &format!("Profile updated: {}", updated.display_name()),
        global.quiet,
    );
    Ok(())
}
