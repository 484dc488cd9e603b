use plaza_core::models::{Profile, ProfilePatch, UserId};

use crate::commands::common::{format_profile, print_json, print_lines, AppContext};
use crate::error::CliError;

pub async fn run_profile(ctx: &AppContext, id: Option<&str>) -> Result<(), CliError> {
    let profiles = &ctx.services.profile;
    let profile = match id {
        Some(id) => profiles.open(&id.trim().parse::<UserId>()?).await?,
        None => {
            ctx.require_session()?;
            profiles.refresh().await?
        }
    };
    show_profile(ctx, &profile)
}

pub async fn run_edit_profile(
    ctx: &AppContext,
    name: Option<String>,
    bio: Option<String>,
    avatar: Option<String>,
) -> Result<(), CliError> {
    ctx.require_session()?;
    let profiles = &ctx.services.profile;
    profiles.refresh().await?;
    ctx.arm_failure();

    let patch = ProfilePatch {
        display_name: name,
        bio,
        avatar_url: avatar,
    };
    let profile = profiles.update_profile(patch).await?;
    show_profile(ctx, &profile)
}

pub async fn run_follow(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: UserId = id.trim().parse()?;
    let profiles = &ctx.services.profile;
    profiles.open(&id).await?;
    ctx.arm_failure();

    let outcome = profiles.toggle_follow(&id).await;
    if let Some(profile) = profiles.get(&id) {
        show_profile(ctx, &profile)?;
    }
    outcome?;
    Ok(())
}

fn show_profile(ctx: &AppContext, profile: &Profile) -> Result<(), CliError> {
    if ctx.json {
        print_json(profile)
    } else {
        print_lines(&format_profile(profile));
        Ok(())
    }
}
