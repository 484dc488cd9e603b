use plaza_core::models::Session;
use serde::Serialize;

use crate::commands::common::{format_timestamp, print_json, AppContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SessionItem {
    pub user_id: String,
    pub display_name: String,
    pub handle: String,
    pub expires_at: i64,
}

impl From<&Session> for SessionItem {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user.id.to_string(),
            display_name: session.user.display_name.clone(),
            handle: session.user.handle.clone(),
            expires_at: session.expires_at,
        }
    }
}

pub async fn run_login(
    ctx: &AppContext,
    email: Option<&str>,
    password: &str,
) -> Result<(), CliError> {
    let email = email
        .map(str::to_string)
        .or_else(|| ctx.config.default_email.clone())
        .ok_or(CliError::MissingEmail)?;
    ctx.arm_failure();

    let session = ctx.services.session.sign_in(&email, password).await?;
    if ctx.json {
        print_json(&SessionItem::from(&session))?;
    } else {
        println!(
            "Signed in as {} (@{})",
            session.user.display_name, session.user.handle
        );
    }
    Ok(())
}

pub async fn run_logout(ctx: &AppContext) -> Result<(), CliError> {
    let was_signed_in = ctx.services.session.current().is_some();
    ctx.arm_failure();
    ctx.services.session.sign_out().await?;
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub fn run_whoami(ctx: &AppContext) -> Result<(), CliError> {
    let session = ctx.require_session()?;
    if ctx.json {
        print_json(&SessionItem::from(&session))?;
    } else {
        println!(
            "{} (@{}), session valid until {}",
            session.user.display_name,
            session.user.handle,
            format_timestamp(session.expires_at)
        );
    }
    Ok(())
}
