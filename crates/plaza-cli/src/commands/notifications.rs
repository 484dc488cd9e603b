use chrono::Utc;
use plaza_core::models::{Notification, NotificationId};

use crate::commands::common::{format_notification_lines, print_json, print_lines, AppContext};
use crate::error::CliError;

pub async fn run_notifications(ctx: &AppContext, unread_only: bool) -> Result<(), CliError> {
    let notifications = &ctx.services.notifications;
    notifications.refresh().await?;

    let selected = if unread_only {
        notifications.unread()
    } else {
        notifications.collection().items()
    };
    show_notifications(ctx, &selected)?;
    if !ctx.json {
        println!("{} unread", notifications.unread_count());
    }
    Ok(())
}

pub async fn run_read(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: NotificationId = id.trim().parse()?;
    let notifications = &ctx.services.notifications;
    notifications.refresh().await?;
    ctx.arm_failure();

    let outcome = notifications.mark_read(&id).await;
    if let Some(notification) = notifications.collection().get(&id) {
        show_notifications(ctx, std::slice::from_ref(&notification))?;
    }
    outcome?;
    Ok(())
}

pub async fn run_read_all(ctx: &AppContext) -> Result<(), CliError> {
    let notifications = &ctx.services.notifications;
    notifications.refresh().await?;
    ctx.arm_failure();

    let count = notifications.mark_all_read().await?;
    println!("Marked {count} notifications read");
    Ok(())
}

pub async fn run_dismiss(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: NotificationId = id.trim().parse()?;
    let notifications = &ctx.services.notifications;
    notifications.refresh().await?;
    ctx.arm_failure();

    notifications.dismiss(&id).await?;
    println!("Dismissed {id}");
    Ok(())
}

fn show_notifications(ctx: &AppContext, notifications: &[Notification]) -> Result<(), CliError> {
    if ctx.json {
        print_json(notifications)
    } else {
        print_lines(&format_notification_lines(
            notifications,
            Utc::now().timestamp_millis(),
        ));
        Ok(())
    }
}
