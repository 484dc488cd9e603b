use plaza_core::models::{Friend, UserId};

use crate::commands::common::{format_friend_lines, print_json, print_lines, AppContext};
use crate::error::CliError;

pub async fn run_friends(ctx: &AppContext, online: bool, favorites: bool) -> Result<(), CliError> {
    let friends = &ctx.services.friends;
    friends.refresh().await?;

    let mut selected = if favorites {
        friends.favorites()
    } else {
        friends.collection().items()
    };
    if online {
        selected.retain(|friend| friend.online);
    }

    if ctx.json {
        print_json(&selected)
    } else {
        print_lines(&format_friend_lines(&selected));
        println!(
            "{} friends, {} online",
            friends.count(),
            friends.online().len()
        );
        Ok(())
    }
}

pub async fn run_add_friend(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let friends = &ctx.services.friends;
    friends.refresh().await?;
    ctx.arm_failure();

    let friend = friends.add_friend(id).await?;
    show_friend(ctx, &friend)
}

pub async fn run_remove_friend(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: UserId = id.trim().parse()?;
    let friends = &ctx.services.friends;
    friends.refresh().await?;
    ctx.arm_failure();

    friends.remove_friend(&id).await?;
    println!("Removed {id}");
    Ok(())
}

pub async fn run_favorite(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: UserId = id.trim().parse()?;
    let friends = &ctx.services.friends;
    friends.refresh().await?;
    ctx.arm_failure();

    let outcome = friends.toggle_favorite(&id).await;
    if let Some(friend) = friends.collection().get(&id) {
        show_friend(ctx, &friend)?;
    }
    outcome?;
    Ok(())
}

fn show_friend(ctx: &AppContext, friend: &Friend) -> Result<(), CliError> {
    if ctx.json {
        print_json(friend)
    } else {
        print_lines(&format_friend_lines(std::slice::from_ref(friend)));
        Ok(())
    }
}
