use chrono::Utc;
use plaza_core::models::{Post, PostId};

use crate::commands::common::{format_post_lines, join_words, print_json, print_lines, AppContext};
use crate::error::CliError;

pub async fn run_feed(
    ctx: &AppContext,
    limit: usize,
    tag: Option<&str>,
    liked_only: bool,
) -> Result<(), CliError> {
    let posts = &ctx.services.posts;
    posts.refresh().await?;

    let mut selected = match tag {
        Some(tag) => posts.by_tag(tag),
        None => posts.collection().items(),
    };
    if liked_only {
        selected.retain(|post| post.liked);
    }
    selected.truncate(limit);
    show_posts(ctx, &selected)
}

pub async fn run_post(ctx: &AppContext, content_parts: &[String]) -> Result<(), CliError> {
    let content = join_words(content_parts).ok_or(CliError::EmptyContent)?;
    ctx.require_session()?;
    let posts = &ctx.services.posts;
    posts.refresh().await?;
    ctx.arm_failure();

    let post = posts.create_post(&content).await?;
    if ctx.json {
        print_json(&post)?;
    } else {
        println!("{}", post.id);
    }
    Ok(())
}

pub async fn run_like(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: PostId = id.trim().parse()?;
    let posts = &ctx.services.posts;
    posts.refresh().await?;
    ctx.arm_failure();

    let outcome = posts.toggle_like(&id).await;
    if let Some(post) = posts.collection().get(&id) {
        show_posts(ctx, std::slice::from_ref(&post))?;
    }
    outcome?;
    Ok(())
}

pub async fn run_comment(
    ctx: &AppContext,
    id: &str,
    text_parts: &[String],
) -> Result<(), CliError> {
    let id: PostId = id.trim().parse()?;
    let text = join_words(text_parts).ok_or(CliError::EmptyComment)?;
    let posts = &ctx.services.posts;
    posts.refresh().await?;
    ctx.arm_failure();

    let comments = posts.add_comment(&id, &text).await?;
    println!("{comments} comments");
    Ok(())
}

pub async fn run_delete_post(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: PostId = id.trim().parse()?;
    let posts = &ctx.services.posts;
    posts.refresh().await?;
    ctx.arm_failure();

    posts.delete_post(&id).await?;
    println!("Deleted {id}");
    Ok(())
}

fn show_posts(ctx: &AppContext, posts: &[Post]) -> Result<(), CliError> {
    if ctx.json {
        print_json(posts)
    } else {
        print_lines(&format_post_lines(posts, Utc::now().timestamp_millis()));
        Ok(())
    }
}
