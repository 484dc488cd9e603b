use chrono::Utc;
use plaza_core::models::MediaId;

use crate::cli::MyListCommands;
use crate::commands::common::{
    format_history_lines, format_media_lines, print_json, print_lines, AppContext,
};
use crate::error::CliError;

pub async fn run_library(ctx: &AppContext) -> Result<(), CliError> {
    let library = &ctx.services.library;
    library.refresh().await?;

    let items = library.catalog().items();
    if ctx.json {
        print_json(&items)
    } else {
        print_lines(&format_media_lines(&items));
        Ok(())
    }
}

pub async fn run_my_list(
    ctx: &AppContext,
    command: Option<MyListCommands>,
) -> Result<(), CliError> {
    let library = &ctx.services.library;
    library.refresh().await?;

    if let Some(command) = command {
        ctx.arm_failure();
        match command {
            MyListCommands::Add { id } => {
                library.add_to_my_list(&id.trim().parse::<MediaId>()?).await?;
            }
            MyListCommands::Remove { id } => {
                library
                    .remove_from_my_list(&id.trim().parse::<MediaId>()?)
                    .await?;
            }
        }
    }

    let items = library.my_list();
    if ctx.json {
        print_json(&items)
    } else {
        print_lines(&format_media_lines(&items));
        Ok(())
    }
}

pub async fn run_watch(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: MediaId = id.trim().parse()?;
    let library = &ctx.services.library;
    library.refresh().await?;
    ctx.arm_failure();

    let entry = library.record_watch(&id).await?;
    if ctx.json {
        print_json(&entry)
    } else {
        println!("Watched {}", entry.title);
        Ok(())
    }
}

pub async fn run_history(ctx: &AppContext, clear: bool) -> Result<(), CliError> {
    let library = &ctx.services.library;
    library.refresh().await?;

    if clear {
        ctx.arm_failure();
        let count = library.clear_history().await?;
        println!("Cleared {count} entries");
        return Ok(());
    }

    let entries = library.history();
    if ctx.json {
        print_json(&entries)
    } else {
        print_lines(&format_history_lines(
            &entries,
            Utc::now().timestamp_millis(),
        ));
        Ok(())
    }
}
