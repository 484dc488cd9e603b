use plaza_core::models::MediaId;

use crate::commands::common::{
    format_bytes, format_download_lines, print_json, print_lines, AppContext,
};
use crate::error::CliError;

pub fn run_downloads(ctx: &AppContext) -> Result<(), CliError> {
    let downloads = &ctx.services.downloads;
    let items = downloads.collection().items();
    if ctx.json {
        return print_json(&items);
    }

    print_lines(&format_download_lines(&items));
    println!(
        "{} downloads, {} completed, {} total",
        items.len(),
        downloads.completed().len(),
        format_bytes(downloads.total_bytes())
    );
    Ok(())
}

pub async fn run_download(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: MediaId = id.trim().parse()?;
    let library = &ctx.services.library;
    library.refresh().await?;
    ctx.arm_failure();

    let downloads = &ctx.services.downloads;
    let download = match library.catalog().get(&id) {
        Some(item) => downloads.start_download_for(&item).await?,
        None => downloads.start_download(&id).await?,
    };
    if ctx.json {
        print_json(&download)
    } else {
        print_lines(&format_download_lines(std::slice::from_ref(&download)));
        Ok(())
    }
}

pub async fn run_remove_download(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let id: MediaId = id.trim().parse()?;
    ctx.arm_failure();
    ctx.services.downloads.remove_download(&id).await?;
    println!("Removed download {id}");
    Ok(())
}
