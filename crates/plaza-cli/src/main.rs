//! Plaza CLI - the Plaza client from a terminal
//!
//! Every command loads the relevant state, applies one change optimistically
//! and prints the result. `--fail` makes the server reject the change so the
//! rollback is visible.

mod cli;
mod commands;
mod error;


use std::sync::Arc;

use clap::{CommandFactory, Parser};
use plaza_core::alerts::Notifier;
use tracing_subscriber::filter::{Directive, EnvFilter};

use crate::cli::{Cli, Commands};
use crate::commands::auth::{run_login, run_logout, run_whoami};
use crate::commands::common::{AppContext, ConsoleNotifier, GlobalOptions};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::downloads::{run_download, run_downloads, run_remove_download};
use crate::commands::feed::{run_comment, run_delete_post, run_feed, run_like, run_post};
use crate::commands::friends::{run_add_friend, run_favorite, run_friends, run_remove_friend};
use crate::commands::library::{run_history, run_library, run_my_list, run_watch};
use crate::commands::notifications::{run_dismiss, run_notifications, run_read, run_read_all};
use crate::commands::profile::{run_edit_profile, run_follow, run_profile};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let notifier = Arc::new(ConsoleNotifier::default());
    if let Err(error) = run(notifier.shared()).await {
        // Failures raised through the notifier were already shown.
        if notifier.shown() == 0 {
            eprintln!("Error: {error}");
        }
        std::process::exit(1);
    }
}

async fn run(notifier: Arc<dyn Notifier>) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive: Directive = "plaza=info"
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        config: cli.config,
        data_dir: cli.data_dir,
        fail: cli.fail,
        json: cli.json,
    };

    let Some(command) = cli.command else {
        Cli::command().print_help().map_err(CliError::Io)?;
        println!();
        return Ok(());
    };

    let open = || AppContext::open(&options, Arc::clone(&notifier));
    match command {
        Commands::Login { email, password } => {
            run_login(&open()?, email.as_deref(), &password).await
        }
        Commands::Logout => run_logout(&open()?).await,
        Commands::Whoami => run_whoami(&open()?),
        Commands::Feed { limit, tag, liked } => {
            run_feed(&open()?, limit, tag.as_deref(), liked).await
        }
        Commands::Post { content } => run_post(&open()?, &content).await,
        Commands::Like { id } => run_like(&open()?, &id).await,
        Commands::Comment { id, text } => run_comment(&open()?, &id, &text).await,
        Commands::DeletePost { id } => run_delete_post(&open()?, &id).await,
        Commands::Friends { online, favorites } => {
            run_friends(&open()?, online, favorites).await
        }
        Commands::AddFriend { id } => run_add_friend(&open()?, &id).await,
        Commands::RemoveFriend { id } => run_remove_friend(&open()?, &id).await,
        Commands::Favorite { id } => run_favorite(&open()?, &id).await,
        Commands::Notifications { unread } => run_notifications(&open()?, unread).await,
        Commands::Read { id } => run_read(&open()?, &id).await,
        Commands::ReadAll => run_read_all(&open()?).await,
        Commands::Dismiss { id } => run_dismiss(&open()?, &id).await,
        Commands::Profile { id } => run_profile(&open()?, id.as_deref()).await,
        Commands::EditProfile { name, bio, avatar } => {
            run_edit_profile(&open()?, name, bio, avatar).await
        }
        Commands::Follow { id } => run_follow(&open()?, &id).await,
        Commands::Library => run_library(&open()?).await,
        Commands::MyList { command } => run_my_list(&open()?, command).await,
        Commands::Watch { id } => run_watch(&open()?, &id).await,
        Commands::History { clear } => run_history(&open()?, clear).await,
        Commands::Downloads => run_downloads(&open()?),
        Commands::Download { id } => run_download(&open()?, &id).await,
        Commands::RemoveDownload { id } => run_remove_download(&open()?, &id).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(
            command,
            options.config.as_deref(),
            options.data_dir.as_deref(),
        ),
    }
}
