use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use plaza_core::sync::OverlapPolicy;

#[derive(Parser)]
#[command(name = "plaza")]
#[command(about = "Browse and act on your Plaza feed from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for the session and downloads (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Make every server call after loading fail, to watch changes roll back
    #[arg(long, global = true)]
    pub fail: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account email (defaults to `default_email` from config)
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the feed
    Feed {
        /// Number of posts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only posts with this tag
        #[arg(long)]
        tag: Option<String>,
        /// Only posts you liked
        #[arg(long)]
        liked: bool,
    },
    /// Publish a post
    #[command(alias = "new")]
    Post {
        /// Post content
        content: Vec<String>,
    },
    /// Like or unlike a post
    Like {
        /// Post ID
        id: String,
    },
    /// Comment on a post
    Comment {
        /// Post ID
        id: String,
        /// Comment text
        text: Vec<String>,
    },
    /// Delete a post
    DeletePost {
        /// Post ID
        id: String,
    },
    /// List friends
    Friends {
        /// Only friends who are online
        #[arg(long)]
        online: bool,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },
    /// Add a friend by user ID
    AddFriend {
        /// User ID
        id: String,
    },
    /// Remove a friend
    RemoveFriend {
        /// User ID
        id: String,
    },
    /// Mark or unmark a friend as favorite
    Favorite {
        /// User ID
        id: String,
    },
    /// List notifications
    Notifications {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },
    /// Mark a notification read
    Read {
        /// Notification ID
        id: String,
    },
    /// Mark every notification read
    ReadAll,
    /// Dismiss a notification
    Dismiss {
        /// Notification ID
        id: String,
    },
    /// Show a profile (your own when no ID is given)
    Profile {
        /// User ID
        id: Option<String>,
    },
    /// Edit your profile
    EditProfile {
        /// New display name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
        /// New bio
        #[arg(long)]
        bio: Option<String>,
        /// New avatar URL (empty to clear)
        #[arg(long, value_name = "URL")]
        avatar: Option<String>,
    },
    /// Follow or unfollow a user
    Follow {
        /// User ID
        id: String,
    },
    /// Browse the media catalog
    Library,
    /// Show or change "My List"
    MyList {
        #[command(subcommand)]
        command: Option<MyListCommands>,
    },
    /// Record that you watched a title
    Watch {
        /// Media ID
        id: String,
    },
    /// Show watch history
    History {
        /// Clear the whole history
        #[arg(long)]
        clear: bool,
    },
    /// List offline downloads
    Downloads,
    /// Download a title for offline viewing
    Download {
        /// Media ID
        id: String,
    },
    /// Remove an offline download
    RemoveDownload {
        /// Media ID
        id: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OverlapArg {
    LastResolvedWins,
    SerializePerRecord,
}

impl From<OverlapArg> for OverlapPolicy {
    fn from(value: OverlapArg) -> Self {
        match value {
            OverlapArg::LastResolvedWins => Self::LastResolvedWins,
            OverlapArg::SerializePerRecord => Self::SerializePerRecord,
        }
    }
}

#[derive(Subcommand)]
pub enum MyListCommands {
    /// Add a title to My List
    Add {
        /// Media ID
        id: String,
    },
    /// Remove a title from My List
    Remove {
        /// Media ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Mock server latency in milliseconds
        #[arg(long, value_name = "MS")]
        latency_ms: Option<u64>,
        /// How overlapping changes to one record are resolved
        #[arg(long, value_enum)]
        overlap: Option<OverlapArg>,
        /// Email used by `login` when none is given
        #[arg(long, value_name = "EMAIL")]
        default_email: Option<String>,
    },
    /// Print the effective config
    Show,
}
